// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use trace_model::span::{AttributeValue, SpanRecord};

/// Attribute carrying the full request URL of an outgoing call.
pub const HTTP_URL_ATTRIBUTE: &str = "http.url";

/// Excludes spans that describe calls to the exporter's own destination, so
/// the exporter does not trace its own traffic into a feedback loop.
///
/// The match is exact-string against the configured endpoint; no
/// scheme/host/port normalization is performed. Known limitation: an
/// endpoint reachable under two spellings is only filtered under the
/// configured one.
pub struct SelfTrafficFilter {
    endpoint: String,
}

impl SelfTrafficFilter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        SelfTrafficFilter {
            endpoint: endpoint.into(),
        }
    }

    pub fn should_export(&self, span: &SpanRecord) -> bool {
        match span.attributes.get(HTTP_URL_ATTRIBUTE) {
            Some(AttributeValue::Str(url)) => *url != self.endpoint,
            _ => true,
        }
    }

    /// Applied before encoding so excluded spans cost no conversion work.
    pub fn apply<'a>(&self, batch: &'a [SpanRecord]) -> Vec<&'a SpanRecord> {
        batch
            .iter()
            .filter(|span| self.should_export(span))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::UNIX_EPOCH;
    use trace_model::span::{SpanKind, SpanStatus};

    const ENDPOINT: &str = "http://localhost:9411/api/v2/spans";

    fn span_with_url(url: Option<&str>) -> SpanRecord {
        let mut attributes = HashMap::new();
        if let Some(url) = url {
            attributes.insert(HTTP_URL_ATTRIBUTE.to_owned(), AttributeValue::from(url));
        }

        SpanRecord {
            trace_id: 1,
            span_id: 1,
            parent_span_id: None,
            name: "call".to_owned(),
            kind: SpanKind::Client,
            start: UNIX_EPOCH,
            end: UNIX_EPOCH,
            attributes,
            events: Vec::new(),
            links: Vec::new(),
            status: SpanStatus::Unset,
        }
    }

    #[test]
    fn excludes_calls_to_own_endpoint() {
        let filter = SelfTrafficFilter::new(ENDPOINT);
        assert!(!filter.should_export(&span_with_url(Some(ENDPOINT))));
    }

    #[test]
    fn retains_other_urls_and_spans_without_url() {
        let filter = SelfTrafficFilter::new(ENDPOINT);
        assert!(filter.should_export(&span_with_url(Some("http://example.com/"))));
        assert!(filter.should_export(&span_with_url(None)));
    }

    #[test]
    fn no_normalization_is_applied() {
        let filter = SelfTrafficFilter::new(ENDPOINT);
        // Same destination, different spelling: retained by design.
        assert!(filter.should_export(&span_with_url(Some(
            "http://127.0.0.1:9411/api/v2/spans"
        ))));
    }

    #[test]
    fn non_string_url_attribute_is_retained() {
        let mut span = span_with_url(None);
        span.attributes
            .insert(HTTP_URL_ATTRIBUTE.to_owned(), AttributeValue::Int(42));
        let filter = SelfTrafficFilter::new(ENDPOINT);
        assert!(filter.should_export(&span));
    }

    #[test]
    fn apply_keeps_order_of_retained_spans() {
        let filter = SelfTrafficFilter::new(ENDPOINT);
        let batch = vec![
            span_with_url(Some("http://example.com/a")),
            span_with_url(Some(ENDPOINT)),
            span_with_url(Some("http://example.com/b")),
        ];

        let kept = filter.apply(&batch);
        assert_eq!(kept.len(), 2);
        assert_eq!(
            kept[0].attributes.get(HTTP_URL_ATTRIBUTE),
            Some(&AttributeValue::from("http://example.com/a"))
        );
    }
}
