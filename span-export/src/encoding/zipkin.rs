// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Zipkin v2 JSON encoder.
//!
//! Backend capability declarations: events render as annotations carrying
//! timestamp and name only (event attributes are dropped), links are not
//! representable and are dropped, and the schema has no dropped-count
//! fields, so limit truncation is applied silently (logged at debug).

use super::{epoch_micros, span_id_hex, trace_id_hex, SpanEncoder};
use crate::delivery::LocalEndpoint;
use crate::error::EncodeError;
use bytes::Bytes;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use trace_model::limits::SpanLimits;
use trace_model::span::{SpanKind, SpanRecord, SpanStatus};

// Reserved tag keys for status, outside the attribute namespace.
const STATUS_CODE_TAG: &str = "ot.status_code";
const STATUS_DESCRIPTION_TAG: &str = "ot.status_description";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZipkinEndpoint {
    service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ipv4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ipv6: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZipkinAnnotation {
    timestamp: u64,
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZipkinSpan {
    trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    id: String,
    kind: &'static str,
    name: String,
    timestamp: u64,
    duration: u64,
    local_endpoint: ZipkinEndpoint,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<ZipkinAnnotation>,
}

pub struct ZipkinEncoder {
    local_endpoint: ZipkinEndpoint,
    limits: SpanLimits,
    use_short_trace_ids: bool,
}

impl ZipkinEncoder {
    pub fn new(local_endpoint: LocalEndpoint, limits: SpanLimits, use_short_trace_ids: bool) -> Self {
        ZipkinEncoder {
            local_endpoint: ZipkinEndpoint {
                service_name: local_endpoint.service_name,
                ipv4: local_endpoint.ipv4,
                ipv6: local_endpoint.ipv6,
            },
            limits,
            use_short_trace_ids,
        }
    }

    /// Right-truncation to the low 64 bits is an explicit backend option
    /// for collectors that only store 64-bit trace ids, never a default.
    fn encode_trace_id(&self, trace_id: u128) -> String {
        let id = trace_id_hex(trace_id);
        if self.use_short_trace_ids {
            id[id.len() - 16..].to_owned()
        } else {
            id
        }
    }

    fn to_span(&self, span: &SpanRecord) -> ZipkinSpan {
        let start = epoch_micros(span.start);
        let end = epoch_micros(span.end);

        let dropped_attributes =
            SpanLimits::dropped_count(span.attributes.len(), self.limits.max_attributes);
        if dropped_attributes > 0 {
            debug!(
                "dropping {dropped_attributes} attributes of span {:016x}: over limit, schema has no dropped count",
                span.span_id
            );
        }

        let mut tags: BTreeMap<String, String> = span
            .attributes
            .iter()
            .take(self.limits.max_attributes)
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();

        match &span.status {
            SpanStatus::Unset => {}
            SpanStatus::Ok => {
                tags.insert(STATUS_CODE_TAG.to_owned(), "OK".to_owned());
            }
            SpanStatus::Error { description } => {
                tags.insert(STATUS_CODE_TAG.to_owned(), "ERROR".to_owned());
                if !description.is_empty() {
                    tags.insert(STATUS_DESCRIPTION_TAG.to_owned(), description.clone());
                }
            }
        }

        let annotations = span
            .events
            .iter()
            .take(self.limits.max_events)
            .map(|event| ZipkinAnnotation {
                timestamp: epoch_micros(event.timestamp),
                value: event.name.clone(),
            })
            .collect();

        if !span.links.is_empty() {
            debug!(
                "dropping {} links of span {:016x}: not representable in zipkin json",
                span.links.len(),
                span.span_id
            );
        }

        ZipkinSpan {
            trace_id: self.encode_trace_id(span.trace_id),
            parent_id: span.parent_span_id.map(span_id_hex),
            id: span_id_hex(span.span_id),
            kind: to_zipkin_kind(span.kind),
            name: span.name.clone(),
            timestamp: start,
            duration: end.saturating_sub(start),
            local_endpoint: self.local_endpoint.clone(),
            tags,
            annotations,
        }
    }
}

// CLIENT is the declared fallback for every kind the schema lacks.
fn to_zipkin_kind(kind: SpanKind) -> &'static str {
    match kind {
        SpanKind::Server => "SERVER",
        _ => "CLIENT",
    }
}

impl SpanEncoder for ZipkinEncoder {
    fn encode_batch(&self, spans: &[&SpanRecord]) -> Result<Bytes, EncodeError> {
        let wire: Vec<ZipkinSpan> = spans.iter().map(|span| self.to_span(span)).collect();
        Ok(Bytes::from(serde_json::to_vec(&wire)?))
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::time::{Duration, UNIX_EPOCH};
    use trace_model::span::{AttributeValue, SpanEvent};

    fn encoder(use_short_trace_ids: bool) -> ZipkinEncoder {
        ZipkinEncoder::new(
            LocalEndpoint {
                service_name: "frontend".to_owned(),
                ipv4: Some("10.0.0.4".to_owned()),
                ipv6: None,
            },
            SpanLimits::default(),
            use_short_trace_ids,
        )
    }

    fn root_span() -> SpanRecord {
        SpanRecord {
            trace_id: 0x4bf9_2f35_77b3_4da6_a3ce_929d_0e0e_4736,
            span_id: 0x00f0_67aa_0ba9_02b7,
            parent_span_id: None,
            name: "get".to_owned(),
            kind: SpanKind::Server,
            start: UNIX_EPOCH + Duration::from_secs(100),
            end: UNIX_EPOCH + Duration::from_secs(100) + Duration::from_millis(100),
            attributes: HashMap::from([(
                "http.method".to_owned(),
                AttributeValue::from("GET"),
            )]),
            events: Vec::new(),
            links: Vec::new(),
            status: SpanStatus::Unset,
        }
    }

    fn encode_one(encoder: &ZipkinEncoder, span: &SpanRecord) -> Value {
        let bytes = encoder.encode_batch(&[span]).unwrap();
        let batch: Value = serde_json::from_slice(&bytes).unwrap();
        batch[0].clone()
    }

    #[test]
    fn encodes_root_server_span() {
        let wire = encode_one(&encoder(false), &root_span());

        assert_eq!(wire["traceId"], "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(wire["id"], "00f067aa0ba902b7");
        assert!(wire.get("parentId").is_none());
        assert_eq!(wire["kind"], "SERVER");
        assert_eq!(wire["name"], "get");
        assert_eq!(wire["duration"], 100_000);
        assert_eq!(wire["timestamp"], 100_000_000);
        assert_eq!(wire["tags"]["http.method"], "GET");
        assert_eq!(wire["localEndpoint"]["serviceName"], "frontend");
        assert_eq!(wire["localEndpoint"]["ipv4"], "10.0.0.4");
        assert!(wire["localEndpoint"].get("ipv6").is_none());
    }

    #[test]
    fn parent_id_round_trips_as_matching_hex() {
        let mut span = root_span();
        span.parent_span_id = Some(0x1);
        let wire = encode_one(&encoder(false), &span);

        assert_eq!(wire["parentId"], "0000000000000001");
    }

    #[test]
    fn short_trace_ids_keep_low_64_bits() {
        let wire = encode_one(&encoder(true), &root_span());

        assert_eq!(wire["traceId"], "a3ce929d0e0e4736");
    }

    #[test]
    fn unmapped_kinds_fall_back_to_client() {
        for kind in [
            SpanKind::Internal,
            SpanKind::Client,
            SpanKind::Producer,
            SpanKind::Consumer,
        ] {
            let mut span = root_span();
            span.kind = kind;
            assert_eq!(encode_one(&encoder(false), &span)["kind"], "CLIENT");
        }
    }

    #[test]
    fn status_goes_under_reserved_tags() {
        let mut span = root_span();
        span.status = SpanStatus::Error {
            description: "boom".to_owned(),
        };
        let wire = encode_one(&encoder(false), &span);

        assert_eq!(wire["tags"]["ot.status_code"], "ERROR");
        assert_eq!(wire["tags"]["ot.status_description"], "boom");

        span.status = SpanStatus::Unset;
        let wire = encode_one(&encoder(false), &span);
        assert!(wire["tags"].get("ot.status_code").is_none());
    }

    #[test]
    fn bool_attributes_are_stringified_tags() {
        let mut span = root_span();
        span.attributes
            .insert("cache.hit".to_owned(), AttributeValue::Bool(true));
        let wire = encode_one(&encoder(false), &span);

        assert_eq!(wire["tags"]["cache.hit"], "true");
    }

    #[test]
    fn events_become_annotations_without_attributes() {
        let mut span = root_span();
        span.events.push(SpanEvent {
            timestamp: UNIX_EPOCH + Duration::from_secs(100) + Duration::from_millis(10),
            name: "cache miss".to_owned(),
            attributes: HashMap::from([("key".to_owned(), AttributeValue::from("user:1"))]),
        });
        let wire = encode_one(&encoder(false), &span);

        assert_eq!(wire["annotations"][0]["timestamp"], 100_010_000);
        assert_eq!(wire["annotations"][0]["value"], "cache miss");
        assert!(wire["annotations"][0].get("key").is_none());
    }

    #[test]
    fn attributes_beyond_limit_are_truncated() {
        let limits = SpanLimits::new(2, 1, 1).unwrap();
        let encoder = ZipkinEncoder::new(
            LocalEndpoint {
                service_name: "frontend".to_owned(),
                ipv4: None,
                ipv6: None,
            },
            limits,
            false,
        );

        let mut span = root_span();
        for i in 0..5 {
            span.attributes
                .insert(format!("extra.{i}"), AttributeValue::Int(i));
        }
        let wire = encode_one(&encoder, &span);

        assert_eq!(wire["tags"].as_object().unwrap().len(), 2);
    }
}
