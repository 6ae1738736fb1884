// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Stackdriver (Cloud Trace v2 style) JSON encoder.
//!
//! Backend capability declarations: links are rendered with their own
//! dropped-attribute accounting, events are not representable in this
//! translation and are dropped, and the backend has no float wire type, so
//! floats fall back to their canonical string form.

use super::{epoch_parts, span_id_hex, trace_id_hex, SpanEncoder};
use crate::error::EncodeError;
use bytes::Bytes;
use log::debug;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use trace_model::limits::SpanLimits;
use trace_model::span::{AttributeValue, SpanRecord, SpanStatus};

pub const DEFAULT_MAX_DISPLAY_NAME_BYTES: usize = 128;

// Well-known HTTP attribute names remapped to fixed backend label paths.
// Built once at process start; unmapped keys pass through verbatim.
static LABEL_MAPPINGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("http.method", "/http/method"),
        ("http.status_code", "/http/status_code"),
        ("http.user_agent", "/http/user_agent"),
        ("http.path", "/http/path"),
        ("http.host", "/http/host"),
        ("http.url", "/http/url"),
        ("http.request.size", "/http/request_size"),
        ("http.response.size", "/http/response_size"),
        ("http.route", "/http/route"),
    ])
});

fn format_label(key: &str) -> String {
    match LABEL_MAPPINGS.get(key) {
        Some(mapped) => (*mapped).to_owned(),
        None => key.to_owned(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TruncatableString {
    value: String,
    truncated_byte_count: usize,
}

impl TruncatableString {
    fn whole(value: String) -> Self {
        TruncatableString {
            value,
            truncated_byte_count: 0,
        }
    }

    /// Truncates on a char boundary at or below `max_bytes`, reporting how
    /// many bytes were cut.
    fn truncated(s: &str, max_bytes: usize) -> Self {
        if s.len() <= max_bytes {
            return Self::whole(s.to_owned());
        }

        let mut end = max_bytes;
        while !s.is_char_boundary(end) {
            end -= 1;
        }

        TruncatableString {
            value: s[..end].to_owned(),
            truncated_byte_count: s.len() - end,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Timestamp {
    seconds: i64,
    nanos: i32,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AttributeValueWire {
    Str {
        #[serde(rename = "stringValue")]
        string_value: TruncatableString,
    },
    Bool {
        #[serde(rename = "boolValue")]
        bool_value: bool,
    },
    Int {
        #[serde(rename = "intValue")]
        int_value: i64,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Attributes {
    attribute_map: BTreeMap<String, AttributeValueWire>,
    dropped_attributes_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Link {
    trace_id: String,
    span_id: String,
    attributes: Attributes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Links {
    link: Vec<Link>,
    dropped_links_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StackdriverSpan {
    name: String,
    span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_span_id: Option<String>,
    display_name: TruncatableString,
    start_time: Timestamp,
    end_time: Timestamp,
    attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    links: Option<Links>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<Status>,
}

#[derive(Debug, Serialize)]
struct SpanBatch {
    spans: Vec<StackdriverSpan>,
}

pub struct StackdriverEncoder {
    project_id: String,
    limits: SpanLimits,
    max_display_name_bytes: usize,
}

impl StackdriverEncoder {
    pub fn new(project_id: String, limits: SpanLimits) -> Self {
        StackdriverEncoder {
            project_id,
            limits,
            max_display_name_bytes: DEFAULT_MAX_DISPLAY_NAME_BYTES,
        }
    }

    fn to_wire_value(value: &AttributeValue) -> AttributeValueWire {
        match value {
            AttributeValue::Str(s) => AttributeValueWire::Str {
                string_value: TruncatableString::whole(s.clone()),
            },
            AttributeValue::Bool(b) => AttributeValueWire::Bool { bool_value: *b },
            AttributeValue::Int(i) => AttributeValueWire::Int { int_value: *i },
            // Lossy by declaration: the backend has no float wire type.
            AttributeValue::Float(v) => AttributeValueWire::Str {
                string_value: TruncatableString::whole(v.to_string()),
            },
        }
    }

    fn to_attributes(
        &self,
        attributes: &HashMap<String, AttributeValue>,
        remap_labels: bool,
    ) -> Attributes {
        let attribute_map = attributes
            .iter()
            .take(self.limits.max_attributes)
            .map(|(k, v)| {
                let key = if remap_labels {
                    format_label(k)
                } else {
                    k.clone()
                };
                (key, Self::to_wire_value(v))
            })
            .collect();

        Attributes {
            attribute_map,
            dropped_attributes_count: SpanLimits::dropped_count(
                attributes.len(),
                self.limits.max_attributes,
            ),
        }
    }

    fn to_links(&self, span: &SpanRecord) -> Option<Links> {
        if span.links.is_empty() {
            return None;
        }

        let link = span
            .links
            .iter()
            .take(self.limits.max_links)
            .map(|l| Link {
                trace_id: trace_id_hex(l.trace_id),
                span_id: span_id_hex(l.span_id),
                // Link attribute accounting is independent of the parent
                // span's own counts.
                attributes: self.to_attributes(&l.attributes, false),
            })
            .collect();

        Some(Links {
            link,
            dropped_links_count: SpanLimits::dropped_count(span.links.len(), self.limits.max_links),
        })
    }

    fn to_span(&self, span: &SpanRecord) -> StackdriverSpan {
        let trace_id = trace_id_hex(span.trace_id);
        let span_id = span_id_hex(span.span_id);

        if !span.events.is_empty() {
            debug!(
                "dropping {} events of span {span_id}: not representable in this translation",
                span.events.len()
            );
        }

        let (start_seconds, start_nanos) = epoch_parts(span.start);
        let (end_seconds, end_nanos) = epoch_parts(span.end);

        StackdriverSpan {
            name: format!(
                "projects/{}/traces/{trace_id}/spans/{span_id}",
                self.project_id
            ),
            span_id,
            parent_span_id: span.parent_span_id.map(span_id_hex),
            display_name: TruncatableString::truncated(&span.name, self.max_display_name_bytes),
            start_time: Timestamp {
                seconds: start_seconds,
                nanos: start_nanos,
            },
            end_time: Timestamp {
                seconds: end_seconds,
                nanos: end_nanos,
            },
            attributes: self.to_attributes(&span.attributes, true),
            links: self.to_links(span),
            status: match &span.status {
                SpanStatus::Unset => None,
                SpanStatus::Ok => Some(Status {
                    code: 0,
                    message: None,
                }),
                SpanStatus::Error { description } => Some(Status {
                    code: 2,
                    message: if description.is_empty() {
                        None
                    } else {
                        Some(description.clone())
                    },
                }),
            },
        }
    }
}

impl SpanEncoder for StackdriverEncoder {
    fn encode_batch(&self, spans: &[&SpanRecord]) -> Result<Bytes, EncodeError> {
        let batch = SpanBatch {
            spans: spans.iter().map(|span| self.to_span(span)).collect(),
        };
        Ok(Bytes::from(serde_json::to_vec(&batch)?))
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}
