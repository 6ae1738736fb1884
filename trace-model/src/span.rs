// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime};

/// The role a span plays in the request topology. Backends that support a
/// narrower repertoire map unsupported kinds to their own default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanKind {
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

/// Completion status of a span. `Unset` is the producer saying nothing;
/// encoders only emit status fields for `Ok` and `Error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpanStatus {
    Unset,
    Ok,
    Error { description: String },
}

/// Attribute values are restricted to this repertoire at the producer
/// boundary. Anything else is stringified before it gets here, never
/// rejected. `Display` gives the canonical string form encoders fall back
/// to when a backend lacks a matching wire type.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => f.write_str(s),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Str(s.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Str(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

/// A timestamped point-in-time annotation within the span's lifetime.
/// Append order is chronological and preserved through encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanEvent {
    pub timestamp: SystemTime,
    pub name: String,
    pub attributes: HashMap<String, AttributeValue>,
}

/// A weak reference to a span outside the direct parent/child relation.
/// Carries identifiers only, no ownership of the target.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanLink {
    pub trace_id: u128,
    pub span_id: u64,
    pub attributes: HashMap<String, AttributeValue>,
}

/// The immutable record of a completed span.
///
/// Created once when the span finishes; ownership passes from the tracer to
/// the export pipeline, which reads it and never mutates it. Invariants the
/// producer upholds: `end >= start`, `span_id` unique within `trace_id`,
/// attribute keys unique (last write wins).
#[derive(Clone, Debug)]
pub struct SpanRecord {
    pub trace_id: u128,
    pub span_id: u64,
    /// `None` for root spans. Encoders omit the parent field entirely in
    /// that case rather than emitting a zero sentinel.
    pub parent_span_id: Option<u64>,
    pub name: String,
    pub kind: SpanKind,
    pub start: SystemTime,
    pub end: SystemTime,
    pub attributes: HashMap<String, AttributeValue>,
    pub events: Vec<SpanEvent>,
    pub links: Vec<SpanLink>,
    pub status: SpanStatus,
}

impl SpanRecord {
    /// Wall-clock duration of the span. Zero if the producer violated the
    /// `end >= start` invariant.
    pub fn duration(&self) -> Duration {
        self.end.duration_since(self.start).unwrap_or_default()
    }
}
