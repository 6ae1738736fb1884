// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod stackdriver;
pub mod zipkin;

use crate::error::EncodeError;
use bytes::Bytes;
use std::time::{SystemTime, UNIX_EPOCH};
use trace_model::span::SpanRecord;

/// One encoder per backend, selected via configuration at build time.
///
/// Encoding is pure with respect to the records: a well-formed batch never
/// fails to encode span-by-span. The only error path is serialization of
/// the assembled payload, which the coordinator classifies as terminal.
pub trait SpanEncoder: Send + Sync {
    fn encode_batch(&self, spans: &[&SpanRecord]) -> Result<Bytes, EncodeError>;

    /// Content type of the payloads this encoder produces.
    fn content_type(&self) -> &'static str;
}

pub(crate) fn trace_id_hex(id: u128) -> String {
    format!("{id:032x}")
}

pub(crate) fn span_id_hex(id: u64) -> String {
    format!("{id:016x}")
}

// Integer truncation, never rounding up, so start <= end stays monotone
// after conversion.
pub(crate) fn epoch_micros(ts: SystemTime) -> u64 {
    ts.duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

pub(crate) fn epoch_parts(ts: SystemTime) -> (i64, i32) {
    match ts.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs() as i64, d.subsec_nanos() as i32),
        Err(_) => (0, 0),
    }
}
