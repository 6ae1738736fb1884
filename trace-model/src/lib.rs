// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared vocabulary for the span export pipeline: the immutable record a
//! tracer produces when a span finishes, and the limits policy bounding how
//! much of it an exporter may encode.

pub mod limits;
pub mod span;

pub use limits::{InvalidLimit, SpanLimits};
pub use span::{AttributeValue, SpanEvent, SpanKind, SpanLink, SpanRecord, SpanStatus};
