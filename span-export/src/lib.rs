// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Export adapters for finished spans.
//!
//! The pipeline for one batch is: self-traffic filter, backend encoder,
//! HTTP delivery, and a coarse [`error::Outcome`] back to the caller.
//! Batching cadence, retry, and backoff belong to the caller; nothing here
//! buffers spans beyond the single batch passed in.

pub mod delivery;
pub mod encoding;
pub mod error;
pub mod exporter;
pub mod filter;

pub use error::Outcome;
pub use exporter::{BackendConfig, SpanExporter, SpanExporterBuilder};
