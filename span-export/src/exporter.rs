// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Export coordinator: filter, encode, deliver, one caller batch per call.

use crate::delivery::{resolve_local_endpoint, HttpDelivery};
use crate::encoding::stackdriver::StackdriverEncoder;
use crate::encoding::zipkin::ZipkinEncoder;
use crate::encoding::SpanEncoder;
use crate::error::Outcome;
use crate::filter::SelfTrafficFilter;
use anyhow::{anyhow, Context};
use hyper::Uri;
use log::error;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use trace_model::limits::SpanLimits;
use trace_model::span::SpanRecord;

const DEFAULT_ACCEPTED_STATUS: [u16; 2] = [200, 202];

/// Which backend the exporter encodes for. Per-backend behavior lives in
/// the respective encoder; this only carries their construction options.
#[derive(Clone, Debug)]
pub enum BackendConfig {
    Zipkin { use_short_trace_ids: bool },
    Stackdriver { project_id: String },
}

/// Drives one batch through filter, encoder, and delivery.
///
/// `export` is invocation-scoped: it runs on the caller's task, keeps no
/// background threads, and buffers nothing beyond the batch it was handed.
/// Shared state across concurrent calls is read-only (limits, local
/// endpoint) apart from hyper's own connection pool.
pub struct SpanExporter {
    filter: SelfTrafficFilter,
    encoder: Box<dyn SpanEncoder>,
    delivery: HttpDelivery,
    shutdown: AtomicBool,
}

impl SpanExporter {
    pub fn builder() -> SpanExporterBuilder {
        SpanExporterBuilder::default()
    }

    /// Exports one batch and reports the coarse outcome. Never panics and
    /// never returns an error type; everything the caller needs to know is
    /// in the [`Outcome`].
    pub async fn export(&self, batch: &[SpanRecord], cancel: &CancellationToken) -> Outcome {
        if self.shutdown.load(Ordering::SeqCst) {
            return Outcome::RejectedAfterShutdown;
        }
        if cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        let spans = self.filter.apply(batch);
        if spans.is_empty() {
            // Nothing left to send, and no network call to classify.
            return Outcome::Success;
        }

        let payload = match self.encoder.encode_batch(&spans) {
            Ok(payload) => payload,
            Err(e) => {
                error!("giving up on span batch: {e}");
                return Outcome::FailedTerminal;
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Outcome::Cancelled,
            outcome = self.delivery.send(payload) => outcome,
        }
    }

    /// Moves the exporter to its terminal state. Idempotent, best-effort,
    /// never fails; subsequent `export` calls are rejected without network
    /// I/O.
    pub fn shutdown(&self, _cancel: &CancellationToken) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Builder in the usual `set_*` chain style. `build` fails fast on
/// configuration errors; nothing later in the pipeline revalidates.
#[derive(Debug, Default)]
pub struct SpanExporterBuilder {
    endpoint: Option<String>,
    service_name: Option<String>,
    limits: Option<SpanLimits>,
    backend: Option<BackendConfig>,
    accepted_status: Option<Vec<u16>>,
}

impl SpanExporterBuilder {
    /// Destination endpoint, e.g. `http://localhost:9411/api/v2/spans`.
    /// The same string is what the self-traffic filter matches against.
    pub fn set_endpoint(&mut self, endpoint: &str) -> &mut Self {
        self.endpoint = Some(endpoint.to_owned());
        self
    }

    pub fn set_service_name(&mut self, service_name: &str) -> &mut Self {
        self.service_name = Some(service_name.to_owned());
        self
    }

    pub fn set_limits(&mut self, limits: SpanLimits) -> &mut Self {
        self.limits = Some(limits);
        self
    }

    pub fn set_backend(&mut self, backend: BackendConfig) -> &mut Self {
        self.backend = Some(backend);
        self
    }

    /// Response statuses counted as acceptance. Defaults to 200 and 202.
    pub fn set_accepted_status(&mut self, accepted: Vec<u16>) -> &mut Self {
        self.accepted_status = Some(accepted);
        self
    }

    pub fn build(&mut self) -> anyhow::Result<SpanExporter> {
        let endpoint = self
            .endpoint
            .take()
            .ok_or_else(|| anyhow!("destination endpoint is required"))?;
        let uri: Uri = endpoint
            .parse()
            .context("destination endpoint is not a valid uri")?;
        let backend = self
            .backend
            .take()
            .ok_or_else(|| anyhow!("a backend must be selected"))?;

        let service_name = self.service_name.take().unwrap_or_default();
        let limits = self.limits.take().unwrap_or_default();
        let accepted_status = self
            .accepted_status
            .take()
            .unwrap_or_else(|| DEFAULT_ACCEPTED_STATUS.to_vec());

        let encoder: Box<dyn SpanEncoder> = match backend {
            BackendConfig::Zipkin {
                use_short_trace_ids,
            } => {
                let local_endpoint = resolve_local_endpoint(&service_name);
                Box::new(ZipkinEncoder::new(local_endpoint, limits, use_short_trace_ids))
            }
            BackendConfig::Stackdriver { project_id } => {
                if project_id.is_empty() {
                    return Err(anyhow!("stackdriver backend requires a project id"));
                }
                Box::new(StackdriverEncoder::new(project_id, limits))
            }
        };

        let content_type = encoder.content_type();

        Ok(SpanExporter {
            filter: SelfTrafficFilter::new(endpoint),
            encoder,
            delivery: HttpDelivery::new(uri, content_type, accepted_status),
            shutdown: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_endpoint_and_backend() {
        assert!(SpanExporterBuilder::default().build().is_err());

        let mut builder = SpanExporterBuilder::default();
        builder.set_endpoint("http://localhost:9411/api/v2/spans");
        assert!(builder.build().is_err());
    }

    #[test]
    fn build_rejects_invalid_endpoint() {
        let mut builder = SpanExporterBuilder::default();
        let result = builder
            .set_endpoint("not a uri")
            .set_backend(BackendConfig::Zipkin {
                use_short_trace_ids: false,
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn build_rejects_empty_project_id() {
        let mut builder = SpanExporterBuilder::default();
        let result = builder
            .set_endpoint("http://localhost:8080/v2/spans:batchWrite")
            .set_backend(BackendConfig::Stackdriver {
                project_id: String::new(),
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn build_succeeds_with_minimal_config() {
        let mut builder = SpanExporterBuilder::default();
        let exporter = builder
            .set_endpoint("http://localhost:9411/api/v2/spans")
            .set_service_name("test-service")
            .set_backend(BackendConfig::Zipkin {
                use_short_trace_ids: false,
            })
            .build()
            .unwrap();

        assert!(!exporter.is_shut_down());
    }
}
