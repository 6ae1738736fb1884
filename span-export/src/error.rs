// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Result of one export call, as seen by the caller.
///
/// The classification is deliberately coarse: any transport-layer failure
/// is `FailedRetryable`, a payload that cannot be built is
/// `FailedTerminal`, and the two conditions the coordinator itself raises
/// get their own variants so callers can tell them apart from delivery
/// faults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    FailedRetryable,
    FailedTerminal,
    /// Export was called after `shutdown` completed. No network I/O was
    /// attempted.
    RejectedAfterShutdown,
    /// The caller's cancellation signal fired before or during delivery.
    /// Any in-flight request was abandoned, nothing was acknowledged.
    Cancelled,
}

impl Outcome {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Outcome::FailedRetryable | Outcome::Cancelled)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::FailedTerminal | Outcome::RejectedAfterShutdown)
    }
}

/// The batch payload could not be serialized. Classified terminal; no
/// partial send is attempted.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to serialize span batch: {0}")]
    Serialization(#[from] serde_json::Error),
}
