// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

pub const DEFAULT_MAX_ATTRIBUTES: usize = 32;
pub const DEFAULT_MAX_EVENTS: usize = 128;
pub const DEFAULT_MAX_LINKS: usize = 32;

/// Configuration error: a span limit was set to zero.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("span limit `{0}` must be greater than zero")]
pub struct InvalidLimit(pub &'static str);

/// Bounds on how many attributes, events, and links of a span the exporters
/// encode. Constructed once at pipeline setup, immutable afterward, and
/// shared read-only across concurrent encodes.
///
/// Collections beyond a limit are truncated from the encoded output only;
/// the span record itself is untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpanLimits {
    pub max_attributes: usize,
    pub max_events: usize,
    pub max_links: usize,
}

impl Default for SpanLimits {
    fn default() -> Self {
        SpanLimits {
            max_attributes: DEFAULT_MAX_ATTRIBUTES,
            max_events: DEFAULT_MAX_EVENTS,
            max_links: DEFAULT_MAX_LINKS,
        }
    }
}

impl SpanLimits {
    /// Fails fast on non-positive limits; a zero limit is a configuration
    /// error, not a request to drop everything.
    pub fn new(
        max_attributes: usize,
        max_events: usize,
        max_links: usize,
    ) -> Result<Self, InvalidLimit> {
        if max_attributes == 0 {
            return Err(InvalidLimit("max_attributes"));
        }
        if max_events == 0 {
            return Err(InvalidLimit("max_events"));
        }
        if max_links == 0 {
            return Err(InvalidLimit("max_links"));
        }

        Ok(SpanLimits {
            max_attributes,
            max_events,
            max_links,
        })
    }

    /// How many entries of a collection fall beyond `limit`. Pure, total,
    /// never negative.
    pub fn dropped_count(actual: usize, limit: usize) -> u32 {
        actual.saturating_sub(limit) as u32
    }
}
