/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Per-client Prometheus metrics.
//!
//! Each client owns its registry so that clients stay isolated in tests
//! and embedders can scrape (or ignore) them independently.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::fmt;

const LABELS: &[&str] = &["service", "operation"];

/// Counters and histograms recorded by the executor.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_errors: IntCounterVec,
    request_duration: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Creates the metric set on a fresh registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("aws_requests_total", "Number of requests started"),
            LABELS,
        )
        .unwrap();
        registry.register(Box::new(requests_total.clone())).unwrap();

        let request_errors = IntCounterVec::new(
            Opts::new("aws_request_errors", "Number of requests that failed"),
            LABELS,
        )
        .unwrap();
        registry.register(Box::new(request_errors.clone())).unwrap();

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "aws_request_duration_seconds",
                "End-to-end request duration, retries included",
            ),
            LABELS,
        )
        .unwrap();
        registry
            .register(Box::new(request_duration.clone()))
            .unwrap();

        Self {
            registry,
            requests_total,
            request_errors,
            request_duration,
        }
    }

    /// The registry all metrics are registered on.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn record_request(&self, service: &str, operation: &str) {
        self.requests_total
            .with_label_values(&[service, operation])
            .inc();
    }

    pub(crate) fn record_error(&self, service: &str, operation: &str) {
        self.request_errors
            .with_label_values(&[service, operation])
            .inc();
    }

    pub(crate) fn observe_duration(&self, service: &str, operation: &str, seconds: f64) {
        self.request_duration
            .with_label_values(&[service, operation])
            .observe(seconds);
    }
}
