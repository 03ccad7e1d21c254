//! Request counters exposed on the admin `/metrics` endpoint.

use crate::domain::ApiErrorKind;
use serde_json::{json, Map};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Lock-free outcome counters shared by the HTTP handler and the auth layer
#[derive(Default)]
pub struct GatewayMetrics {
    handled: AtomicU64,
    succeeded: AtomicU64,
    route_misses: AtomicU64,
    /// Indexed like `ApiErrorKind::ALL`
    failures: [AtomicU64; ApiErrorKind::ALL.len()],
    latency_ms_sum: AtomicU64,
    latency_samples: AtomicU64,
}

fn slot(kind: ApiErrorKind) -> usize {
    ApiErrorKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or_default()
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished request; `failure` is `None` on success
    pub fn record_request(&self, failure: Option<ApiErrorKind>, latency_ms: u64) {
        self.latency_ms_sum.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
        self.count(failure);
    }

    /// Record a request turned away before dispatch. No latency sample.
    pub fn record_rejection(&self, kind: ApiErrorKind) {
        self.count(Some(kind));
    }

    fn count(&self, failure: Option<ApiErrorKind>) {
        self.handled.fetch_add(1, Ordering::Relaxed);
        match failure {
            None => self.succeeded.fetch_add(1, Ordering::Relaxed),
            Some(kind) => self.failures[slot(kind)].fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record a path that did not resolve to a gateway route.
    /// Misses carry no latency sample.
    pub fn record_route_miss(&self) {
        self.route_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failures(&self, kind: ApiErrorKind) -> u64 {
        self.failures[slot(kind)].load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.handled.load(Ordering::Relaxed) + self.route_misses.load(Ordering::Relaxed)
    }

    pub fn average_latency_ms(&self) -> f64 {
        match self.latency_samples.load(Ordering::Relaxed) {
            0 => 0.0,
            n => self.latency_ms_sum.load(Ordering::Relaxed) as f64 / n as f64,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let errors: Map<String, serde_json::Value> = ApiErrorKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), json!(self.failures(*kind))))
            .collect();

        json!({
            "requests": {
                "total": self.total(),
                "success": succeeded,
                "error": self.total() - succeeded,
                "route_misses": self.route_misses.load(Ordering::Relaxed),
            },
            "errors": errors,
            "latency": { "average_ms": self.average_latency_ms() },
        })
    }
}

/// Measures one request and reports it on `finish`
pub struct RequestTimer {
    started: Instant,
    metrics: Arc<GatewayMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            started: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, failure: Option<ApiErrorKind>) {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.metrics.record_request(failure, elapsed);
    }
}
