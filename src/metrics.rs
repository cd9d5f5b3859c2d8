//! Provisioning Metrics
//!
//! Prometheus counters for provisioning outcomes and durations, kept in a
//! dedicated registry exposed at `/metrics`.

use crate::error::{Error, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::time::{Duration, Instant};

/// Outcome recorded for a provision whose task never reached an outcome
pub const ABORTED_OUTCOME: &str = "aborted";

/// Metrics recorded by the provisioner
pub struct ProvisionMetrics {
    registry: Registry,
    provisions: IntCounterVec,
    duration: Histogram,
    in_flight: IntGauge,
}

impl ProvisionMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let provisions = IntCounterVec::new(
            Opts::new("storage_provisions_total", "Storage provisioning attempts by outcome"),
            &["outcome"],
        )
        .map_err(metrics_error)?;
        let duration = Histogram::with_opts(
            HistogramOpts::new(
                "storage_provision_duration_seconds",
                "Duration of storage provisioning tasks",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0, 1800.0]),
        )
        .map_err(metrics_error)?;
        let in_flight = IntGauge::new(
            "storage_provisions_in_flight",
            "Storage provisioning tasks currently running",
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(provisions.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(duration.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(in_flight.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            provisions,
            duration,
            in_flight,
        })
    }

    /// Mark a provisioning task as started
    pub fn started(&self) {
        self.in_flight.inc();
    }

    /// Record the outcome of a provisioning task
    pub fn finished(&self, outcome: &str, elapsed: Duration) {
        self.in_flight.dec();
        self.provisions.with_label_values(&[outcome]).inc();
        self.duration.observe(elapsed.as_secs_f64());
    }

    /// Start tracking a provision. The returned guard records it as
    /// finished when dropped, as `aborted` unless `complete` was called.
    pub fn track(&self) -> ProvisionGuard<'_> {
        self.started();
        ProvisionGuard {
            metrics: self,
            started: Instant::now(),
            outcome: ABORTED_OUTCOME,
        }
    }

    /// Count of finished provisions with `outcome`
    pub fn provisions(&self, outcome: &str) -> u64 {
        self.provisions.with_label_values(&[outcome]).get()
    }

    /// Provisioning tasks started but not finished
    pub fn in_flight(&self) -> i64 {
        self.in_flight.get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics encoding: {}", e)))
    }
}

/// In-flight provision; see [`ProvisionMetrics::track`]
pub struct ProvisionGuard<'a> {
    metrics: &'a ProvisionMetrics,
    started: Instant,
    outcome: &'static str,
}

impl ProvisionGuard<'_> {
    /// Finish the provision with `outcome`
    pub fn complete(mut self, outcome: &'static str) {
        self.outcome = outcome;
    }
}

impl Drop for ProvisionGuard<'_> {
    fn drop(&mut self) {
        self.metrics.finished(self.outcome, self.started.elapsed());
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("metrics error: {}", e))
}
