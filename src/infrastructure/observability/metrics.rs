//! Prometheus metrics describing the discovery process itself
//!
//! All metrics use the `prometopo_` prefix and are read-only.

use prometheus::{
    CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the discovery pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Discovery passes by outcome (success, failure)
    pub discovery_passes_total: CounterVec,
    /// Failed exporter queries by exporter name
    pub exporter_failures_total: CounterVec,
    /// Samples dropped before correlation, by reason
    pub samples_dropped_total: CounterVec,
    /// Entities skipped by the builders, by reason
    pub entities_skipped_total: CounterVec,
    /// Entities emitted by the last successful pass
    pub entities_emitted: GenericGauge<AtomicF64>,
    /// Discovery pass duration in seconds
    pub discovery_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let discovery_passes_total = CounterVec::new(
            Opts::new("prometopo_discovery_passes_total", "Discovery passes by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(discovery_passes_total.clone()))?;

        let exporter_failures_total = CounterVec::new(
            Opts::new(
                "prometopo_exporter_failures_total",
                "Failed exporter queries by exporter",
            ),
            &["exporter"],
        )?;
        registry.register(Box::new(exporter_failures_total.clone()))?;

        let samples_dropped_total = CounterVec::new(
            Opts::new(
                "prometopo_samples_dropped_total",
                "Samples dropped before correlation by reason",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(samples_dropped_total.clone()))?;

        let entities_skipped_total = CounterVec::new(
            Opts::new(
                "prometopo_entities_skipped_total",
                "Entities skipped by the builders by reason",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(entities_skipped_total.clone()))?;

        let entities_emitted = Gauge::with_opts(Opts::new(
            "prometopo_entities_emitted",
            "Entities emitted by the last successful discovery pass",
        ))?;
        registry.register(Box::new(entities_emitted.clone()))?;

        let discovery_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "prometopo_discovery_duration_seconds",
                "Discovery pass duration in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(discovery_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            discovery_passes_total,
            exporter_failures_total,
            samples_dropped_total,
            entities_skipped_total,
            entities_emitted,
            discovery_duration_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn record_pass(&self, outcome: &str, seconds: f64) {
        self.discovery_passes_total
            .with_label_values(&[outcome])
            .inc();
        self.discovery_duration_seconds
            .with_label_values(&[outcome])
            .observe(seconds);
    }

    pub fn inc_exporter_failure(&self, exporter: &str) {
        self.exporter_failures_total
            .with_label_values(&[exporter])
            .inc();
    }

    pub fn inc_dropped(&self, reason: &str, count: usize) {
        if count > 0 {
            self.samples_dropped_total
                .with_label_values(&[reason])
                .inc_by(count as f64);
        }
    }

    pub fn inc_skipped(&self, reason: &str) {
        self.entities_skipped_total
            .with_label_values(&[reason])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.entities_emitted.set(3.0);
        assert!(metrics.render().contains("prometopo_entities_emitted 3"));
    }

    #[test]
    fn test_exporter_failures_per_exporter() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_exporter_failure("istio");
        metrics.inc_exporter_failure("gateway");
        let output = metrics.render();
        assert!(output.contains("prometopo_exporter_failures_total"));
        assert!(output.contains("istio"));
        assert!(output.contains("gateway"));
    }

    #[test]
    fn test_zero_drops_are_not_recorded() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_dropped("missing_label", 0);
        assert!(!metrics.render().contains("missing_label"));
        metrics.inc_dropped("missing_label", 2);
        assert!(metrics.render().contains("prometopo_samples_dropped_total{reason=\"missing_label\"} 2"));
    }
}
