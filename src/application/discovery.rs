//! Discovery orchestrator.
//!
//! Drives the configured exporters one after another, feeds every sample
//! that was retrieved into correlation and the entity builders, and reports
//! a critical failure only when no exporter could be reached or queried.

use crate::application::builders::{
    BuildOutput, ConsumerEntityBuilder, EntityBuilder, ProducerEntityBuilder, SampleGroup,
    SkippedEntity, StandaloneEntityBuilder,
};
use crate::application::correlation::correlate;
use crate::domain::errors::BuildError;
use crate::domain::ports::MetricExporter;
use crate::domain::report::{DiscoveryResponse, ErrorReport, ValidationResponse};
use crate::domain::sample::{MetricSample, SampleKind};
use crate::domain::settings::TopologySettings;
use crate::infrastructure::observability::Metrics;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub struct DiscoveryClient {
    exporters: Vec<Arc<dyn MetricExporter>>,
    standalone: StandaloneEntityBuilder,
    producer: ProducerEntityBuilder,
    consumer: ConsumerEntityBuilder,
    metrics: Option<Metrics>,
}

impl DiscoveryClient {
    pub fn new(settings: TopologySettings, exporters: Vec<Arc<dyn MetricExporter>>) -> Self {
        let settings = Arc::new(settings);
        Self {
            exporters,
            standalone: StandaloneEntityBuilder::new(settings.clone()),
            producer: ProducerEntityBuilder::new(settings.clone()),
            consumer: ConsumerEntityBuilder::new(settings),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn exporter_names(&self) -> Vec<&str> {
        self.exporters.iter().map(|e| e.name()).collect()
    }

    /// Succeeds as soon as one exporter is reachable.
    pub async fn validate(&self) -> ValidationResponse {
        for exporter in &self.exporters {
            if exporter.validate().await {
                info!("Metric exporter {} is reachable", exporter.name());
                return ValidationResponse::Success;
            }
            error!("Unable to connect to metric exporter {}", exporter.name());
        }
        ValidationResponse::Failure(self.all_failed())
    }

    /// Runs one stateless discovery pass.
    pub async fn discover(&self) -> DiscoveryResponse {
        let started = Instant::now();
        let mut samples = Vec::new();
        let mut any_succeeded = false;

        for exporter in &self.exporters {
            match exporter.query().await {
                Ok(batch) => {
                    debug!("Exporter {} returned {} samples", exporter.name(), batch.len());
                    any_succeeded = true;
                    samples.extend(batch);
                }
                Err(e) => {
                    warn!("Error while querying metrics exporter {}: {}", exporter.name(), e);
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_exporter_failure(exporter.name());
                    }
                }
            }
        }

        if !any_succeeded {
            if let Some(metrics) = &self.metrics {
                metrics.record_pass("failure", started.elapsed().as_secs_f64());
            }
            return DiscoveryResponse::Failure(self.all_failed());
        }

        let sample_count = samples.len();
        let output = self.build_topology(samples);
        for skipped in &output.errors {
            warn!("Skipping entity for {}: {}", skipped.subject, skipped.error);
            if let Some(metrics) = &self.metrics {
                metrics.inc_skipped(skipped.error.reason());
            }
        }

        info!(
            "Discovery pass built {} entities from {} samples ({} skipped) in {:?}",
            output.entities.len(),
            sample_count,
            output.errors.len(),
            started.elapsed()
        );
        if let Some(metrics) = &self.metrics {
            metrics.entities_emitted.set(output.entities.len() as f64);
            metrics.record_pass("success", started.elapsed().as_secs_f64());
        }

        DiscoveryResponse::Topology(output.entities)
    }

    /// Correlates `samples` and runs every builder over the result.
    pub fn build_topology(&self, samples: Vec<MetricSample>) -> BuildOutput {
        let mut standalone = Vec::new();
        let mut relationships = Vec::new();
        for sample in samples {
            match sample.kind {
                SampleKind::Entity => standalone.push(sample),
                SampleKind::Relationship => relationships.push(sample),
            }
        }

        let groups = correlate(relationships);
        if groups.dropped > 0 {
            debug!("Dropped {} uncorrelated samples", groups.dropped);
            if let Some(metrics) = &self.metrics {
                metrics.inc_dropped("uncorrelated", groups.dropped);
            }
        }
        debug!("Producer groups: {:?}", groups.producers.keys().collect::<Vec<_>>());
        debug!("Consumer groups: {:?}", groups.consumers.keys().collect::<Vec<_>>());

        let mut output = self.standalone.build_all(&standalone);
        for (id, group) in &groups.producers {
            output.extend(self.producer.build(&SampleGroup::new(id, group)));
        }
        for (id, group) in &groups.consumers {
            output.extend(self.consumer.build(&SampleGroup::new(id, group)));
        }
        Self::reject_duplicate_ids(output)
    }

    /// Keeps the first entity for each id; later ones become skipped entities.
    fn reject_duplicate_ids(output: BuildOutput) -> BuildOutput {
        let mut seen = HashSet::new();
        let mut unique = BuildOutput {
            entities: Vec::with_capacity(output.entities.len()),
            errors: output.errors,
        };
        for entity in output.entities {
            if seen.insert(entity.id().to_string()) {
                unique.entities.push(entity);
            } else {
                unique.errors.push(SkippedEntity {
                    subject: entity.display_name().to_string(),
                    error: BuildError::DuplicateId(entity.id().to_string()),
                });
            }
        }
        unique
    }

    fn all_failed(&self) -> ErrorReport {
        let description = format!("All exporter queries failed: {:?}", self.exporter_names());
        error!("{}", description);
        ErrorReport::critical(description)
    }
}
