use crate::config::{Config, ExporterPreset};
use crate::domain::ports::{MetricExporter, QuerySpec};
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::prometheus::queries::{QueryFile, gateway, istio};
use crate::infrastructure::prometheus::{PrometheusClient, PrometheusExporter};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ExporterFactory;

impl ExporterFactory {
    /// One exporter per (address, preset), plus one per address for the
    /// generic queries when a query file is configured.
    pub fn create_exporters(
        config: &Config,
        metrics: Option<Metrics>,
    ) -> Result<Vec<Arc<dyn MetricExporter>>> {
        let generic = match &config.prometheus.query_config_path {
            Some(path) => QueryFile::from_file(path)
                .and_then(QueryFile::into_queries)
                .context("Failed to load generic query definitions")?,
            None => Vec::new(),
        };

        let timeout = Duration::from_secs(config.prometheus.timeout_secs);
        let multiple = config.prometheus.addresses.len() > 1;
        let mut exporters: Vec<Arc<dyn MetricExporter>> = Vec::new();

        for address in &config.prometheus.addresses {
            let client = PrometheusClient::new(address.clone(), timeout, config.prometheus.max_retries);
            let name = |family: &str| {
                if multiple {
                    format!("{family}@{address}")
                } else {
                    family.to_string()
                }
            };

            for preset in &config.prometheus.exporters {
                let queries = match preset {
                    ExporterPreset::Istio => istio::preset(),
                    ExporterPreset::Gateway => gateway::preset(config.topology.gateway_policy()),
                };
                exporters.push(Self::exporter(name(&preset.to_string()), client.clone(), queries, &metrics));
            }

            if !generic.is_empty() {
                let queries = generic
                    .iter()
                    .cloned()
                    .map(|q| Box::new(q) as Box<dyn QuerySpec>)
                    .collect();
                exporters.push(Self::exporter(name("generic"), client.clone(), queries, &metrics));
            }
        }

        info!(
            "Created {} metric exporters: {:?}",
            exporters.len(),
            exporters.iter().map(|e| e.name()).collect::<Vec<_>>()
        );
        Ok(exporters)
    }

    fn exporter(
        name: String,
        client: PrometheusClient,
        queries: Vec<Box<dyn QuerySpec>>,
        metrics: &Option<Metrics>,
    ) -> Arc<dyn MetricExporter> {
        let exporter = PrometheusExporter::new(name, client, queries);
        match metrics {
            Some(metrics) => Arc::new(exporter.with_metrics(metrics.clone())),
            None => Arc::new(exporter),
        }
    }
}
