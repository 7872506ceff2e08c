use crate::domain::errors::SourceError;
use crate::domain::ports::{MetricExporter, QuerySpec};
use crate::domain::sample::{EntityType, MetricSample, SampleKind};
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::prometheus::client::PrometheusClient;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::{debug, info};

/// One Prometheus server queried with a fixed list of QuerySpecs.
///
/// Samples parsed by different specs for the same entity merge into one, so
/// an edge's transaction rate and latency arrive together.
pub struct PrometheusExporter {
    name: String,
    client: PrometheusClient,
    queries: Vec<Box<dyn QuerySpec>>,
    metrics: Option<Metrics>,
}

impl PrometheusExporter {
    pub fn new(
        name: impl Into<String>,
        client: PrometheusClient,
        queries: Vec<Box<dyn QuerySpec>>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            queries,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn query_names(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.name()).collect()
    }
}

#[async_trait]
impl MetricExporter for PrometheusExporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self) -> Result<Vec<MetricSample>, SourceError> {
        let mut merged: BTreeMap<(SampleKind, EntityType, String), MetricSample> = BTreeMap::new();

        for spec in &self.queries {
            let series = self.client.query(spec.query()).await?;
            let mut dropped = 0;
            for raw in &series {
                match spec.parse(raw) {
                    Ok(sample) => {
                        let key = (sample.kind, sample.entity_type, sample.identity.clone());
                        match merged.entry(key) {
                            Entry::Occupied(mut existing) => existing.get_mut().merge(sample),
                            Entry::Vacant(slot) => {
                                slot.insert(sample);
                            }
                        }
                    }
                    Err(miss) => {
                        debug!("{}: dropping series {:?}: {}", spec.name(), raw.labels, miss);
                        dropped += 1;
                        if let Some(metrics) = &self.metrics {
                            metrics.inc_dropped(miss.reason(), 1);
                        }
                    }
                }
            }
            debug!(
                "{}: query {} returned {} series ({} dropped)",
                self.name,
                spec.name(),
                series.len(),
                dropped
            );
        }

        info!("{}: {} samples from {}", self.name, merged.len(), self.client.address());
        Ok(merged.into_values().collect())
    }

    async fn validate(&self) -> bool {
        self.client.is_reachable().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::CommodityKind;
    use crate::infrastructure::prometheus::queries::istio::{
        IstioRelationshipQuery, IstioServiceQuery,
    };
    use mockito::Matcher;
    use std::time::Duration;

    const EDGE_LABELS: &str = r#""source_workload_namespace":"shop","source_app":"web","destination_workload_namespace":"shop","destination_app":"cart""#;

    fn vector(results: &[String]) -> String {
        format!(
            r#"{{"status":"success","data":{{"resultType":"vector","result":[{}]}}}}"#,
            results.join(",")
        )
    }

    fn exporter(url: String, queries: Vec<Box<dyn QuerySpec>>) -> PrometheusExporter {
        PrometheusExporter::new("istio", PrometheusClient::new(url, Duration::from_secs(5), 0), queries)
    }

    #[tokio::test]
    async fn test_specs_merge_into_one_sample_per_edge() {
        let mut server = mockito::Server::new_async().await;
        let tps = IstioRelationshipQuery::transactions();
        let latency = IstioRelationshipQuery::response_time();
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::UrlEncoded("query".into(), tps.query().into()))
            .with_status(200)
            .with_body(vector(&[
                format!(r#"{{"metric":{{{EDGE_LABELS}}},"value":[1700000000,"6"]}}"#),
                r#"{"metric":{"source_app":"web"},"value":[1700000000,"1"]}"#.to_string(),
            ]))
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::UrlEncoded("query".into(), latency.query().into()))
            .with_status(200)
            .with_body(vector(&[format!(
                r#"{{"metric":{{{EDGE_LABELS}}},"value":[1700000000,"42"]}}"#
            )]))
            .create_async()
            .await;

        let metrics = Metrics::new().expect("metrics");
        let samples = exporter(server.url(), vec![Box::new(tps), Box::new(latency)])
            .with_metrics(metrics.clone())
            .query()
            .await
            .expect("query");

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].metric(CommodityKind::Transaction), Some(6.0));
        assert_eq!(samples[0].metric(CommodityKind::ResponseTime), Some(42.0));
        assert!(
            metrics
                .render()
                .contains("prometopo_samples_dropped_total{reason=\"missing_label\"} 1")
        );
    }

    #[tokio::test]
    async fn test_failing_spec_fails_the_exporter() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"status":"error","errorType":"bad_data","error":"unknown function"}"#)
            .create_async()
            .await;

        let result = exporter(server.url(), vec![Box::new(IstioServiceQuery::transactions())])
            .query()
            .await;
        assert!(matches!(result, Err(SourceError::QueryRejected { .. })));
    }

    #[tokio::test]
    async fn test_validate_reflects_reachability() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/status/buildinfo")
            .with_status(503)
            .create_async()
            .await;

        assert!(!exporter(server.url(), Vec::new()).validate().await);
    }
}
