//! Periodic discovery loop.
//!
//! Each tick runs one independent discovery pass and hands the outcome to the
//! configured sink. Nothing survives from one pass to the next.

use crate::application::discovery::DiscoveryClient;
use crate::domain::ports::TopologySink;
use crate::domain::report::DiscoveryResponse;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct DiscoveryService {
    client: Arc<DiscoveryClient>,
    sink: Arc<dyn TopologySink>,
    interval: Duration,
}

impl DiscoveryService {
    pub fn new(client: Arc<DiscoveryClient>, sink: Arc<dyn TopologySink>, interval_seconds: u64) -> Self {
        Self {
            client,
            sink,
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    /// Runs one pass and publishes its outcome.
    pub async fn run_once(&self) -> DiscoveryResponse {
        let response = self.client.discover().await;
        let published = match &response {
            DiscoveryResponse::Topology(entities) => self.sink.publish(entities).await,
            DiscoveryResponse::Failure(report) => self.sink.report_failure(report).await,
        };
        if let Err(e) = published {
            warn!("DiscoveryService: failed to publish discovery outcome: {}", e);
        }
        response
    }

    /// Validates the exporters, then runs a pass on every tick.
    pub async fn run(self) {
        info!(
            "DiscoveryService: starting (interval: {:?}, exporters: {:?})",
            self.interval,
            self.client.exporter_names()
        );
        if !self.client.validate().await.is_success() {
            warn!("DiscoveryService: no exporter reachable yet, discovering anyway");
        }

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MetricExporter;
    use crate::domain::sample::{CommodityKind, EntityType, MetricSample, PRODUCER_LABEL};
    use crate::domain::settings::TopologySettings;
    use crate::infrastructure::mock::{CollectingSink, FailingExporter, StaticExporter};

    #[tokio::test]
    async fn test_run_once_publishes_topology() {
        let exporters: Vec<Arc<dyn MetricExporter>> = vec![Arc::new(StaticExporter::new(
            "static",
            vec![MetricSample::relationship(EntityType::VirtualApplication, "s")
                .with_label(PRODUCER_LABEL, "ns/cart")
                .with_metric(CommodityKind::Transaction, 1.0)],
        ))];
        let client = Arc::new(DiscoveryClient::new(TopologySettings::default(), exporters));
        let sink = Arc::new(CollectingSink::default());
        let service = DiscoveryService::new(client, sink.clone(), 60);

        service.run_once().await;

        let published = sink.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].len(), 1);
        assert!(sink.failures().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_once_reports_failure() {
        let exporters: Vec<Arc<dyn MetricExporter>> = vec![Arc::new(FailingExporter::new("down"))];
        let client = Arc::new(DiscoveryClient::new(TopologySettings::default(), exporters));
        let sink = Arc::new(CollectingSink::default());
        let service = DiscoveryService::new(client, sink.clone(), 60);

        let response = service.run_once().await;

        assert!(!response.is_success());
        assert!(sink.published().await.is_empty());
        assert_eq!(sink.failures().await.len(), 1);
    }
}
