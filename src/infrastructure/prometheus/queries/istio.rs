//! Istio sidecar telemetry.
//!
//! Relationship queries group request counters by source and destination
//! workload; the consumer is `srcNs/srcApp` and the producer `dstNs/dstApp`.
//! Service queries group by destination service and yield directly observed
//! application samples.

use super::{RATE_WINDOW, checked_value};
use crate::application::correlation::composite_key;
use crate::domain::errors::CorrelationMiss;
use crate::domain::ports::QuerySpec;
use crate::domain::sample::{
    CATEGORY_LABEL, CONSUMER_LABEL, CommodityKind, EntityType, MetricSample, NAME_LABEL,
    PRODUCER_LABEL, RawSeries, SERVICE_NAME_LABEL, SERVICE_NAMESPACE_LABEL,
};

pub const CATEGORY: &str = "Istio";

pub const SOURCE_NAMESPACE: &str = "source_workload_namespace";
pub const SOURCE_APP: &str = "source_app";
pub const DESTINATION_NAMESPACE: &str = "destination_workload_namespace";
pub const DESTINATION_APP: &str = "destination_app";
pub const DESTINATION_SERVICE_NAMESPACE: &str = "destination_service_namespace";
pub const DESTINATION_SERVICE_NAME: &str = "destination_service_name";

const REQUESTS: &str = "istio_requests_total";
const DURATION: &str = "istio_request_duration_milliseconds";

fn rate(metric: &str, by: &str) -> String {
    format!("sum(rate({metric}{{reporter=\"destination\"}}[{RATE_WINDOW}])) by ({by})")
}

fn mean_duration(by: &str) -> String {
    format!(
        "{} / {}",
        rate(&format!("{DURATION}_sum"), by),
        rate(&format!("{DURATION}_count"), by)
    )
}

/// Per-edge transaction rate or mean latency between two workloads.
pub struct IstioRelationshipQuery {
    name: String,
    query: String,
    commodity: CommodityKind,
}

impl IstioRelationshipQuery {
    const GROUPING: &'static str =
        "source_workload_namespace, source_app, destination_workload_namespace, destination_app";

    pub fn transactions() -> Self {
        Self {
            name: "istio_edge_tps".to_string(),
            query: rate(REQUESTS, Self::GROUPING),
            commodity: CommodityKind::Transaction,
        }
    }

    pub fn response_time() -> Self {
        Self {
            name: "istio_edge_latency".to_string(),
            query: mean_duration(Self::GROUPING),
            commodity: CommodityKind::ResponseTime,
        }
    }
}

impl QuerySpec for IstioRelationshipQuery {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self) -> &str {
        &self.query
    }

    fn parse(&self, series: &RawSeries) -> Result<MetricSample, CorrelationMiss> {
        let consumer = composite_key(&series.labels, &[SOURCE_NAMESPACE, SOURCE_APP])?;
        let producer = composite_key(&series.labels, &[DESTINATION_NAMESPACE, DESTINATION_APP])?;
        let value = checked_value(series)?;

        Ok(
            MetricSample::relationship(
                EntityType::VirtualApplication,
                format!("{consumer}->{producer}"),
            )
            .with_label(CONSUMER_LABEL, consumer)
            .with_label(PRODUCER_LABEL, producer)
            .with_label(CATEGORY_LABEL, CATEGORY)
            .with_metric(self.commodity, value)
            .at(series.timestamp),
        )
    }
}

/// Service-level transaction rate or latency for one destination service.
pub struct IstioServiceQuery {
    name: String,
    query: String,
    commodity: CommodityKind,
}

impl IstioServiceQuery {
    const GROUPING: &'static str = "destination_service_namespace, destination_service_name";

    pub fn transactions() -> Self {
        Self {
            name: "istio_service_tps".to_string(),
            query: rate(REQUESTS, Self::GROUPING),
            commodity: CommodityKind::Transaction,
        }
    }

    pub fn response_time() -> Self {
        Self {
            name: "istio_service_latency".to_string(),
            query: mean_duration(Self::GROUPING),
            commodity: CommodityKind::ResponseTime,
        }
    }
}

impl QuerySpec for IstioServiceQuery {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self) -> &str {
        &self.query
    }

    fn parse(&self, series: &RawSeries) -> Result<MetricSample, CorrelationMiss> {
        let identity = composite_key(
            &series.labels,
            &[DESTINATION_SERVICE_NAMESPACE, DESTINATION_SERVICE_NAME],
        )?;
        let value = checked_value(series)?;
        let namespace = series.label(DESTINATION_SERVICE_NAMESPACE).unwrap_or_default();
        let service = series.label(DESTINATION_SERVICE_NAME).unwrap_or_default();

        Ok(MetricSample::entity(EntityType::Application, identity.clone())
            .with_label(SERVICE_NAMESPACE_LABEL, namespace)
            .with_label(SERVICE_NAME_LABEL, service)
            .with_label(NAME_LABEL, identity)
            .with_label(CATEGORY_LABEL, CATEGORY)
            .with_metric(self.commodity, value)
            .at(series.timestamp))
    }
}

/// Every Istio query, relationship and service level.
pub fn preset() -> Vec<Box<dyn QuerySpec>> {
    vec![
        Box::new(IstioRelationshipQuery::transactions()),
        Box::new(IstioRelationshipQuery::response_time()),
        Box::new(IstioServiceQuery::transactions()),
        Box::new(IstioServiceQuery::response_time()),
    ]
}
