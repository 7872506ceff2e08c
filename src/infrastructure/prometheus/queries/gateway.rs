//! API gateway routed traffic (OpenFaaS style).
//!
//! The provider is the routed function, named `sourceApp/host+path`. Only
//! series whose destination namespace is in the gateway allow-list are kept.

use super::istio::{SOURCE_APP, SOURCE_NAMESPACE};
use super::{RATE_WINDOW, checked_value};
use crate::application::correlation::{ExactMatchPolicy, composite_key, required_label};
use crate::domain::errors::CorrelationMiss;
use crate::domain::ports::QuerySpec;
use crate::domain::sample::{
    CATEGORY_LABEL, CONSUMER_LABEL, CommodityKind, EntityType, MetricSample, PRODUCER_LABEL,
    RawSeries,
};

pub const CATEGORY: &str = "Gateway";

pub const DESTINATION_SERVICE: &str = "destination_service";
pub const REQUEST_PATH: &str = "request_path";

const GROUPING: &str = "source_workload_namespace, source_app, destination_workload_namespace, destination_service, request_path";

pub struct GatewayQuery {
    name: String,
    query: String,
    commodity: CommodityKind,
    policy: ExactMatchPolicy,
}

impl GatewayQuery {
    pub fn transactions(policy: ExactMatchPolicy) -> Self {
        Self {
            name: "gateway_tps".to_string(),
            query: format!(
                "sum(rate(istio_requests_total{{reporter=\"destination\"}}[{RATE_WINDOW}])) by ({GROUPING})"
            ),
            commodity: CommodityKind::Transaction,
            policy,
        }
    }

    pub fn response_time(policy: ExactMatchPolicy) -> Self {
        let rate = |metric: &str| {
            format!("sum(rate({metric}{{reporter=\"destination\"}}[{RATE_WINDOW}])) by ({GROUPING})")
        };
        Self {
            name: "gateway_latency".to_string(),
            query: format!(
                "{} / {}",
                rate("istio_request_duration_milliseconds_sum"),
                rate("istio_request_duration_milliseconds_count")
            ),
            commodity: CommodityKind::ResponseTime,
            policy,
        }
    }
}

impl QuerySpec for GatewayQuery {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self) -> &str {
        &self.query
    }

    fn parse(&self, series: &RawSeries) -> Result<MetricSample, CorrelationMiss> {
        self.policy.check(&series.labels)?;

        let source_app = required_label(&series.labels, SOURCE_APP)?;
        let host = required_label(&series.labels, DESTINATION_SERVICE)?;
        let path = required_label(&series.labels, REQUEST_PATH)?;
        let producer = format!("{source_app}/{host}{path}");
        let consumer = composite_key(&series.labels, &[SOURCE_NAMESPACE, SOURCE_APP])?;
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

pub fn preset(policy: ExactMatchPolicy) -> Vec<Box<dyn QuerySpec>> {
    vec![
        Box::new(GatewayQuery::transactions(policy.clone())),
        Box::new(GatewayQuery::response_time(policy)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::correlation::GATEWAY_NAMESPACE_LABEL;
    use crate::infrastructure::prometheus::queries::istio::DESTINATION_NAMESPACE;
    use crate::infrastructure::prometheus::queries::test_support::series;

    fn labels(namespace: &'static str) -> Vec<(&'static str, &'static str)> {
        vec![
            (SOURCE_NAMESPACE, "openfaas"),
            (SOURCE_APP, "gateway"),
            (DESTINATION_NAMESPACE, namespace),
            (DESTINATION_SERVICE, "figlet.openfaas-fn.svc.cluster.local"),
            (REQUEST_PATH, "/function/figlet"),
        ]
    }

    fn query() -> GatewayQuery {
        GatewayQuery::transactions(ExactMatchPolicy::new(GATEWAY_NAMESPACE_LABEL, ["openfaas-fn"]))
    }

    #[test]
    fn test_provider_id_joins_host_and_path() {
        let sample = query().parse(&series(&labels("openfaas-fn"), 1.5)).expect("parse");

        assert_eq!(
            sample.producer(),
            Some("gateway/figlet.openfaas-fn.svc.cluster.local/function/figlet")
        );
        assert_eq!(sample.consumer(), Some("openfaas/gateway"));
        assert_eq!(sample.metric(CommodityKind::Transaction), Some(1.5));
    }

    #[test]
    fn test_namespace_outside_allow_list_is_dropped() {
        let err = query().parse(&series(&labels("default"), 1.5)).unwrap_err();
        assert_eq!(
            err,
            CorrelationMiss::PolicyRejected {
                label: DESTINATION_NAMESPACE.to_string(),
                value: "default".to_string()
            }
        );
    }

    #[test]
    fn test_allow_list_label_is_carried_by_gateway_series() {
        assert_eq!(GATEWAY_NAMESPACE_LABEL, DESTINATION_NAMESPACE);
    }

    #[test]
    fn test_missing_path_is_dropped() {
        let mut pairs = labels("openfaas-fn");
        pairs.retain(|(k, _)| *k != REQUEST_PATH);
        let err = query().parse(&series(&pairs, 1.0)).unwrap_err();
        assert_eq!(err.reason(), "missing_label");
    }
}
