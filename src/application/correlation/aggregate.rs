//! Per-producer aggregation of transaction rate and response time.

use crate::domain::sample::{CommodityKind, MetricSample};
use crate::domain::settings::CommodityCaps;
use std::collections::BTreeSet;
use tracing::debug;

/// Used amounts for one producer group, before capacity renormalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerAggregate {
    /// Sum of the transaction rates of the group.
    pub transaction_used: f64,
    /// Transaction-weighted mean response time, 0 when there is no traffic.
    pub response_time_used: f64,
    /// First `KEY` label declared by the group.
    pub key: Option<String>,
    /// Commodity kinds present in the group that aggregation does not handle.
    pub ignored: BTreeSet<CommodityKind>,
}

impl ProducerAggregate {
    pub fn used(&self, kind: CommodityKind) -> Option<f64> {
        match kind {
            CommodityKind::Transaction => Some(self.transaction_used),
            CommodityKind::ResponseTime => Some(self.response_time_used),
            _ => None,
        }
    }

    /// `(kind, used, capacity)` for every aggregated commodity the caps
    /// support. Capacity never ends up below used.
    pub fn renormalized(&self, caps: &CommodityCaps) -> Vec<(CommodityKind, f64, f64)> {
        [CommodityKind::Transaction, CommodityKind::ResponseTime]
            .into_iter()
            .filter_map(|kind| {
                let used = self.used(kind)?;
                caps.renormalize(kind, used).map(|capacity| (kind, used, capacity))
            })
            .collect()
    }
}

pub fn aggregate_producer(samples: &[MetricSample]) -> ProducerAggregate {
    let mut total_transaction = 0.0;
    let mut weighted_response_time = 0.0;
    let mut ignored = BTreeSet::new();

    for sample in samples {
        for kind in sample.metrics.keys() {
            if !matches!(kind, CommodityKind::Transaction | CommodityKind::ResponseTime) {
                ignored.insert(*kind);
            }
        }

        let Some(transaction) = sample.metric(CommodityKind::Transaction) else {
            continue;
        };
        if !transaction.is_finite() || transaction < 0.0 {
            debug!(
                "Ignoring transaction rate {} of sample {}",
                transaction, sample.identity
            );
            continue;
        }
        total_transaction += transaction;

        if let Some(response_time) = sample.metric(CommodityKind::ResponseTime) {
            if response_time.is_finite() && response_time >= 0.0 {
                weighted_response_time += response_time * transaction;
            }
        }
    }

    let response_time_used = if total_transaction > 0.0 {
        weighted_response_time / total_transaction
    } else {
        0.0
    };

    ProducerAggregate {
        transaction_used: total_transaction,
        response_time_used,
        key: samples
            .iter()
            .find_map(|s| s.key().map(str::to_string)),
        ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::{EntityType, KEY_LABEL, PRODUCER_LABEL};

    fn sample(tps: Option<f64>, latency: Option<f64>) -> MetricSample {
        let mut s = MetricSample::relationship(EntityType::VirtualApplication, "id")
            .with_label(PRODUCER_LABEL, "ns/svcA");
        if let Some(v) = tps {
            s.set_metric(CommodityKind::Transaction, v);
        }
        if let Some(v) = latency {
            s.set_metric(CommodityKind::ResponseTime, v);
        }
        s
    }

    #[test]
    fn test_transaction_weighted_response_time() {
        let agg = aggregate_producer(&[sample(Some(10.0), None), sample(Some(30.0), Some(100.0))]);

        assert_eq!(agg.transaction_used, 40.0);
        assert_eq!(agg.response_time_used, 75.0);
    }

    #[test]
    fn test_zero_traffic_yields_zero_response_time() {
        let agg = aggregate_producer(&[sample(Some(0.0), Some(250.0)), sample(None, Some(90.0))]);

        assert_eq!(agg.transaction_used, 0.0);
        assert_eq!(agg.response_time_used, 0.0);
    }

    #[test]
    fn test_key_comes_from_first_declaring_sample() {
        let samples = vec![
            sample(Some(1.0), None),
            sample(Some(1.0), None).with_label(KEY_LABEL, "shared-key"),
            sample(Some(1.0), None).with_label(KEY_LABEL, "other"),
        ];
        assert_eq!(aggregate_producer(&samples).key.as_deref(), Some("shared-key"));
    }

    #[test]
    fn test_renormalized_raises_capacity() {
        let agg = aggregate_producer(&[sample(Some(50.0), Some(800.0))]);
        let sold = agg.renormalized(&CommodityCaps::default());

        assert_eq!(
            sold,
            vec![
                (CommodityKind::Transaction, 50.0, 50.0),
                (CommodityKind::ResponseTime, 800.0, 800.0),
            ]
        );
    }

    #[test]
    fn test_unhandled_kinds_are_reported() {
        let agg = aggregate_producer(&[sample(Some(1.0), None).with_metric(CommodityKind::Vcpu, 0.3)]);
        assert!(agg.ignored.contains(&CommodityKind::Vcpu));
    }
}
