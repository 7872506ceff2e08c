//! Groups relationship samples by the producer and consumer they name.

pub mod aggregate;
pub mod keys;

pub use aggregate::{ProducerAggregate, aggregate_producer};
pub use keys::{ExactMatchPolicy, GATEWAY_NAMESPACE_LABEL, composite_key, required_label};

use crate::domain::sample::MetricSample;
use std::collections::BTreeMap;
use tracing::debug;

/// Correlation key to the samples sharing it, in arrival order.
pub type SampleGroups = BTreeMap<String, Vec<MetricSample>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationGroups {
    pub producers: SampleGroups,
    pub consumers: SampleGroups,
    /// Samples naming neither a producer nor a consumer.
    pub dropped: usize,
}

impl CorrelationGroups {
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty() && self.consumers.is_empty()
    }

    /// Appends `other`'s groups after this one's, key by key.
    pub fn merge(&mut self, other: CorrelationGroups) {
        for (key, samples) in other.producers {
            self.producers.entry(key).or_default().extend(samples);
        }
        for (key, samples) in other.consumers {
            self.consumers.entry(key).or_default().extend(samples);
        }
        self.dropped += other.dropped;
    }
}

/// Sorts samples into producer and consumer groups. A sample naming both
/// lands in both; one naming neither is dropped.
pub fn correlate<I>(samples: I) -> CorrelationGroups
where
    I: IntoIterator<Item = MetricSample>,
{
    let mut groups = CorrelationGroups::default();

    for sample in samples {
        let producer = sample.producer().map(str::to_string);
        let consumer = sample.consumer().map(str::to_string);

        match (producer, consumer) {
            (None, None) => {
                debug!(
                    "Dropping sample {} without producer or consumer label",
                    sample.identity
                );
                groups.dropped += 1;
            }
            (Some(producer), None) => {
                groups.producers.entry(producer).or_default().push(sample);
            }
            (None, Some(consumer)) => {
                groups.consumers.entry(consumer).or_default().push(sample);
            }
            (Some(producer), Some(consumer)) => {
                groups
                    .producers
                    .entry(producer)
                    .or_default()
                    .push(sample.clone());
                groups.consumers.entry(consumer).or_default().push(sample);
            }
        }
    }

    debug!(
        "Correlated {} producer groups, {} consumer groups",
        groups.producers.len(),
        groups.consumers.len()
    );
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::{
        CONSUMER_LABEL, CommodityKind, EntityType, PRODUCER_LABEL,
    };

    fn sample(producer: Option<&str>, consumer: Option<&str>, tps: f64) -> MetricSample {
        let mut s = MetricSample::relationship(EntityType::VirtualApplication, "id")
            .with_metric(CommodityKind::Transaction, tps);
        if let Some(p) = producer {
            s.set_label(PRODUCER_LABEL, p);
        }
        if let Some(c) = consumer {
            s.set_label(CONSUMER_LABEL, c);
        }
        s
    }

    #[test]
    fn test_sample_with_both_labels_joins_both_groups() {
        let groups = correlate(vec![sample(Some("ns/a"), Some("ns/b"), 1.0)]);

        assert_eq!(groups.producers["ns/a"].len(), 1);
        assert_eq!(groups.consumers["ns/b"].len(), 1);
        assert_eq!(groups.dropped, 0);
    }

    #[test]
    fn test_unlabeled_samples_are_dropped() {
        let groups = correlate(vec![
            sample(None, None, 1.0),
            sample(Some("ns/a"), None, 2.0),
            sample(Some("ns/a"), None, 3.0),
        ]);

        assert_eq!(groups.dropped, 1);
        assert_eq!(groups.producers["ns/a"].len(), 2);
        assert!(groups.consumers.is_empty());
    }

    #[test]
    fn test_merge_matches_single_call() {
        let first = vec![sample(Some("ns/a"), Some("ns/c"), 1.0), sample(None, None, 0.0)];
        let second = vec![sample(Some("ns/a"), None, 2.0), sample(None, Some("ns/c"), 3.0)];

        let mut merged = correlate(first.clone());
        merged.merge(correlate(second.clone()));

        let combined = correlate(first.into_iter().chain(second));
        assert_eq!(merged, combined);
    }
}
