use proptest::prelude::*;
use prometopo::application::correlation::{CorrelationGroups, aggregate_producer, correlate};
use prometopo::application::discovery::DiscoveryClient;
use prometopo::domain::sample::{
    CONSUMER_LABEL, CommodityKind, EntityType, MetricSample, PRODUCER_LABEL,
};
use prometopo::domain::settings::{CommodityCaps, TopologySettings};

fn sample(producer: Option<u8>, consumer: Option<u8>, tps: f64, rt: f64) -> MetricSample {
    let mut sample = MetricSample::relationship(EntityType::VirtualApplication, "s")
        .with_metric(CommodityKind::Transaction, tps)
        .with_metric(CommodityKind::ResponseTime, rt);
    if let Some(p) = producer {
        sample.set_label(PRODUCER_LABEL, format!("ns/p{p}"));
    }
    if let Some(c) = consumer {
        sample.set_label(CONSUMER_LABEL, format!("ns/c{c}"));
    }
    sample
}

fn arb_sample() -> impl Strategy<Value = MetricSample> {
    (
        proptest::option::of(0u8..4),
        proptest::option::of(0u8..4),
        0.0f64..1_000.0,
        0.0f64..2_000.0,
    )
        .prop_map(|(p, c, tps, rt)| sample(p, c, tps, rt))
}

proptest! {
    #[test]
    fn zero_traffic_means_zero_latency(rts in proptest::collection::vec(0.0f64..5_000.0, 0..10)) {
        let samples: Vec<_> = rts.iter().map(|rt| sample(Some(0), None, 0.0, *rt)).collect();
        let aggregate = aggregate_producer(&samples);
        prop_assert_eq!(aggregate.transaction_used, 0.0);
        prop_assert_eq!(aggregate.response_time_used, 0.0);
    }

    #[test]
    fn capacity_never_below_used(
        samples in proptest::collection::vec(arb_sample(), 1..20),
        tx_cap in 1.0f64..100.0,
        rt_cap in 1.0f64..1_000.0,
    ) {
        let caps = CommodityCaps::new(tx_cap, rt_cap);
        for (_, used, capacity) in aggregate_producer(&samples).renormalized(&caps) {
            prop_assert!(capacity >= used);
        }
    }

    #[test]
    fn grouping_is_associative(
        samples in proptest::collection::vec(arb_sample(), 0..30),
        split in 0usize..30,
    ) {
        let split = split.min(samples.len());
        let (left, right) = samples.split_at(split);

        let mut merged: CorrelationGroups = correlate(left.to_vec());
        merged.merge(correlate(right.to_vec()));

        prop_assert_eq!(merged, correlate(samples));
    }

    #[test]
    fn uncorrelated_samples_never_surface(tps in 0.0f64..1_000.0, marker in 1_000_000.0f64..2_000_000.0) {
        // The marker value is out of range for every correlated sample.
        let samples = vec![
            sample(Some(1), Some(2), tps, 10.0),
            sample(None, None, marker, marker),
        ];
        let client = DiscoveryClient::new(TopologySettings::with_scope("p"), Vec::new());
        let output = client.build_topology(samples);

        for entity in &output.entities {
            for sold in entity.commodities_sold() {
                prop_assert!(sold.used != marker);
            }
            if let Some(bought) = entity.bought() {
                for commodity in &bought.commodities {
                    prop_assert!(commodity.used != marker);
                }
            }
        }
    }
}
