use super::stitching::consumer_rule;
use super::{BuildOutput, EntityBuilder, SampleGroup};
use crate::domain::entity::{
    BoughtRelationship, CommodityBought, Entity, EntityDraft, EntityRole, StitchingProperty,
    VAPP_PREFIX, entity_id,
};
use crate::domain::errors::BuildError;
use crate::domain::sample::{CommodityKind, EntityType, MetricSample};
use crate::domain::settings::TopologySettings;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Latest observed purchase from one producer.
#[derive(Debug)]
struct Purchase {
    entity_type: EntityType,
    key: Option<(DateTime<Utc>, String)>,
    values: BTreeMap<CommodityKind, (DateTime<Utc>, f64)>,
}

impl Purchase {
    fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            key: None,
            values: BTreeMap::new(),
        }
    }

    /// Last write wins: a sample replaces what is recorded unless the
    /// recorded value is strictly newer.
    fn record(&mut self, sample: &MetricSample) {
        let at = sample.timestamp;
        if let Some(key) = sample.key() {
            if !matches!(&self.key, Some((seen, _)) if *seen > at) {
                self.key = Some((at, key.to_string()));
            }
        }
        for (kind, value) in &sample.metrics {
            if !matches!(self.values.get(kind), Some((seen, _)) if *seen > at) {
                self.values.insert(*kind, (at, *value));
            }
        }
    }
}

/// Builds one buying proxy per (consumer, producer) pair found in a consumer
/// group.
pub struct ConsumerEntityBuilder {
    settings: Arc<TopologySettings>,
}

impl ConsumerEntityBuilder {
    pub fn new(settings: Arc<TopologySettings>) -> Self {
        Self { settings }
    }

    fn purchases(group: &SampleGroup<'_>) -> BTreeMap<String, Purchase> {
        let mut purchases: BTreeMap<String, Purchase> = BTreeMap::new();
        for sample in group.samples {
            let Some(producer) = sample.producer() else {
                debug!(
                    "Consumer {}: sample {} names no producer",
                    group.id, sample.identity
                );
                continue;
            };
            purchases
                .entry(producer.to_string())
                .or_insert_with(|| Purchase::new(sample.entity_type))
                .record(sample);
        }
        purchases
    }

    fn build_purchase(
        &self,
        consumer: &str,
        producer: &str,
        purchase: Purchase,
    ) -> Result<Entity, BuildError> {
        let entity_type = purchase.entity_type;
        if !self.settings.recognizes(entity_type) {
            return Err(BuildError::UnsupportedEntityType(entity_type));
        }

        let key = purchase
            .key
            .map(|(_, key)| key)
            .unwrap_or_else(|| producer.to_string());
        let mut commodities = Vec::new();
        for (kind, (_, used)) in purchase.values {
            if self.settings.caps.get(kind).is_none() {
                warn!(
                    "Consumer {} of {}: {}",
                    consumer,
                    producer,
                    BuildError::UnsupportedCommodity(kind)
                );
                continue;
            }
            commodities.push(CommodityBought {
                kind,
                used,
                key: Some(key.clone()),
            });
        }

        let scope = &self.settings.scope;
        let mut draft = EntityDraft::new(
            entity_type,
            entity_id(entity_type, scope, &format!("{}->{}", consumer, producer)),
            format!("{}{}->{}", VAPP_PREFIX, consumer, producer),
            EntityRole::ConsumerProxy,
            StitchingProperty::display_name(consumer),
            consumer_rule(commodities.iter().map(|c| c.kind)),
        );
        draft.bought = Some(BoughtRelationship {
            provider_type: entity_type,
            provider_id: entity_id(entity_type, scope, producer),
            commodities,
        });
        draft.build()
    }
}

impl<'a> EntityBuilder<SampleGroup<'a>> for ConsumerEntityBuilder {
    fn build(&self, group: &SampleGroup<'a>) -> BuildOutput {
        let mut output = BuildOutput::default();
        for (producer, purchase) in Self::purchases(group) {
            let subject = format!("{}->{}", group.id, producer);
            output.push_result(&subject, self.build_purchase(group.id, &producer, purchase));
        }
        output
    }
}
