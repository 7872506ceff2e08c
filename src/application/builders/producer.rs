use super::stitching::producer_rule;
use super::{BuildOutput, EntityBuilder, SampleGroup};
use crate::application::correlation::aggregate_producer;
use crate::domain::entity::{
    CommoditySold, Entity, EntityDraft, EntityRole, StitchingProperty, VAPP_PREFIX, entity_id,
};
use crate::domain::errors::BuildError;
use crate::domain::settings::TopologySettings;
use std::sync::Arc;
use tracing::warn;

/// Builds one selling entity per producer group, with aggregated transaction
/// and response time commodities.
pub struct ProducerEntityBuilder {
    settings: Arc<TopologySettings>,
}

impl ProducerEntityBuilder {
    pub fn new(settings: Arc<TopologySettings>) -> Self {
        Self { settings }
    }

    fn build_entity(&self, group: &SampleGroup<'_>) -> Result<Entity, BuildError> {
        let name = group.id;
        let first = group
            .samples
            .first()
            .ok_or_else(|| BuildError::EmptyGroup(name.to_string()))?;
        let entity_type = first.entity_type;
        if !self.settings.recognizes(entity_type) {
            return Err(BuildError::UnsupportedEntityType(entity_type));
        }

        let aggregate = aggregate_producer(group.samples);
        for kind in &aggregate.ignored {
            warn!("Producer {}: {}", name, BuildError::UnsupportedCommodity(*kind));
        }

        let id = entity_id(entity_type, &self.settings.scope, name);
        let display_name = format!("{}{}", VAPP_PREFIX, name);
        // Declared KEY label first, producer name otherwise.
        let key = aggregate.key.clone().unwrap_or_else(|| name.to_string());

        let sold: Vec<CommoditySold> = aggregate
            .renormalized(&self.settings.caps)
            .into_iter()
            .map(|(kind, used, capacity)| CommoditySold {
                kind,
                used,
                capacity,
                key: Some(key.clone()),
            })
            .collect();

        let mut draft = EntityDraft::new(
            entity_type,
            id,
            display_name.clone(),
            EntityRole::Seller,
            StitchingProperty::display_name(display_name),
            producer_rule(sold.iter().map(|c| c.kind)),
        );
        draft.commodities_sold = sold;
        draft.build()
    }
}

impl<'a> EntityBuilder<SampleGroup<'a>> for ProducerEntityBuilder {
    fn build(&self, group: &SampleGroup<'a>) -> BuildOutput {
        let mut output = BuildOutput::default();
        output.push_result(group.id, self.build_entity(group));
        output
    }
}
