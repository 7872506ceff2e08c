use super::stitching::{proxy_vm_rule, standalone_rule};
use super::{BuildOutput, EntityBuilder};
use crate::domain::entity::{
    BoughtRelationship, CommodityBought, CommoditySold, Entity, EntityDraft, EntityRole,
    ExternalMatchRule, PatchSide, STITCHING_ATTRIBUTE, StitchingProperty, VAPP_PREFIX,
    standalone_entity_id,
};
use crate::domain::errors::BuildError;
use crate::domain::sample::{
    CommodityKind, EntityType, IP_LABEL, MetricSample, NAME_LABEL, SERVICE_NAME_LABEL,
    SERVICE_NAMESPACE_LABEL,
};
use crate::domain::settings::TopologySettings;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Commodities an application entity always sells.
const APP_COMMODITIES: [CommodityKind; 2] =
    [CommodityKind::Transaction, CommodityKind::ResponseTime];
const VM_COMMODITIES: [CommodityKind; 2] = [CommodityKind::Vcpu, CommodityKind::Vmem];

/// Naming of a directly observed endpoint.
struct Endpoint<'a> {
    uid: &'a str,
    ip: &'a str,
    name: &'a str,
}

impl<'a> Endpoint<'a> {
    fn of(sample: &'a MetricSample) -> Self {
        let uid = sample.identity.as_str();
        Self {
            uid,
            ip: sample.label(IP_LABEL).unwrap_or(uid),
            name: sample.label(NAME_LABEL).unwrap_or(uid),
        }
    }
}

/// Builds a directly observed entity, its consumer proxy and, optionally, a
/// placeholder VM it buys from.
pub struct StandaloneEntityBuilder {
    settings: Arc<TopologySettings>,
}

impl StandaloneEntityBuilder {
    pub fn new(settings: Arc<TopologySettings>) -> Self {
        Self { settings }
    }

    fn id(&self, entity_type: EntityType, name: &str) -> String {
        standalone_entity_id(entity_type, &self.settings.scope, name)
    }

    fn proxy_vm(&self, endpoint: &Endpoint<'_>) -> Result<Entity, BuildError> {
        let vm = EntityType::VirtualMachine;
        let mut draft = EntityDraft::new(
            vm,
            self.id(vm, endpoint.uid),
            self.id(vm, endpoint.name),
            EntityRole::Seller,
            StitchingProperty::display_name(endpoint.ip),
            proxy_vm_rule(),
        );
        for kind in VM_COMMODITIES {
            match self.settings.caps.get(kind) {
                Some(capacity) => draft.commodities_sold.push(CommoditySold {
                    kind,
                    used: 0.0,
                    capacity,
                    key: None,
                }),
                None => warn!("Proxy VM {}: {}", endpoint.uid, BuildError::UnsupportedCommodity(kind)),
            }
        }
        draft.keep_standalone = Some(self.settings.keep_standalone);
        draft.build()
    }

    fn primary(
        &self,
        sample: &MetricSample,
        endpoint: &Endpoint<'_>,
        provider: Option<&Entity>,
    ) -> Result<Entity, BuildError> {
        let entity_type = sample.entity_type;
        if !self.settings.recognizes(entity_type) {
            return Err(BuildError::UnsupportedEntityType(entity_type));
        }

        let key = match (
            sample.label(SERVICE_NAMESPACE_LABEL),
            sample.label(SERVICE_NAME_LABEL),
        ) {
            (Some(ns), Some(svc)) if !ns.is_empty() && !svc.is_empty() => format!("{}/{}", ns, svc),
            _ => endpoint.ip.to_string(),
        };

        // Missing application commodities are sold with zero usage.
        let mut usage: BTreeMap<CommodityKind, f64> =
            APP_COMMODITIES.iter().map(|kind| (*kind, 0.0)).collect();
        for (kind, used) in &sample.metrics {
            if APP_COMMODITIES.contains(kind) {
                usage.insert(*kind, *used);
            } else {
                warn!("Entity {}: {}", endpoint.uid, BuildError::UnsupportedCommodity(*kind));
            }
        }

        let mut sold = Vec::new();
        for (kind, used) in usage {
            match self.settings.caps.renormalize(kind, used) {
                Some(capacity) => sold.push(CommoditySold {
                    kind,
                    used,
                    capacity,
                    key: Some(key.clone()),
                }),
                None => warn!("Entity {}: {}", endpoint.uid, BuildError::UnsupportedCommodity(kind)),
            }
        }

        let mut draft = EntityDraft::new(
            entity_type,
            self.id(entity_type, endpoint.uid),
            self.id(entity_type, endpoint.name),
            EntityRole::Seller,
            StitchingProperty::display_name(endpoint.ip),
            standalone_rule(entity_type, PatchSide::Selling, sold.iter().map(|c| c.kind)),
        );
        draft.commodities_sold = sold;

        match provider {
            Some(provider) => {
                draft.role = EntityRole::Reseller;
                draft.bought = Some(BoughtRelationship {
                    provider_type: provider.entity_type(),
                    provider_id: provider.id().to_string(),
                    commodities: provider
                        .commodities_sold()
                        .iter()
                        .map(CommodityBought::from)
                        .collect(),
                });
            }
            None => draft.keep_standalone = Some(self.settings.keep_standalone),
        }
        draft.build()
    }

    fn consumer_proxy(&self, provider: &Entity, endpoint: &Endpoint<'_>) -> Result<Entity, BuildError> {
        if provider.entity_type() != EntityType::Application {
            return Err(BuildError::UnsupportedProviderType(provider.entity_type()));
        }

        let vapp = EntityType::VirtualApplication;
        let bought: Vec<CommodityBought> = provider
            .commodities_sold()
            .iter()
            .map(CommodityBought::from)
            .collect();
        let matching = if self.settings.create_proxy_vm {
            ExternalMatchRule::new(STITCHING_ATTRIBUTE, STITCHING_ATTRIBUTE)
        } else {
            standalone_rule(vapp, PatchSide::Buying, bought.iter().map(|c| c.kind))
        };

        let mut draft = EntityDraft::new(
            vapp,
            self.id(vapp, endpoint.uid),
            self.id(vapp, endpoint.name),
            EntityRole::ConsumerProxy,
            StitchingProperty::display_name(format!("{}{}", VAPP_PREFIX, endpoint.ip)),
            matching,
        );
        draft.bought = Some(BoughtRelationship {
            provider_type: provider.entity_type(),
            provider_id: provider.id().to_string(),
            commodities: bought,
        });
        if !self.settings.create_proxy_vm {
            draft.keep_standalone = Some(self.settings.keep_standalone);
        }
        draft.build()
    }
}

impl EntityBuilder<MetricSample> for StandaloneEntityBuilder {
    fn build(&self, sample: &MetricSample) -> BuildOutput {
        let endpoint = Endpoint::of(sample);
        let mut output = BuildOutput::default();

        let vm = if self.settings.create_proxy_vm {
            match self.proxy_vm(&endpoint) {
                Ok(vm) => Some(vm),
                Err(error) => {
                    output.push_result(endpoint.uid, Err(error));
                    return output;
                }
            }
        } else {
            None
        };

        let primary = match self.primary(sample, &endpoint, vm.as_ref()) {
            Ok(primary) => primary,
            Err(error) => {
                output.push_result(endpoint.uid, Err(error));
                return output;
            }
        };
        let proxy = self.consumer_proxy(&primary, &endpoint);

        output.entities.extend(vm);
        output.entities.push(primary);
        output.push_result(endpoint.uid, proxy);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(create_proxy_vm: bool) -> Arc<TopologySettings> {
        Arc::new(TopologySettings {
            create_proxy_vm,
            ..TopologySettings::with_scope("k8s")
        })
    }

    fn app_sample() -> MetricSample {
        MetricSample::entity(EntityType::Application, "10.0.0.7")
            .with_label(NAME_LABEL, "shop/cart-7f9")
            .with_label(SERVICE_NAMESPACE_LABEL, "shop")
            .with_label(SERVICE_NAME_LABEL, "cart")
            .with_metric(CommodityKind::Transaction, 50.0)
    }

    #[test]
    fn test_application_and_consumer_proxy() {
        let output = StandaloneEntityBuilder::new(settings(false)).build(&app_sample());

        assert!(output.errors.is_empty());
        assert_eq!(output.entities.len(), 2);

        let app = &output.entities[0];
        assert_eq!(app.id(), "APPLICATION-k8s:10.0.0.7");
        assert_eq!(app.display_name(), "APPLICATION-k8s:shop/cart-7f9");
        assert_eq!(app.property().value, "10.0.0.7");
        assert_eq!(app.keep_standalone(), Some(true));

        let tps = app.sold(CommodityKind::Transaction).unwrap();
        assert_eq!((tps.used, tps.capacity), (50.0, 50.0));
        assert_eq!(tps.key.as_deref(), Some("shop/cart"));
        let latency = app.sold(CommodityKind::ResponseTime).unwrap();
        assert_eq!((latency.used, latency.capacity), (0.0, 500.0));

        let vapp = &output.entities[1];
        assert_eq!(vapp.entity_type(), EntityType::VirtualApplication);
        assert_eq!(vapp.id(), "VIRTUAL_APPLICATION-k8s:10.0.0.7");
        assert_eq!(vapp.provider_id(), Some(app.id()));
        assert_eq!(vapp.property().value, "vApp-10.0.0.7");
        assert_eq!(vapp.bought().unwrap().commodities.len(), 2);
        assert!(vapp.matching().use_extended_lookup);
    }

    #[test]
    fn test_proxy_vm_is_inserted_as_provider() {
        let output = StandaloneEntityBuilder::new(settings(true)).build(&app_sample());

        let types: Vec<_> = output.entities.iter().map(|e| e.entity_type()).collect();
        assert_eq!(
            types,
            vec![
                EntityType::VirtualMachine,
                EntityType::Application,
                EntityType::VirtualApplication
            ]
        );

        let vm = &output.entities[0];
        let app = &output.entities[1];
        assert_eq!(vm.matching().external_attribute, "IP");
        assert!(vm.commodities_sold().iter().all(|c| c.used == 0.0));
        assert_eq!(app.role(), EntityRole::Reseller);
        assert_eq!(app.provider_id(), Some(vm.id()));
        assert_eq!(app.keep_standalone(), None);
        assert_eq!(output.entities[2].keep_standalone(), None);
    }

    #[test]
    fn test_non_application_primary_keeps_entity_without_proxy() {
        let sample = MetricSample::entity(EntityType::VirtualApplication, "10.0.0.8")
            .with_metric(CommodityKind::Transaction, 1.0);
        let output = StandaloneEntityBuilder::new(settings(false)).build(&sample);

        assert_eq!(output.entities.len(), 1);
        assert_eq!(
            output.errors[0].error,
            BuildError::UnsupportedProviderType(EntityType::VirtualApplication)
        );
    }

    #[test]
    fn test_key_falls_back_to_ip() {
        let sample = MetricSample::entity(EntityType::Application, "uid-1")
            .with_label(IP_LABEL, "10.1.1.1")
            .with_label(SERVICE_NAMESPACE_LABEL, "shop")
            .with_metric(CommodityKind::Transaction, 1.0);
        let output = StandaloneEntityBuilder::new(settings(false)).build(&sample);

        let app = &output.entities[0];
        assert_eq!(app.id(), "APPLICATION-k8s:uid-1");
        assert_eq!(
            app.sold(CommodityKind::Transaction).unwrap().key.as_deref(),
            Some("10.1.1.1")
        );
    }

    #[test]
    fn test_unsupported_entity_type_fails_whole_unit() {
        let sample = MetricSample::entity(EntityType::VirtualMachine, "vm-1")
            .with_metric(CommodityKind::Transaction, 1.0);
        let output = StandaloneEntityBuilder::new(settings(true)).build(&sample);

        assert!(output.entities.is_empty());
        assert_eq!(
            output.errors[0].error,
            BuildError::UnsupportedEntityType(EntityType::VirtualMachine)
        );
    }
}
