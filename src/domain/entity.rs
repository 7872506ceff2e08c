//! Topology entities handed to the external encoder.
//!
//! Entities are only created through [`EntityDraft::build`], which checks the
//! whole draft and reports every broken rule at once. Once built an entity is
//! immutable.

use crate::domain::errors::{BuildError, EntityViolation};
use crate::domain::sample::{CommodityKind, EntityType};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Attribute used by the receiving system to merge entities across sources.
pub const STITCHING_ATTRIBUTE: &str = "DisplayName";
pub const DEFAULT_PROPERTY_NAMESPACE: &str = "DEFAULT";
/// External attribute a proxy VM is matched on.
pub const VM_IP_ATTRIBUTE: &str = "IP";
pub const VAPP_PREFIX: &str = "vApp-";

/// Stable id for an entity of `entity_type` named `name` within `scope`.
pub fn entity_id(entity_type: EntityType, scope: &str, name: &str) -> String {
    format!("{}-{}/{}", entity_type, scope, name)
}

/// Id for a directly observed entity. The `:` separator keeps these apart
/// from correlated entities of the same name.
pub fn standalone_entity_id(entity_type: EntityType, scope: &str, name: &str) -> String {
    format!("{}-{}:{}", entity_type, scope, name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityRole {
    /// Sells commodities and buys nothing.
    Seller,
    /// Sells commodities and buys from exactly one provider.
    Reseller,
    /// Buys from exactly one provider and sells nothing.
    ConsumerProxy,
}

impl fmt::Display for EntityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityRole::Seller => "seller",
            EntityRole::Reseller => "reseller",
            EntityRole::ConsumerProxy => "consumer proxy",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommoditySold {
    pub kind: CommodityKind,
    pub used: f64,
    pub capacity: f64,
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommodityBought {
    pub kind: CommodityKind,
    pub used: f64,
    pub key: Option<String>,
}

impl From<&CommoditySold> for CommodityBought {
    fn from(sold: &CommoditySold) -> Self {
        Self {
            kind: sold.kind,
            used: sold.used,
            key: sold.key.clone(),
        }
    }
}

/// Purchase from one provider, referenced by id rather than owned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoughtRelationship {
    pub provider_type: EntityType,
    pub provider_id: String,
    pub commodities: Vec<CommodityBought>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StitchingProperty {
    pub namespace: String,
    pub name: String,
    pub value: String,
}

impl StitchingProperty {
    /// Property under the default namespace and stitching attribute.
    pub fn display_name(value: impl Into<String>) -> Self {
        Self {
            namespace: DEFAULT_PROPERTY_NAMESPACE.to_string(),
            name: STITCHING_ATTRIBUTE.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatchSide {
    Buying,
    Selling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommodityProperty {
    Used,
    Capacity,
}

/// Commodity properties the receiving system copies from this entity onto
/// the entity it is merged into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyPatch {
    pub side: PatchSide,
    pub kind: CommodityKind,
    pub properties: Vec<CommodityProperty>,
}

/// How the receiving system finds the entity this one should be merged into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalMatchRule {
    /// Local property name to match with.
    pub internal_attribute: String,
    /// Attribute looked up on the external entity.
    pub external_attribute: String,
    /// Entity type of the server-side property definition, when the lookup
    /// goes through extended topology properties.
    pub external_entity_type: Option<EntityType>,
    pub use_extended_lookup: bool,
    pub patches: Vec<PropertyPatch>,
}

impl ExternalMatchRule {
    pub fn new(internal_attribute: &str, external_attribute: &str) -> Self {
        Self {
            internal_attribute: internal_attribute.to_string(),
            external_attribute: external_attribute.to_string(),
            external_entity_type: None,
            use_extended_lookup: false,
            patches: Vec::new(),
        }
    }

    pub fn extended(mut self, entity_type: EntityType) -> Self {
        self.external_entity_type = Some(entity_type);
        self.use_extended_lookup = true;
        self
    }

    pub fn patch(
        mut self,
        side: PatchSide,
        kind: CommodityKind,
        properties: &[CommodityProperty],
    ) -> Self {
        self.patches.push(PropertyPatch {
            side,
            kind,
            properties: properties.to_vec(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    entity_type: EntityType,
    id: String,
    display_name: String,
    role: EntityRole,
    commodities_sold: Vec<CommoditySold>,
    bought: Option<BoughtRelationship>,
    property: StitchingProperty,
    matching: ExternalMatchRule,
    monitored: bool,
    keep_standalone: Option<bool>,
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn role(&self) -> EntityRole {
        self.role
    }

    pub fn commodities_sold(&self) -> &[CommoditySold] {
        &self.commodities_sold
    }

    pub fn sold(&self, kind: CommodityKind) -> Option<&CommoditySold> {
        self.commodities_sold.iter().find(|c| c.kind == kind)
    }

    pub fn bought(&self) -> Option<&BoughtRelationship> {
        self.bought.as_ref()
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.bought.as_ref().map(|b| b.provider_id.as_str())
    }

    pub fn property(&self) -> &StitchingProperty {
        &self.property
    }

    pub fn matching(&self) -> &ExternalMatchRule {
        &self.matching
    }

    pub fn monitored(&self) -> bool {
        self.monitored
    }

    pub fn keep_standalone(&self) -> Option<bool> {
        self.keep_standalone
    }
}

/// Unchecked entity description. Call [`EntityDraft::build`] to obtain an
/// [`Entity`].
#[derive(Debug, Clone)]
pub struct EntityDraft {
    pub entity_type: EntityType,
    pub id: String,
    pub display_name: String,
    pub role: EntityRole,
    pub commodities_sold: Vec<CommoditySold>,
    pub bought: Option<BoughtRelationship>,
    pub property: StitchingProperty,
    pub matching: ExternalMatchRule,
    pub monitored: bool,
    pub keep_standalone: Option<bool>,
}

impl EntityDraft {
    pub fn new(
        entity_type: EntityType,
        id: impl Into<String>,
        display_name: impl Into<String>,
        role: EntityRole,
        property: StitchingProperty,
        matching: ExternalMatchRule,
    ) -> Self {
        Self {
            entity_type,
            id: id.into(),
            display_name: display_name.into(),
            role,
            commodities_sold: Vec::new(),
            bought: None,
            property,
            matching,
            monitored: false,
            keep_standalone: None,
        }
    }

    pub fn build(self) -> Result<Entity, BuildError> {
        let violations = self.violations();
        if !violations.is_empty() {
            return Err(BuildError::InvalidEntity {
                id: self.id,
                violations,
            });
        }

        Ok(Entity {
            entity_type: self.entity_type,
            id: self.id,
            display_name: self.display_name,
            role: self.role,
            commodities_sold: self.commodities_sold,
            bought: self.bought,
            property: self.property,
            matching: self.matching,
            monitored: self.monitored,
            keep_standalone: self.keep_standalone,
        })
    }

    fn violations(&self) -> Vec<EntityViolation> {
        let mut violations = Vec::new();

        if self.id.trim().is_empty() {
            violations.push(EntityViolation::EmptyId);
        }
        if self.display_name.trim().is_empty() {
            violations.push(EntityViolation::EmptyDisplayName);
        }

        let mut seen = HashSet::new();
        for commodity in &self.commodities_sold {
            if !valid_amount(commodity.used) {
                violations.push(EntityViolation::InvalidUsed {
                    kind: commodity.kind,
                    value: commodity.used,
                });
            } else if !commodity.capacity.is_finite() || commodity.capacity < commodity.used {
                violations.push(EntityViolation::InvalidCapacity {
                    kind: commodity.kind,
                    used: commodity.used,
                    capacity: commodity.capacity,
                });
            }
            if !seen.insert((commodity.kind, commodity.key.clone())) {
                violations.push(EntityViolation::DuplicateSold {
                    kind: commodity.kind,
                    key: commodity.key.clone(),
                });
            }
        }

        if let Some(bought) = &self.bought {
            if bought.commodities.is_empty() {
                violations.push(EntityViolation::EmptyPurchase {
                    provider_id: bought.provider_id.clone(),
                });
            }
            if bought.provider_id == self.id {
                violations.push(EntityViolation::SelfProvider);
            }
            for commodity in &bought.commodities {
                if !valid_amount(commodity.used) {
                    violations.push(EntityViolation::InvalidUsed {
                        kind: commodity.kind,
                        value: commodity.used,
                    });
                }
            }
        }

        match (self.role, &self.bought) {
            (EntityRole::Seller, Some(bought)) => {
                violations.push(EntityViolation::UnexpectedPurchase {
                    provider_id: bought.provider_id.clone(),
                });
            }
            (EntityRole::Reseller | EntityRole::ConsumerProxy, None) => {
                violations.push(EntityViolation::MissingProvider { role: self.role });
            }
            _ => {}
        }
        if self.role == EntityRole::ConsumerProxy && !self.commodities_sold.is_empty() {
            violations.push(EntityViolation::ProxySells);
        }

        violations
    }
}

fn valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
