//! Explicit configuration handed to the correlation stage and the entity
//! builders at construction time.

use crate::domain::sample::{CommodityKind, EntityType};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_TRANSACTION_CAPACITY: f64 = 20.0;
/// Milliseconds.
pub const DEFAULT_RESPONSE_TIME_CAPACITY: f64 = 500.0;
pub const DEFAULT_VCPU_CAPACITY: f64 = 1.0;
pub const DEFAULT_VMEM_CAPACITY: f64 = 1.0;

/// Default capacity per commodity kind. A kind without an entry is not
/// supported by the builders.
#[derive(Debug, Clone, PartialEq)]
pub struct CommodityCaps {
    caps: BTreeMap<CommodityKind, f64>,
}

impl Default for CommodityCaps {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSACTION_CAPACITY, DEFAULT_RESPONSE_TIME_CAPACITY)
    }
}

impl CommodityCaps {
    pub fn new(transaction: f64, response_time: f64) -> Self {
        let caps = BTreeMap::from([
            (CommodityKind::Transaction, transaction),
            (CommodityKind::ResponseTime, response_time),
            (CommodityKind::Vcpu, DEFAULT_VCPU_CAPACITY),
            (CommodityKind::Vmem, DEFAULT_VMEM_CAPACITY),
        ]);
        Self { caps }
    }

    pub fn with_cap(mut self, kind: CommodityKind, cap: f64) -> Self {
        self.caps.insert(kind, cap);
        self
    }

    pub fn get(&self, kind: CommodityKind) -> Option<f64> {
        self.caps.get(&kind).copied()
    }

    /// Capacity for `used`: the default cap, raised to `used` when the
    /// observed usage exceeds it. `None` for unsupported kinds.
    pub fn renormalize(&self, kind: CommodityKind, used: f64) -> Option<f64> {
        self.get(kind).map(|cap| cap.max(used))
    }
}

/// Settings shared by every builder in a discovery pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologySettings {
    /// Target scope mixed into every entity id.
    pub scope: String,
    pub caps: CommodityCaps,
    /// Entity types the builders accept as primary entities.
    pub recognized_entity_types: BTreeSet<EntityType>,
    pub keep_standalone: bool,
    /// Build a placeholder VM as the provider of each standalone application.
    pub create_proxy_vm: bool,
}

impl Default for TopologySettings {
    fn default() -> Self {
        Self {
            scope: "prometheus".to_string(),
            caps: CommodityCaps::default(),
            recognized_entity_types: BTreeSet::from([
                EntityType::Application,
                EntityType::VirtualApplication,
            ]),
            keep_standalone: true,
            create_proxy_vm: false,
        }
    }
}

impl TopologySettings {
    pub fn with_scope(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..Self::default()
        }
    }

    pub fn recognizes(&self, entity_type: EntityType) -> bool {
        self.recognized_entity_types.contains(&entity_type)
    }
}
