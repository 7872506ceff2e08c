//! Metric samples as produced by exporters.
//!
//! A `MetricSample` is one labeled observation for an entity. The `kind`
//! discriminant decides which stage of the pipeline consumes it: directly
//! observed entities go to the standalone builder, relationship samples go
//! through correlation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Reserved label naming the producer side of a relationship sample.
pub const PRODUCER_LABEL: &str = "PRODUCER";
/// Reserved label naming the consumer side of a relationship sample.
pub const CONSUMER_LABEL: &str = "CONSUMER";
/// Reserved label carrying a merge-safe commodity key.
pub const KEY_LABEL: &str = "KEY";

/// Label carrying the endpoint IP of a directly observed entity.
pub const IP_LABEL: &str = "ip";
/// Label carrying the human readable name of a directly observed entity.
pub const NAME_LABEL: &str = "name";
pub const SERVICE_NAME_LABEL: &str = "service_name";
pub const SERVICE_NAMESPACE_LABEL: &str = "service_ns";
/// Label recording which query family produced a sample.
pub const CATEGORY_LABEL: &str = "category";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Application,
    VirtualApplication,
    VirtualMachine,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Application => "APPLICATION",
            EntityType::VirtualApplication => "VIRTUAL_APPLICATION",
            EntityType::VirtualMachine => "VIRTUAL_MACHINE",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "application" | "app" => Ok(EntityType::Application),
            "virtualapplication" | "vapp" => Ok(EntityType::VirtualApplication),
            "virtualmachine" | "vm" => Ok(EntityType::VirtualMachine),
            _ => Err(format!("unknown entity type: {}", s)),
        }
    }
}

/// A quantifiable resource dimension traded between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommodityKind {
    /// Transactions per second.
    Transaction,
    /// Response time in milliseconds.
    ResponseTime,
    Vcpu,
    Vmem,
}

impl CommodityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommodityKind::Transaction => "TRANSACTION",
            CommodityKind::ResponseTime => "RESPONSE_TIME",
            CommodityKind::Vcpu => "VCPU",
            CommodityKind::Vmem => "VMEM",
        }
    }
}

impl fmt::Display for CommodityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommodityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "transaction" | "tps" => Ok(CommodityKind::Transaction),
            "responsetime" | "latency" => Ok(CommodityKind::ResponseTime),
            "vcpu" => Ok(CommodityKind::Vcpu),
            "vmem" => Ok(CommodityKind::Vmem),
            _ => Err(format!("unknown commodity kind: {}", s)),
        }
    }
}

/// Which part of the pipeline a sample feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SampleKind {
    /// A directly observed entity instance (one application endpoint).
    Entity,
    /// A transaction between a named producer and/or consumer.
    Relationship,
}

/// One labeled observation for an entity at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub kind: SampleKind,
    pub entity_type: EntityType,
    pub identity: String,
    pub labels: HashMap<String, String>,
    pub metrics: BTreeMap<CommodityKind, f64>,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(kind: SampleKind, entity_type: EntityType, identity: impl Into<String>) -> Self {
        Self {
            kind,
            entity_type,
            identity: identity.into(),
            labels: HashMap::new(),
            metrics: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn entity(entity_type: EntityType, identity: impl Into<String>) -> Self {
        Self::new(SampleKind::Entity, entity_type, identity)
    }

    pub fn relationship(entity_type: EntityType, identity: impl Into<String>) -> Self {
        Self::new(SampleKind::Relationship, entity_type, identity)
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_label(key, value);
        self
    }

    pub fn with_metric(mut self, kind: CommodityKind, value: f64) -> Self {
        self.set_metric(kind, value);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    /// Records a value for `kind`, replacing any earlier observation.
    pub fn set_metric(&mut self, kind: CommodityKind, value: f64) {
        self.metrics.insert(kind, value);
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn metric(&self, kind: CommodityKind) -> Option<f64> {
        self.metrics.get(&kind).copied()
    }

    pub fn producer(&self) -> Option<&str> {
        self.label(PRODUCER_LABEL)
    }

    pub fn consumer(&self) -> Option<&str> {
        self.label(CONSUMER_LABEL)
    }

    pub fn key(&self) -> Option<&str> {
        self.label(KEY_LABEL)
    }

    /// Folds `other` into `self`: labels and metrics from `other` win, and the
    /// newer timestamp is kept.
    pub fn merge(&mut self, other: MetricSample) {
        self.labels.extend(other.labels);
        self.metrics.extend(other.metrics);
        if other.timestamp > self.timestamp {
            self.timestamp = other.timestamp;
        }
    }
}

/// One element of an instant-vector query result.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub labels: HashMap<String, String>,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl RawSeries {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}
