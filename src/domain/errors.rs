use crate::domain::entity::EntityRole;
use crate::domain::sample::{CommodityKind, EntityType};
use thiserror::Error;

/// Errors raised by a metric source. The orchestrator recovers from these by
/// skipping the exporter for the current pass.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request to {address} failed: {reason}")]
    Transport { address: String, reason: String },

    #[error("Prometheus at {address} answered HTTP {status}: {body}")]
    HttpStatus {
        address: String,
        status: u16,
        body: String,
    },

    #[error("Query rejected by Prometheus ({error_type}): {message}")]
    QueryRejected { error_type: String, message: String },

    #[error("Malformed response for query '{query}': {reason}")]
    MalformedResponse { query: String, reason: String },
}

/// Why a single sample was dropped before it could contribute to an entity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrelationMiss {
    #[error("Missing required label '{label}'")]
    MissingLabel { label: String },

    #[error("Label '{label}'='{value}' is not in the allowed set")]
    PolicyRejected { label: String, value: String },

    #[error("Sample value {value} is not a usable number")]
    InvalidValue { value: String },
}

impl CorrelationMiss {
    /// Short, stable reason used as a metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            CorrelationMiss::MissingLabel { .. } => "missing_label",
            CorrelationMiss::PolicyRejected { .. } => "policy_rejected",
            CorrelationMiss::InvalidValue { .. } => "invalid_value",
        }
    }
}

/// A single rule broken by an entity under construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityViolation {
    #[error("entity id is empty")]
    EmptyId,

    #[error("display name is empty")]
    EmptyDisplayName,

    #[error("{kind} used value {value} must be a finite, non-negative number")]
    InvalidUsed { kind: CommodityKind, value: f64 },

    #[error("{kind} capacity {capacity} must be a finite number no smaller than used {used}")]
    InvalidCapacity {
        kind: CommodityKind,
        used: f64,
        capacity: f64,
    },

    #[error("{kind} is sold twice with key {key:?}")]
    DuplicateSold { kind: CommodityKind, key: Option<String> },

    #[error("bought relationship with {provider_id} carries no commodities")]
    EmptyPurchase { provider_id: String },

    #[error("entity cannot buy from itself")]
    SelfProvider,

    #[error("consumer proxy must not sell commodities")]
    ProxySells,

    #[error("{role} entity requires a provider")]
    MissingProvider { role: EntityRole },

    #[error("seller entity must not buy from {provider_id}")]
    UnexpectedPurchase { provider_id: String },
}

/// Errors raised while building one entity. Never fatal to a discovery pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("Unsupported entity type {0}")]
    UnsupportedEntityType(EntityType),

    #[error("Unsupported commodity type {0}")]
    UnsupportedCommodity(CommodityKind),

    #[error("Unsupported provider type {0} to create consumer")]
    UnsupportedProviderType(EntityType),

    #[error("Entity id {0} was already emitted in this pass")]
    DuplicateId(String),

    #[error("Cannot build entity from an empty sample group '{0}'")]
    EmptyGroup(String),

    #[error("Invalid entity {id}: {}", format_violations(.violations))]
    InvalidEntity {
        id: String,
        violations: Vec<EntityViolation>,
    },
}

impl BuildError {
    pub fn reason(&self) -> &'static str {
        match self {
            BuildError::UnsupportedEntityType(_) => "unsupported_entity_type",
            BuildError::UnsupportedCommodity(_) => "unsupported_commodity",
            BuildError::UnsupportedProviderType(_) => "unsupported_provider_type",
            BuildError::DuplicateId(_) => "duplicate_id",
            BuildError::EmptyGroup(_) => "empty_group",
            BuildError::InvalidEntity { .. } => "invalid_entity",
        }
    }
}

fn format_violations(violations: &[EntityViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read query definitions from {path}: {reason}")]
    QueryFile { path: String, reason: String },
}
