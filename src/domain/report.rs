//! Outcomes of the two orchestrator operations.

use crate::domain::entity::Entity;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub severity: Severity,
    pub description: String,
}

impl ErrorReport {
    pub fn critical(description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValidationResponse {
    Success,
    Failure(ErrorReport),
}

impl ValidationResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationResponse::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DiscoveryResponse {
    /// The entities built from every exporter that answered.
    Topology(Vec<Entity>),
    Failure(ErrorReport),
}

impl DiscoveryResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, DiscoveryResponse::Topology(_))
    }

    pub fn entities(&self) -> &[Entity] {
        match self {
            DiscoveryResponse::Topology(entities) => entities,
            DiscoveryResponse::Failure(_) => &[],
        }
    }
}
