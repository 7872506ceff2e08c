//! Push-based topology output
//!
//! Writes each discovery outcome as one structured JSON line to stdout, ready
//! for an external encoder or log shipper to pick up.

use crate::domain::entity::Entity;
use crate::domain::ports::TopologySink;
use crate::domain::report::ErrorReport;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

/// Topology snapshot for JSON output
#[derive(Serialize)]
pub struct TopologySnapshot<'a> {
    pub timestamp: String,
    pub version: String,
    pub scope: &'a str,
    pub entity_count: usize,
    pub entities: &'a [Entity],
}

#[derive(Serialize)]
pub struct FailureSnapshot<'a> {
    pub timestamp: String,
    pub version: String,
    pub scope: &'a str,
    pub error: &'a ErrorReport,
}

pub struct JsonStdoutSink {
    scope: String,
}

impl JsonStdoutSink {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    pub fn snapshot<'a>(&'a self, entities: &'a [Entity]) -> TopologySnapshot<'a> {
        TopologySnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            scope: &self.scope,
            entity_count: entities.len(),
            entities,
        }
    }
}

#[async_trait]
impl TopologySink for JsonStdoutSink {
    async fn publish(&self, entities: &[Entity]) -> Result<()> {
        let json = serde_json::to_string(&self.snapshot(entities))?;
        // Use a special prefix so lines can be easily filtered
        println!("TOPOLOGY_JSON:{}", json);
        info!("Published {} entities for scope {}", entities.len(), self.scope);
        Ok(())
    }

    async fn report_failure(&self, report: &ErrorReport) -> Result<()> {
        let snapshot = FailureSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            scope: &self.scope,
            error: report,
        };
        println!("TOPOLOGY_ERROR:{}", serde_json::to_string(&snapshot)?);
        error!("Discovery failed for scope {}: {}", self.scope, report.description);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{
        EntityDraft, EntityRole, ExternalMatchRule, STITCHING_ATTRIBUTE, StitchingProperty,
    };
    use crate::domain::sample::EntityType;

    #[test]
    fn test_snapshot_serialization() {
        let entity = EntityDraft::new(
            EntityType::VirtualMachine,
            "VIRTUAL_MACHINE-k8s/10.0.0.1",
            "VIRTUAL_MACHINE-k8s/node",
            EntityRole::Seller,
            StitchingProperty::display_name("10.0.0.1"),
            ExternalMatchRule::new(STITCHING_ATTRIBUTE, "IP"),
        )
        .build()
        .expect("valid entity");
        let sink = JsonStdoutSink::new("k8s");
        let entities = vec![entity];

        let json = serde_json::to_string(&sink.snapshot(&entities)).expect("Failed to serialize");
        assert!(json.contains("\"entity_count\":1"));
        assert!(json.contains("VIRTUAL_MACHINE-k8s/10.0.0.1"));
        assert!(json.contains("\"monitored\":false"));
    }

    #[tokio::test]
    async fn test_report_failure_succeeds() {
        let sink = JsonStdoutSink::new("k8s");
        let report = ErrorReport::critical("All exporter queries failed: [\"istio\"]");
        assert!(sink.report_failure(&report).await.is_ok());
    }
}
