use crate::domain::entity::Entity;
use crate::domain::errors::SourceError;
use crate::domain::ports::{MetricExporter, TopologySink};
use crate::domain::report::ErrorReport;
use crate::domain::sample::MetricSample;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Exporter answering every query with a fixed batch of samples.
#[derive(Clone)]
pub struct StaticExporter {
    name: String,
    samples: Vec<MetricSample>,
}

impl StaticExporter {
    pub fn new(name: impl Into<String>, samples: Vec<MetricSample>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }
}

#[async_trait]
impl MetricExporter for StaticExporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self) -> Result<Vec<MetricSample>, SourceError> {
        Ok(self.samples.clone())
    }

    async fn validate(&self) -> bool {
        true
    }
}

/// Exporter that is never reachable.
#[derive(Clone)]
pub struct FailingExporter {
    name: String,
}

impl FailingExporter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl MetricExporter for FailingExporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self) -> Result<Vec<MetricSample>, SourceError> {
        Err(SourceError::Transport {
            address: format!("mock://{}", self.name),
            reason: "connection refused".to_string(),
        })
    }

    async fn validate(&self) -> bool {
        false
    }
}

/// Sink keeping every published outcome in memory.
#[derive(Clone, Default)]
pub struct CollectingSink {
    published: Arc<RwLock<Vec<Vec<Entity>>>>,
    failures: Arc<RwLock<Vec<ErrorReport>>>,
}

impl CollectingSink {
    pub async fn published(&self) -> Vec<Vec<Entity>> {
        self.published.read().await.clone()
    }

    pub async fn failures(&self) -> Vec<ErrorReport> {
        self.failures.read().await.clone()
    }
}

#[async_trait]
impl TopologySink for CollectingSink {
    async fn publish(&self, entities: &[Entity]) -> Result<()> {
        self.published.write().await.push(entities.to_vec());
        Ok(())
    }

    async fn report_failure(&self, report: &ErrorReport) -> Result<()> {
        self.failures.write().await.push(report.clone());
        Ok(())
    }
}
