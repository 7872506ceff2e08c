use crate::domain::entity::Entity;
use crate::domain::errors::{CorrelationMiss, SourceError};
use crate::domain::report::ErrorReport;
use crate::domain::sample::{MetricSample, RawSeries};
use anyhow::Result;
use async_trait::async_trait;

/// A query string paired with the parser for its result series.
pub trait QuerySpec: Send + Sync {
    fn name(&self) -> &str;

    fn query(&self) -> &str;

    /// Turns one result series into a sample, or explains why it was dropped.
    fn parse(&self, series: &RawSeries) -> Result<MetricSample, CorrelationMiss>;
}

/// One metric source.
#[async_trait]
pub trait MetricExporter: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self) -> Result<Vec<MetricSample>, SourceError>;

    /// Connectivity check.
    async fn validate(&self) -> bool;
}

/// Receives the outcome of each discovery pass.
#[async_trait]
pub trait TopologySink: Send + Sync {
    async fn publish(&self, entities: &[Entity]) -> Result<()>;

    async fn report_failure(&self, report: &ErrorReport) -> Result<()>;
}
