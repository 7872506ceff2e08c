//! Configuration module for prometopo.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Prometheus sources, Topology, and Observability.

mod observability_config;
mod prometheus_config;
mod topology_config;

pub use observability_config::ObservabilityEnvConfig;
pub use prometheus_config::{DEFAULT_PROMETHEUS_ADDRESS, ExporterPreset, PrometheusEnvConfig};
pub use topology_config::{DEFAULT_GATEWAY_NAMESPACE, DEFAULT_SCOPE, TopologyEnvConfig};

use crate::domain::settings::TopologySettings;
use anyhow::{Context, Result};

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub prometheus: PrometheusEnvConfig,
    pub topology: TopologyEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            prometheus: PrometheusEnvConfig::from_env()
                .context("Invalid Prometheus configuration")?,
            topology: TopologyEnvConfig::from_env().context("Invalid topology configuration")?,
            observability: ObservabilityEnvConfig::from_env()
                .context("Invalid observability configuration")?,
        })
    }

    pub fn topology_settings(&self) -> TopologySettings {
        self.topology.to_settings()
    }
}
