//! Observability configuration parsing from environment variables.
//!
//! Controls the self-metrics registry and the discovery cadence.

use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_DISCOVERY_INTERVAL_SECS: u64 = 600;

/// Observability environment configuration
#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
    pub discovery_interval_secs: u64,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            discovery_interval_secs: DEFAULT_DISCOVERY_INTERVAL_SECS,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_env() -> Result<Self> {
        let discovery_interval_secs = env::var("DISCOVERY_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_DISCOVERY_INTERVAL_SECS.to_string())
            .parse::<u64>()
            .context("Failed to parse DISCOVERY_INTERVAL_SECS")?;
        if discovery_interval_secs == 0 {
            anyhow::bail!("DISCOVERY_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            enabled: env::var("OBSERVABILITY_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse::<bool>()
                .unwrap_or(true),
            discovery_interval_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observability_config_defaults() {
        let config = ObservabilityEnvConfig::default();
        assert!(config.enabled);
        assert_eq!(config.discovery_interval_secs, 600);
    }
}
