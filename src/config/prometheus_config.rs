//! Prometheus source configuration parsing from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

pub const DEFAULT_PROMETHEUS_ADDRESS: &str = "http://localhost:9090";

/// Built-in query families an exporter can be created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterPreset {
    Istio,
    Gateway,
}

impl fmt::Display for ExporterPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExporterPreset::Istio => f.write_str("istio"),
            ExporterPreset::Gateway => f.write_str("gateway"),
        }
    }
}

impl FromStr for ExporterPreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "istio" => Ok(ExporterPreset::Istio),
            "gateway" | "faas" => Ok(ExporterPreset::Gateway),
            _ => anyhow::bail!(
                "Invalid exporter preset: {}. Must be 'istio' or 'gateway'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrometheusEnvConfig {
    pub addresses: Vec<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub exporters: Vec<ExporterPreset>,
    pub query_config_path: Option<PathBuf>,
}

impl PrometheusEnvConfig {
    pub fn from_env() -> Result<Self> {
        let addresses = split_list(
            &env::var("PROMETHEUS_ADDRESSES").unwrap_or_else(|_| DEFAULT_PROMETHEUS_ADDRESS.to_string()),
        );
        for address in &addresses {
            Url::parse(address).context(format!("Invalid Prometheus address: {}", address))?;
        }
        if addresses.is_empty() {
            anyhow::bail!("PROMETHEUS_ADDRESSES must name at least one server");
        }

        let exporters = split_list(&env::var("PROMETHEUS_EXPORTERS").unwrap_or_else(|_| "istio".to_string()))
            .iter()
            .map(|name| name.parse::<ExporterPreset>())
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            addresses,
            timeout_secs: env::var("PROMETHEUS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("Failed to parse PROMETHEUS_TIMEOUT_SECS")?,
            max_retries: env::var("PROMETHEUS_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse::<u32>()
                .context("Failed to parse PROMETHEUS_MAX_RETRIES")?,
            exporters,
            query_config_path: env::var("QUERY_CONFIG_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Comma separated values, trimmed, empty entries removed.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parsing() {
        assert_eq!("ISTIO".parse::<ExporterPreset>().unwrap(), ExporterPreset::Istio);
        assert_eq!("faas".parse::<ExporterPreset>().unwrap(), ExporterPreset::Gateway);
        assert!("jmx".parse::<ExporterPreset>().is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
