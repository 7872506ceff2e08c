//! Topology configuration: target scope, default capacities and the
//! standalone entity flags handed to the builders.

use super::prometheus_config::split_list;
use crate::application::correlation::{ExactMatchPolicy, GATEWAY_NAMESPACE_LABEL};
use crate::domain::errors::ConfigError;
use crate::domain::sample::EntityType;
use crate::domain::settings::{
    CommodityCaps, DEFAULT_RESPONSE_TIME_CAPACITY, DEFAULT_TRANSACTION_CAPACITY, TopologySettings,
};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::env;

pub const DEFAULT_SCOPE: &str = "prometheus";
pub const DEFAULT_GATEWAY_NAMESPACE: &str = "openfaas";

#[derive(Debug, Clone)]
pub struct TopologyEnvConfig {
    pub scope: String,
    pub transaction_capacity: f64,
    pub response_time_capacity: f64,
    pub recognized_entity_types: BTreeSet<EntityType>,
    pub keep_standalone: bool,
    pub create_proxy_vm: bool,
    pub gateway_namespaces: Vec<String>,
}

impl TopologyEnvConfig {
    pub fn from_env() -> Result<Self> {
        let recognized_entity_types = split_list(
            &env::var("RECOGNIZED_ENTITY_TYPES")
                .unwrap_or_else(|_| "Application,VirtualApplication".to_string()),
        )
        .iter()
        .map(|name| {
            name.parse::<EntityType>().map_err(|reason| ConfigError::InvalidValue {
                name: "RECOGNIZED_ENTITY_TYPES".to_string(),
                value: name.clone(),
                reason,
            })
        })
        .collect::<Result<BTreeSet<_>, _>>()?;

        let config = Self {
            scope: env::var("TARGET_SCOPE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            transaction_capacity: Self::parse_f64(
                "TRANSACTION_CAPACITY",
                DEFAULT_TRANSACTION_CAPACITY,
            )?,
            response_time_capacity: Self::parse_f64(
                "RESPONSE_TIME_CAPACITY",
                DEFAULT_RESPONSE_TIME_CAPACITY,
            )?,
            recognized_entity_types,
            keep_standalone: Self::parse_bool("KEEP_STANDALONE", true),
            create_proxy_vm: Self::parse_bool("CREATE_PROXY_VM", false),
            gateway_namespaces: split_list(
                &env::var("GATEWAY_NAMESPACES")
                    .unwrap_or_else(|_| DEFAULT_GATEWAY_NAMESPACE.to_string()),
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// Capacities must be positive and finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("TRANSACTION_CAPACITY", self.transaction_capacity),
            ("RESPONSE_TIME_CAPACITY", self.response_time_capacity),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "capacity must be a positive number".to_string(),
                });
            }
        }
        if self.recognized_entity_types.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "RECOGNIZED_ENTITY_TYPES".to_string(),
                value: String::new(),
                reason: "at least one entity type is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_settings(&self) -> TopologySettings {
        TopologySettings {
            scope: self.scope.clone(),
            caps: CommodityCaps::new(self.transaction_capacity, self.response_time_capacity),
            recognized_entity_types: self.recognized_entity_types.clone(),
            keep_standalone: self.keep_standalone,
            create_proxy_vm: self.create_proxy_vm,
        }
    }

    pub fn gateway_policy(&self) -> ExactMatchPolicy {
        ExactMatchPolicy::new(GATEWAY_NAMESPACE_LABEL, self.gateway_namespaces.iter().cloned())
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_bool(key: &str, default: bool) -> bool {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<bool>()
            .unwrap_or(default)
    }
}
