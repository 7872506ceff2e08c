//! Queries declared in a TOML file.
//!
//! ```toml
//! [[query]]
//! name = "http_edges"
//! query = "sum(rate(http_requests_total[3m])) by (src, dst)"
//! kind = "relationship"
//! entity_type = "VirtualApplication"
//! commodity = "transaction"
//! consumer = ["src"]
//! producer = ["dst"]
//! ```
//!
//! `producer`, `consumer`, `key` and `identity` list the raw labels joined
//! into each composite value. `labels` copies raw labels onto the sample
//! under a new name, e.g. `ip = "instance"`.

use super::checked_value;
use crate::application::correlation::composite_key;
use crate::domain::errors::{ConfigError, CorrelationMiss};
use crate::domain::ports::QuerySpec;
use crate::domain::sample::{
    CATEGORY_LABEL, CONSUMER_LABEL, CommodityKind, EntityType, KEY_LABEL, MetricSample,
    PRODUCER_LABEL, RawSeries, SampleKind,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const CATEGORY: &str = "Generic";

/// Top-level layout of a query definition file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryFile {
    #[serde(default, rename = "query")]
    pub queries: Vec<QueryDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Entity,
    Relationship,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryDefinition {
    pub name: String,
    pub query: String,
    pub kind: DefinitionKind,
    pub entity_type: String,
    pub commodity: String,
    #[serde(default)]
    pub producer: Vec<String>,
    #[serde(default)]
    pub consumer: Vec<String>,
    #[serde(default)]
    pub key: Vec<String>,
    #[serde(default)]
    pub identity: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl QueryFile {
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::QueryFile {
            path: origin.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::QueryFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Validates every definition.
    pub fn into_queries(self) -> Result<Vec<GenericQuery>, ConfigError> {
        self.queries.into_iter().map(GenericQuery::try_from).collect()
    }
}

#[derive(Debug, Clone)]
pub struct GenericQuery {
    name: String,
    query: String,
    kind: SampleKind,
    entity_type: EntityType,
    commodity: CommodityKind,
    producer: Vec<String>,
    consumer: Vec<String>,
    key: Vec<String>,
    identity: Vec<String>,
    labels: BTreeMap<String, String>,
}

impl TryFrom<QueryDefinition> for GenericQuery {
    type Error = ConfigError;

    fn try_from(def: QueryDefinition) -> Result<Self, Self::Error> {
        let invalid = |field: &str, value: &str, reason: String| ConfigError::InvalidValue {
            name: format!("{}.{}", def.name, field),
            value: value.to_string(),
            reason,
        };

        if def.query.trim().is_empty() {
            return Err(invalid("query", &def.query, "query is empty".to_string()));
        }
        let entity_type = def
            .entity_type
            .parse::<EntityType>()
            .map_err(|e| invalid("entity_type", &def.entity_type, e))?;
        let commodity = def
            .commodity
            .parse::<CommodityKind>()
            .map_err(|e| invalid("commodity", &def.commodity, e))?;

        let kind = match def.kind {
            DefinitionKind::Entity => {
                if def.identity.is_empty() {
                    return Err(invalid("identity", "", "entity queries need identity labels".to_string()));
                }
                SampleKind::Entity
            }
            DefinitionKind::Relationship => {
                if def.producer.is_empty() && def.consumer.is_empty() {
                    return Err(invalid(
                        "producer",
                        "",
                        "relationship queries need producer or consumer labels".to_string(),
                    ));
                }
                SampleKind::Relationship
            }
        };

        Ok(Self {
            name: def.name,
            query: def.query,
            kind,
            entity_type,
            commodity,
            producer: def.producer,
            consumer: def.consumer,
            key: def.key,
            identity: def.identity,
            labels: def.labels,
        })
    }
}

impl QuerySpec for GenericQuery {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self) -> &str {
        &self.query
    }

    fn parse(&self, series: &RawSeries) -> Result<MetricSample, CorrelationMiss> {
        let optional = |names: &[String]| -> Result<Option<String>, CorrelationMiss> {
            if names.is_empty() {
                Ok(None)
            } else {
                composite_key(&series.labels, names).map(Some)
            }
        };

        let producer = optional(&self.producer)?;
        let consumer = optional(&self.consumer)?;
        let key = optional(&self.key)?;
        let identity = match optional(&self.identity)? {
            Some(identity) => identity,
            None => [consumer.as_deref(), producer.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join("->"),
        };
        let value = checked_value(series)?;

        let mut sample = MetricSample::new(self.kind, self.entity_type, identity)
            .with_label(CATEGORY_LABEL, CATEGORY)
            .with_metric(self.commodity, value)
            .at(series.timestamp);
        for (target, source) in &self.labels {
            if let Some(value) = series.label(source) {
                sample.set_label(target.as_str(), value);
            }
        }
        if let Some(producer) = producer {
            sample.set_label(PRODUCER_LABEL, producer);
        }
        if let Some(consumer) = consumer {
            sample.set_label(CONSUMER_LABEL, consumer);
        }
        if let Some(key) = key {
            sample.set_label(KEY_LABEL, key);
        }
        Ok(sample)
    }
}
