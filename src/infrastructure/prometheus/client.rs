//! Minimal Prometheus HTTP API client for instant queries.

use crate::domain::errors::SourceError;
use crate::domain::sample::RawSeries;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const QUERY_PATH: &str = "api/v1/query";
const BUILD_INFO_PATH: &str = "api/v1/status/buildinfo";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    data: Option<QueryData>,
    #[serde(rename = "errorType")]
    error_type: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    #[serde(default)]
    result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    #[serde(default)]
    metric: HashMap<String, String>,
    value: (f64, String),
}

impl From<VectorSample> for RawSeries {
    fn from(sample: VectorSample) -> Self {
        let (ts, raw) = sample.value;
        let value = raw.parse::<f64>().unwrap_or_else(|_| {
            debug!("Unparseable sample value '{}'", raw);
            f64::NAN
        });
        let timestamp = DateTime::from_timestamp_millis((ts * 1000.0) as i64).unwrap_or_else(Utc::now);
        RawSeries {
            labels: sample.metric,
            value,
            timestamp,
        }
    }
}

#[derive(Clone)]
pub struct PrometheusClient {
    address: String,
    client: ClientWithMiddleware,
}

impl PrometheusClient {
    pub fn new(address: impl Into<String>, timeout: Duration, max_retries: u32) -> Self {
        Self {
            address: address.into(),
            client: HttpClientFactory::create_client(timeout, max_retries),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Runs an instant query and returns its vector result.
    pub async fn query(&self, query: &str) -> Result<Vec<RawSeries>, SourceError> {
        let url = build_url_with_query(&self.address, QUERY_PATH, &[("query", query)])?;
        debug!("Querying {} with '{}'", self.address, query);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                address: self.address.clone(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| SourceError::Transport {
            address: self.address.clone(),
            reason: e.to_string(),
        })?;

        // Prometheus reports query errors in the body, usually with a 4xx status.
        let parsed: Result<ApiResponse, _> = serde_json::from_str(&body);
        match parsed {
            Ok(api) if api.status == "error" => Err(SourceError::QueryRejected {
                error_type: api.error_type.unwrap_or_default(),
                message: api.error.unwrap_or_default(),
            }),
            _ if !status.is_success() => Err(SourceError::HttpStatus {
                address: self.address.clone(),
                status: status.as_u16(),
                body,
            }),
            Ok(api) => {
                let data = api.data.ok_or_else(|| SourceError::MalformedResponse {
                    query: query.to_string(),
                    reason: "missing data".to_string(),
                })?;
                if data.result_type != "vector" {
                    return Err(SourceError::MalformedResponse {
                        query: query.to_string(),
                        reason: format!("expected vector result, got {}", data.result_type),
                    });
                }
                Ok(data.result.into_iter().map(RawSeries::from).collect())
            }
            Err(e) => Err(SourceError::MalformedResponse {
                query: query.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// True when the server answers its build-info endpoint.
    pub async fn is_reachable(&self) -> bool {
        let url = match build_url_with_query::<&str, &str>(&self.address, BUILD_INFO_PATH, &[]) {
            Ok(url) => url,
            Err(e) => {
                warn!("{}", e);
                return false;
            }
        };
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Prometheus at {} is unreachable: {}", self.address, e);
                false
            }
        }
    }
}
