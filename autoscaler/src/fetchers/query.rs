//! Queries an arbitrary Prometheus-style instant-vector endpoint, the
//! backing data source for `Prometheus` metric sources. Grounded in
//! `metrics/prometheus_fetcher.go`: a per-endpoint client cache, a plain
//! instant `query` call, and scalar/vector result conversion to a flat list
//! of integer sample values.

use std::{sync::Arc, time::Duration};

use resources::cache::TtlCache;
use serde::Deserialize;

use crate::{errors::FetchError, CONFIG};

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct QueryFetcher {
    clients: Arc<TtlCache<reqwest::Client>>,
}

impl QueryFetcher {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(TtlCache::new(super::CACHE_TTL)),
        }
    }

    /// Executes `query` against `endpoint`, falling back to the process-wide
    /// default Prometheus URL when `endpoint` is `None`.
    pub async fn fetch(
        &self,
        query: &str,
        endpoint: Option<&str>,
    ) -> Result<Vec<i64>, FetchError> {
        let url = endpoint.unwrap_or(&CONFIG.default_prometheus_url);
        let client = self.get_or_create_client(url);

        let response = client
            .get(format!("{}/api/v1/query", url))
            .query(&[("query", query)])
            .timeout(QUERY_TIMEOUT)
            .send()
            .await?
            .json::<PrometheusResponse>()
            .await?;

        convert(response.data)
    }

    fn get_or_create_client(&self, url: &str) -> reqwest::Client {
        if let Some(client) = self.clients.get(url) {
            return client;
        }
        let client = reqwest::Client::new();
        self.clients.insert(url.to_string(), client.clone());
        client
    }
}

impl Default for QueryFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct PrometheusResponse {
    data: PrometheusData,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
enum PrometheusData {
    Scalar(Sample),
    Vector(Vec<VectorResult>),
}

/// `[unix_timestamp, "stringified_value"]`.
#[derive(Debug, Deserialize)]
struct Sample(f64, String);

#[derive(Debug, Deserialize)]
struct VectorResult {
    value: Sample,
}

fn convert(data: PrometheusData) -> Result<Vec<i64>, FetchError> {
    match data {
        PrometheusData::Scalar(sample) => Ok(vec![parse_sample(&sample)?]),
        PrometheusData::Vector(results) => results
            .into_iter()
            .map(|r| parse_sample(&r.value))
            .collect(),
    }
}

fn parse_sample(sample: &Sample) -> Result<i64, FetchError> {
    sample
        .1
        .parse::<i64>()
        .map_err(|e| FetchError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_scalar_result() {
        let json = r#"{"resultType":"scalar","result":[1650000000.0,"42"]}"#;
        let data: PrometheusData = serde_json::from_str(json).unwrap();
        assert_eq!(convert(data).unwrap(), vec![42]);
    }

    #[test]
    fn converts_vector_result_across_samples() {
        let json = r#"{"resultType":"vector","result":[
            {"metric":{},"value":[1650000000.0,"10"]},
            {"metric":{},"value":[1650000000.0,"20"]}
        ]}"#;
        let data: PrometheusData = serde_json::from_str(json).unwrap();
        assert_eq!(convert(data).unwrap(), vec![10, 20]);
    }

    #[test]
    fn rejects_non_numeric_sample() {
        let json = r#"{"resultType":"scalar","result":[1650000000.0,"NaN-ish"]}"#;
        let data: PrometheusData = serde_json::from_str(json).unwrap();
        assert!(convert(data).is_err());
    }
}
