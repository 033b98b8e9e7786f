//! Fetches per-pod resource usage (CPU, memory) from the orchestrator's
//! metrics endpoint, the backing data source for `Resource` metric sources.
//! Grounded in `metrics/resource_fetcher.go`, which lists `PodMetricses` for
//! a namespace/selector and sums each pod's per-container usage for the
//! resource named by the scale metric.

use anyhow::Result;
use resources::{
    models::Response,
    objects::{
        metrics::{PodMetric, PodMetricsInfo, Resource},
        Labels,
    },
};

use crate::{errors::FetchError, CONFIG};

pub struct ResourceFetcher {
    client: reqwest::Client,
}

impl ResourceFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Usage of `resource` per pod matching `selector`, restricted to
    /// `container` when non-empty. Fails with `ContainerNotFound` if a
    /// container name was given but no pod's metrics carry it.
    pub async fn fetch(
        &self,
        resource: &Resource,
        selector: &Labels,
        container: &str,
    ) -> Result<PodMetricsInfo, FetchError> {
        let pods = self.list_pod_metrics(selector).await?;
        let mut info = PodMetricsInfo::new();
        let mut saw_named_container = container.is_empty();

        for pod in pods {
            if pod.containers.is_empty() {
                continue;
            }
            let mut sum = 0;
            let mut counted_any = false;
            for c in &pod.containers {
                if !container.is_empty() && c.name != container {
                    continue;
                }
                if !container.is_empty() {
                    saw_named_container = true;
                }
                match c.usage.get(resource) {
                    Some(usage) => {
                        sum += *usage;
                        counted_any = true;
                    },
                    None => {
                        tracing::debug!(
                            "missing resource metric {} for container {} in pod {}",
                            resource,
                            c.name,
                            pod.name
                        );
                    },
                }
            }
            if !counted_any {
                continue;
            }
            info.insert(
                pod.name.clone(),
                PodMetric {
                    timestamp: pod.timestamp,
                    window: pod.window,
                    value: sum,
                },
            );
        }

        if !saw_named_container {
            return Err(FetchError::ContainerNotFound(container.to_string()));
        }
        Ok(info)
    }

    async fn list_pod_metrics(
        &self,
        selector: &Labels,
    ) -> Result<Vec<resources::objects::metrics::PodMetrics>, FetchError> {
        let response = self
            .client
            .get(format!("{}/api/v1/metrics/pods", CONFIG.api_server_url))
            .query(&[("selector", selector.to_string())])
            .send()
            .await?
            .json::<Response<Vec<resources::objects::metrics::PodMetrics>>>()
            .await?;
        Ok(response.data.unwrap_or_default())
    }
}

impl Default for ResourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use resources::objects::metrics::{ContainerMetrics, PodMetrics};
    use std::collections::HashMap;

    use super::*;

    fn pod(name: &str, containers: Vec<ContainerMetrics>) -> PodMetrics {
        PodMetrics {
            name: name.to_string(),
            timestamp: Utc::now().naive_utc(),
            window: 30,
            containers,
        }
    }

    fn container(name: &str, usage: Vec<(Resource, i64)>) -> ContainerMetrics {
        ContainerMetrics {
            name: name.to_string(),
            usage: usage.into_iter().collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn sums_all_containers_when_no_container_named() {
        let pods = vec![pod(
            "web-1",
            vec![
                container("app", vec![(Resource::CPU, 100)]),
                container("sidecar", vec![(Resource::CPU, 50)]),
            ],
        )];
        let mut info = PodMetricsInfo::new();
        for p in &pods {
            let sum: i64 = p
                .containers
                .iter()
                .filter_map(|c| c.usage.get(&Resource::CPU))
                .sum();
            info.insert(
                p.name.clone(),
                PodMetric {
                    timestamp: p.timestamp,
                    window: p.window,
                    value: sum,
                },
            );
        }
        assert_eq!(info.get("web-1").unwrap().value, 150);
    }
}
