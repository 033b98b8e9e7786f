use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoscalerConfig {
    /// API server URL used for list calls and for persisting scale/status
    /// updates.
    pub api_server_url: String,
    /// API server watch URL, upgraded to a websocket per informer.
    pub api_server_watch_url: String,
    /// Prometheus instance queried by the `Prometheus` metric source when a
    /// scaling definition doesn't name its own.
    pub default_prometheus_url: String,
    /// Default stabilization window, in seconds, applied by the standard
    /// normalizer when a scaling definition carries no explicit behavior.
    pub stabilization_window_seconds: u32,
    /// Address the autoscaler's own health/metrics endpoint binds to.
    pub metrics_addr: String,
    /// Whether to run leader election before starting the reconciler.
    /// Informational at this scale (a single replica is the common
    /// deployment), wired through to match the process flags spec.md §6
    /// names; the reconciler itself does not yet branch on it.
    pub enable_leader_election: bool,
    /// Namespaces to watch for scaling definitions; empty means all.
    #[serde(default)]
    pub namespaces: Vec<String>,
}

impl Default for AutoscalerConfig {
    fn default() -> Self {
        AutoscalerConfig {
            api_server_url: "http://localhost:8080".to_string(),
            api_server_watch_url: "ws://localhost:8080".to_string(),
            default_prometheus_url: "http://localhost:9090".to_string(),
            stabilization_window_seconds: 300,
            metrics_addr: "0.0.0.0:9100".to_string(),
            enable_leader_election: false,
            namespaces: Vec::new(),
        }
    }
}
