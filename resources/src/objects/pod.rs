use std::{collections::HashMap, net::Ipv4Addr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{metrics::Resource, Metadata, Object};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Pod {
    pub metadata: Metadata,
    pub spec: PodSpec,
    pub status: Option<PodStatus>,
}

impl Object for Pod {
    fn kind(&self) -> &'static str {
        "Pod"
    }

    fn name(&self) -> &String {
        &self.metadata.name
    }
}

impl Pod {
    /// Pod IP as reported by the orchestrator, if the pod has been scheduled.
    pub fn get_ip(&self) -> Option<Ipv4Addr> {
        self.status.as_ref()?.pod_ip.as_ref()?.parse().ok()
    }

    /// Sum of the requested amount of `resource` across all containers.
    pub fn requests(&self, resource: &Resource) -> i64 {
        self.spec
            .containers
            .iter()
            .filter_map(|c| c.resources.requests.get(resource))
            .sum()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PodTemplateSpec {
    pub metadata: Metadata,
    pub spec: PodSpec,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PodSpec {
    /// List of containers belonging to the pod.
    /// Containers cannot currently be added or removed.
    /// There must be at least one container in a Pod. Cannot be updated.
    pub containers: Vec<Container>,
}

/// Returned when a metric source names a `container` that isn't present in
/// the target's pod spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerNotFound(pub String);

impl std::fmt::Display for ContainerNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no container named {:?} in pod spec", self.0)
    }
}

impl std::error::Error for ContainerNotFound {}

impl PodSpec {
    /// Sum of the requested amount of `resource` across containers. An
    /// empty `container` sums every container; a non-empty one restricts
    /// the sum to the single matching container, failing if none matches.
    pub fn requested(&self, resource: &Resource, container: &str) -> Result<i64, ContainerNotFound> {
        if container.is_empty() {
            return Ok(self
                .containers
                .iter()
                .filter_map(|c| c.resources.requests.get(resource))
                .sum());
        }
        self.containers
            .iter()
            .find(|c| c.name == container)
            .map(|c| c.resources.requests.get(resource).copied().unwrap_or(0))
            .ok_or_else(|| ContainerNotFound(container.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Container {
    /// Name of the container specified as a DNS_LABEL.
    /// Each container in a pod must have a unique name (DNS_LABEL).
    /// Cannot be updated.
    pub name: String,
    /// Docker image name.
    pub image: String,
    /// List of ports to expose from the container.
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    /// Compute resources requested by this container.
    #[serde(default)]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ResourceRequirements {
    /// Minimum amount of each resource required, keyed by resource name.
    #[serde(default)]
    pub requests: HashMap<Resource, i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Number of port to expose on the pod's IP address.
    /// This must be a valid port number, 0 < x < 65536.
    pub container_port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    /// IP address of the host to which the pod is assigned.
    /// Empty if not yet scheduled.
    #[serde(rename = "hostIP")]
    pub host_ip: Option<String>,
    /// RFC 3339 date and time at which the object was acknowledged by the Kubelet.
    pub start_time: NaiveDateTime,
    /// The phase of a Pod is a simple, high-level summary of where the Pod is
    /// in its lifecycle.
    pub phase: PodPhase,
    /// IP address allocated to the pod.
    /// Empty if not yet allocated.
    #[serde(rename = "podIP")]
    pub pod_ip: Option<String>,
    /// Current service state of pod, keyed by condition type.
    #[serde(default)]
    pub conditions: HashMap<PodConditionType, PodCondition>,
    /// One entry per container in the manifest.
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    /// All containers in the pod have terminated,
    /// and at least one container has terminated in failure.
    Failed,
    /// The pod has been accepted but one or more container images has not
    /// been created yet.
    Pending,
    /// The pod has been bound to a node and all containers have been created.
    Running,
    /// All containers in the pod have terminated in success.
    Succeeded,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PodConditionType {
    /// All containers in the pod are ready.
    ContainersReady,
    /// All init containers have completed successfully.
    Initialized,
    /// The pod has been scheduled to a node.
    PodScheduled,
    /// The pod is able to serve requests.
    Ready,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PodCondition {
    /// Status is the status of the condition. Can be True, False, Unknown.
    pub status: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Terminated,
    Waiting,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: String,
    pub image: String,
    pub container_id: String,
    pub state: ContainerState,
}
