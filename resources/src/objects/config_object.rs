use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{
    scaling::{ScalingSpec, ScalingStatus},
    Metadata, Object,
};

/// Key under which a scaling definition's spec is stored in a ConfigObject's
/// data, and the key its last-observed status is written back to.
pub const SCALING_SPEC_KEY: &str = "kratosSpec";
pub const SCALING_STATUS_KEY: &str = "kratosStatus";

/// A generic namespaced key/value object, the closest thing rMiniK8s has to
/// a Kubernetes ConfigMap. Scaling definitions are carried as YAML blobs
/// inside a ConfigObject's data rather than as a dedicated CRD, the same way
/// the original autoscaler attaches its spec/status to a ConfigMap instead
/// of introducing a status subresource.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ConfigObject {
    pub metadata: Metadata,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl Object for ConfigObject {
    fn kind(&self) -> &'static str {
        "ConfigObject"
    }

    fn name(&self) -> &String {
        &self.metadata.name
    }
}

impl ConfigObject {
    /// True if this object carries a scaling definition at all.
    pub fn is_scaling_target(&self) -> bool {
        self.data.contains_key(SCALING_SPEC_KEY)
    }

    pub fn scaling_spec(&self) -> Result<ScalingSpec> {
        let raw = self.data.get(SCALING_SPEC_KEY).with_context(|| {
            format!(
                "ConfigObject {} has no {} key",
                self.metadata.name, SCALING_SPEC_KEY
            )
        })?;
        serde_yaml::from_str(raw)
            .with_context(|| format!("Failed to unmarshal scaling spec for {}", self.metadata.name))
    }

    /// Returns the last-persisted status, or `None` if this is the first
    /// reconciliation (no status written yet, or the existing value failed
    /// to parse).
    pub fn scaling_status(&self) -> Option<ScalingStatus> {
        let raw = self.data.get(SCALING_STATUS_KEY)?;
        serde_yaml::from_str(raw).ok()
    }

    /// Returns a copy of this object with its status entry replaced. Only
    /// the status data key changes; everything else is carried over from
    /// the original snapshot, matching the merge-patch discipline the
    /// facade applies server-side.
    pub fn with_scaling_status(&self, status: &ScalingStatus) -> Result<Self> {
        let mut copy = self.clone();
        let raw = serde_yaml::to_string(status).with_context(|| "Failed to marshal scaling status")?;
        copy.data.insert(SCALING_STATUS_KEY.to_string(), raw);
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::scaling::{Algorithm, MetricSource, MetricTarget, ResourceMetricSource};

    fn sample_spec() -> ScalingSpec {
        ScalingSpec {
            target: crate::objects::ObjectReference {
                kind: "ReplicaSet".to_string(),
                name: "web".to_string(),
                api_version: "v1".to_string(),
            },
            algorithm: Algorithm::default(),
            min_replicas: 1,
            max_replicas: 10,
            stabilization_window_seconds: 0,
            behavior: None,
            metrics: vec![MetricSource::Resource(ResourceMetricSource {
                name: crate::objects::metrics::Resource::CPU,
                target: MetricTarget::Utilization {
                    average_utilization: 80,
                },
                container: String::new(),
            })],
        }
    }

    #[test]
    fn round_trips_spec_and_status_through_data_keys() {
        let spec = sample_spec();
        let mut obj = ConfigObject {
            metadata: Metadata {
                name: "web-autoscale".to_string(),
                ..Default::default()
            },
            data: BTreeMap::new(),
        };
        obj.data.insert(
            SCALING_SPEC_KEY.to_string(),
            serde_yaml::to_string(&spec).unwrap(),
        );

        assert!(obj.is_scaling_target());
        let parsed = obj.scaling_spec().unwrap();
        assert_eq!(parsed.max_replicas, 10);
        assert!(obj.scaling_status().is_none());

        let status = ScalingStatus {
            desired_replicas: 3,
            current_replicas: 1,
            ..Default::default()
        };
        let updated = obj.with_scaling_status(&status).unwrap();
        assert_eq!(updated.scaling_status().unwrap().desired_replicas, 3);
    }

    #[test]
    fn missing_spec_key_is_not_a_scaling_target() {
        let obj = ConfigObject {
            metadata: Metadata {
                name: "plain-config".to_string(),
                ..Default::default()
            },
            data: BTreeMap::new(),
        };
        assert!(!obj.is_scaling_target());
        assert!(obj.scaling_spec().is_err());
    }
}
