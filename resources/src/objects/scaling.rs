use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{metrics::Resource, Labels, ObjectReference};

/// The autoscaling definition carried by a [`super::ConfigObject`] under the
/// `kratosSpec` data key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScalingSpec {
    /// Points to the target resource to scale, and is used to resolve its
    /// scale subresource and label selector.
    pub target: ObjectReference,
    /// Reserved for future scaling algorithms; not consumed by the core
    /// control loop.
    #[serde(default)]
    pub algorithm: Algorithm,
    /// The lower limit for the number of replicas to which the autoscaler
    /// can scale down.
    #[serde(default)]
    pub min_replicas: u32,
    /// The upper limit for the number of replicas to which the autoscaler
    /// can scale up. Cannot be less than minReplicas.
    pub max_replicas: u32,
    /// Number of seconds for which past recommendations should be
    /// considered by the standard normalizer. Filled with the process
    /// default by [`crate::objects::scaling`]'s defaults updater when zero.
    #[serde(default)]
    pub stabilization_window_seconds: u32,
    /// Specifications used to calculate the desired replica count; the
    /// maximum replica count proposed across all metrics is used.
    #[serde(default)]
    pub metrics: Vec<MetricSource>,
    /// Configures the scaling behavior in both Up and Down directions.
    /// Absent means the simple stabilization-window-only normalizer is
    /// used instead of per-direction policies.
    #[serde(default)]
    pub behavior: Option<ScalingBehavior>,
}

/// Reserved extension point for alternative scaling algorithms; the core
/// control loop always computes replicas from metrics directly and ignores
/// this field.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Algorithm {
    #[serde(default)]
    pub type_: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// The persisted observed state carried under the `kratosStatus` data key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScalingStatus {
    /// Current number of replicas, as last seen on the scale subresource.
    pub current_replicas: u32,
    /// Desired number of replicas, as last calculated by the autoscaler
    /// (post-normalization).
    pub desired_replicas: u32,
    /// Append-only history of raw (pre-normalization) recommendations,
    /// pruned to the governing stabilization window every cycle.
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    /// Append-only history of applied scale-up changes, pruned to the
    /// longest scale-up policy period every cycle.
    #[serde(default)]
    pub scale_up_events: Vec<ScaleEvent>,
    /// Append-only history of applied scale-down changes, pruned to the
    /// longest scale-down policy period every cycle.
    #[serde(default)]
    pub scale_down_events: Vec<ScaleEvent>,
    /// Informational: end of the stabilization window as of the last cycle
    /// that changed direction.
    #[serde(default)]
    pub stabilization_end_time: Option<NaiveDateTime>,
}

/// A (timestamp, replicas) tuple recorded every cycle regardless of whether
/// a scale change occurred.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub timestamp: NaiveDateTime,
    pub replicas: u32,
}

/// A (timestamp, delta) tuple recorded only when an actual replica change
/// was applied.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaleEvent {
    pub timestamp: NaiveDateTime,
    pub replica_change: u32,
}

/// Configures the scaling behavior of the target in both Up and Down
/// directions. Either side may be absent; the defaults updater fills the
/// absent side with a `Disabled` rule so it never moves the target.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScalingBehavior {
    #[serde(default)]
    pub scale_up: Option<ScaleRules>,
    #[serde(default)]
    pub scale_down: Option<ScaleRules>,
}

/// Configures the scaling behavior for one direction. Rules are applied
/// after calculating the desired replica count from metrics; they limit
/// scaling velocity via policies and prevent flapping via a stabilization
/// window so that the safest recent recommendation is chosen instead of
/// reacting instantly.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaleRules {
    /// Number of seconds for which past recommendations should be
    /// considered while scaling in this direction.
    #[serde(default)]
    pub stabilization_window_seconds: u32,
    /// `None` means unset on the wire; the defaults updater resolves it to
    /// `Max` for `scaleUp` and `Min` for `scaleDown`, matching the original
    /// autoscaler's per-direction default (scaling up prefers the policy
    /// that grows the fastest, scaling down the one that shrinks the
    /// slowest).
    #[serde(default)]
    pub select_policy: Option<PolicySelection>,
    /// At least one policy must be specified for the rule to take effect.
    #[serde(default)]
    pub policies: Vec<ScalingPolicy>,
}

impl ScaleRules {
    /// The longest `periodSeconds` across this direction's policies, used
    /// to size the scale-event retention window. Zero if there are none.
    pub fn longest_period(&self) -> u32 {
        self.policies
            .iter()
            .map(|policy| policy.period_seconds)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PolicySelection {
    /// Select the policy with the lowest recommendation value.
    Min,
    /// Select the policy with the highest recommendation value.
    Max,
    /// Disable scaling in this direction entirely.
    Disabled,
}

/// A single policy which must hold true for a specified past interval.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScalingPolicy {
    #[serde(rename = "type")]
    pub type_: ScalingPolicyType,
    /// The amount of change permitted by the policy. Must be > 0.
    pub value: u32,
    /// The window of time for which the policy should hold true. 0 < x <= 1800.
    pub period_seconds: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ScalingPolicyType {
    Pods,
    Percent,
}

/// Identifies a single time series to look up for Pods/Object/External
/// metric sources.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MetricIdentifier {
    pub name: String,
    #[serde(default)]
    pub selector: Option<Labels>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum MetricSource {
    /// A resource metric known to the orchestrator (CPU, memory), specified
    /// in requests, describing each pod in the scale target. Averaged
    /// across pods before being compared to the target.
    Resource(ResourceMetricSource),
    /// A metric describing each pod in the scale target, fetched directly
    /// from pods, then averaged.
    Pods(PodsMetricSource),
    /// A metric describing a single object in the same namespace as the
    /// scale target (e.g. queue depth on an ingress).
    Object(ObjectMetricSource),
    /// A metric not associated with any object, e.g. a global queue length.
    External(ExternalMetricSource),
    /// A metric backed by an arbitrary query-language instant-vector query.
    Prometheus(PrometheusMetricSource),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetricSource {
    pub name: Resource,
    pub target: MetricTarget,
    /// Name of the container in the pods of the scaling target whose
    /// requests/usage should be considered. Empty means every container.
    #[serde(default)]
    pub container: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PodsMetricSource {
    pub metric: MetricIdentifier,
    pub target: MetricTarget,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetricSource {
    pub described_object: ObjectReference,
    pub metric: MetricIdentifier,
    pub target: MetricTarget,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExternalMetricSource {
    pub metric: MetricIdentifier,
    pub target: MetricTarget,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusMetricSource {
    /// The instant-vector query to execute.
    pub query: String,
    /// Endpoint to query; falls back to the process-wide default when
    /// absent.
    #[serde(default)]
    pub endpoint: Option<String>,
    pub target: MetricTarget,
}

/// The target value, average value, or average utilization of a metric.
/// Exactly one variant is carried per metric source. Struct-like variants
/// (rather than newtypes) so the `type` tag can be carried internally
/// alongside a named field, matching the wire shape of the original
/// `MetricTarget{Type, Value, AverageValue, AverageUtilization}`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum MetricTarget {
    /// A target value of the metric, summed across relevant pods.
    Value { value: i64 },
    /// A target value of the average of the metric across relevant pods.
    AverageValue { average_value: i64 },
    /// A target value of the average of the resource metric across all
    /// relevant pods, as a percentage of the requested value. Only valid
    /// for `Resource` metric sources.
    Utilization { average_utilization: u32 },
}

impl Recommendation {
    pub fn now(replicas: u32) -> Self {
        Recommendation {
            timestamp: Utc::now().naive_utc(),
            replicas,
        }
    }
}

impl ScaleEvent {
    pub fn now(replica_change: u32) -> Self {
        ScaleEvent {
            timestamp: Utc::now().naive_utc(),
            replica_change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_period_picks_the_max_across_policies() {
        let rules = ScaleRules {
            stabilization_window_seconds: 0,
            select_policy: Some(PolicySelection::Max),
            policies: vec![
                ScalingPolicy {
                    type_: ScalingPolicyType::Pods,
                    value: 4,
                    period_seconds: 60,
                },
                ScalingPolicy {
                    type_: ScalingPolicyType::Percent,
                    value: 100,
                    period_seconds: 120,
                },
            ],
        };
        assert_eq!(rules.longest_period(), 120);
    }

    #[test]
    fn longest_period_is_zero_with_no_policies() {
        let rules = ScaleRules {
            stabilization_window_seconds: 0,
            select_policy: Some(PolicySelection::Disabled),
            policies: vec![],
        };
        assert_eq!(rules.longest_period(), 0);
    }

    #[test]
    fn metric_source_tags_on_type_field() {
        let json = r#"{"type":"Resource","name":"CPU","target":{"type":"Utilization","averageUtilization":80},"container":""}"#;
        let parsed: MetricSource = serde_json::from_str(json).unwrap();
        match parsed {
            MetricSource::Resource(resource) => {
                assert_eq!(
                    resource.target,
                    MetricTarget::Utilization {
                        average_utilization: 80
                    }
                );
            },
            _ => panic!("expected Resource variant"),
        }
    }
}
