//! The policy-aware normalizer used whenever a scaling definition carries
//! `behavior` rules on either side. Grounded in
//! `pkg/normalizer/behavior_normalizer.go`, including its asymmetric
//! `findMaxRecommendation` (scaling up picks the *minimum* recent
//! recommendation, scaling down the *maximum* — a deliberate conservatism,
//! not a typo) and its per-direction velocity limit built from sliding-window
//! `Pods`/`Percent` policies. `i64` stands in for the original's `int32`
//! `MinInt32`/`MaxInt32` sentinels so the running `Min`/`Max` fold can't
//! overflow before it's clamped back into a replica count.

use chrono::{Duration, Utc};
use resources::objects::scaling::{
    PolicySelection, ScaleEvent, ScaleRules, ScalingPolicyType, ScalingSpec, ScalingStatus,
};

use super::Normalizer;

pub struct BehaviorNormalizer;

impl Normalizer for BehaviorNormalizer {
    fn normalize_replicas(
        &self,
        spec: &ScalingSpec,
        status: &ScalingStatus,
        desired_replicas: u32,
    ) -> u32 {
        let behavior = spec
            .behavior
            .as_ref()
            .expect("behavior normalizer requires spec.behavior to be set");
        let max_recommendation = self.find_max_recommendation(spec, status, desired_replicas);

        if max_recommendation == status.current_replicas {
            return max_recommendation;
        }

        let scale_up = behavior.scale_up.as_ref();
        let scale_down = behavior.scale_down.as_ref();

        if max_recommendation > status.current_replicas {
            if scale_up
                .map(|r| r.select_policy == Some(PolicySelection::Disabled))
                .unwrap_or(true)
            {
                return status.current_replicas;
            }
            let rules = scale_up.unwrap();
            let limit = calculate_scale_up_limit(rules, &status.scale_up_events, status.current_replicas);
            clamp_up(limit, status.current_replicas, spec.max_replicas, max_recommendation)
        } else {
            if scale_down
                .map(|r| r.select_policy == Some(PolicySelection::Disabled))
                .unwrap_or(true)
            {
                return status.current_replicas;
            }
            let rules = scale_down.unwrap();
            let limit =
                calculate_scale_down_limit(rules, &status.scale_down_events, status.current_replicas);
            clamp_down(limit, status.current_replicas, spec.min_replicas, max_recommendation)
        }
    }
}

impl BehaviorNormalizer {
    fn find_max_recommendation(
        &self,
        spec: &ScalingSpec,
        status: &ScalingStatus,
        desired_replicas: u32,
    ) -> u32 {
        let behavior = spec.behavior.as_ref();
        let (window, scaling_up) = if desired_replicas > status.current_replicas {
            (
                behavior.and_then(|b| b.scale_up.as_ref()).map(|r| r.stabilization_window_seconds).unwrap_or(0),
                true,
            )
        } else {
            (
                behavior.and_then(|b| b.scale_down.as_ref()).map(|r| r.stabilization_window_seconds).unwrap_or(0),
                false,
            )
        };

        let cutoff = Utc::now().naive_utc() - Duration::seconds(window as i64);
        let mut result = desired_replicas;
        for recommendation in &status.recommendations {
            if recommendation.timestamp > cutoff {
                result = if scaling_up {
                    result.min(recommendation.replicas)
                } else {
                    result.max(recommendation.replicas)
                };
            }
        }
        result
    }
}

fn calculate_scale_up_limit(rules: &ScaleRules, events: &[ScaleEvent], current_replicas: u32) -> i64 {
    // Unset means the defaults updater hasn't run (or this rule was built
    // directly); `Max` is this direction's own default.
    let min_select = rules.select_policy.unwrap_or(PolicySelection::Max) == PolicySelection::Min;
    let mut result: i64 = if min_select { i64::MAX } else { i64::MIN };

    for policy in &rules.policies {
        let added_in_window = replicas_change_in_window(policy.period_seconds, events);
        let window_start = current_replicas as i64 - added_in_window;
        let proposed = match policy.type_ {
            ScalingPolicyType::Pods => window_start + policy.value as i64,
            ScalingPolicyType::Percent => {
                ((window_start as f64) * (1.0 + policy.value as f64 / 100.0)).ceil() as i64
            },
        };
        result = if min_select {
            result.min(proposed)
        } else {
            result.max(proposed)
        };
    }
    result
}

fn calculate_scale_down_limit(rules: &ScaleRules, events: &[ScaleEvent], current_replicas: u32) -> i64 {
    // Unset means the defaults updater hasn't run; `Min` is this
    // direction's own default.
    let min_select = rules.select_policy.unwrap_or(PolicySelection::Min) == PolicySelection::Min;
    let mut result: i64 = if min_select { i64::MIN } else { i64::MAX };

    for policy in &rules.policies {
        let removed_in_window = replicas_change_in_window(policy.period_seconds, events);
        let window_start = current_replicas as i64 + removed_in_window;
        let proposed = match policy.type_ {
            ScalingPolicyType::Pods => window_start - policy.value as i64,
            ScalingPolicyType::Percent => {
                (window_start as f64 * (1.0 - policy.value as f64 / 100.0)) as i64
            },
        };
        result = if min_select {
            result.max(proposed)
        } else {
            result.min(proposed)
        };
    }
    result
}

fn replicas_change_in_window(window_seconds: u32, events: &[ScaleEvent]) -> i64 {
    let cutoff = Utc::now().naive_utc() - Duration::seconds(window_seconds as i64);
    events
        .iter()
        .filter(|e| e.timestamp > cutoff)
        .map(|e| e.replica_change as i64)
        .sum()
}

fn clamp_up(limit: i64, current_replicas: u32, max_replicas: u32, max_recommendation: u32) -> u32 {
    let floor = limit.max(current_replicas as i64);
    let candidates = [floor, max_replicas as i64, max_recommendation as i64];
    candidates.into_iter().min().unwrap().max(0) as u32
}

fn clamp_down(limit: i64, current_replicas: u32, min_replicas: u32, max_recommendation: u32) -> u32 {
    let ceiling = limit.min(current_replicas as i64);
    let candidates = [ceiling, min_replicas as i64, max_recommendation as i64];
    candidates.into_iter().max().unwrap().max(0) as u32
}

#[cfg(test)]
mod tests {
    use resources::objects::{
        scaling::{Algorithm, ScalingBehavior, ScalingPolicy},
        ObjectReference,
    };

    use super::*;

    fn spec_with_behavior(
        min: u32,
        max: u32,
        scale_up: Option<ScaleRules>,
        scale_down: Option<ScaleRules>,
    ) -> ScalingSpec {
        ScalingSpec {
            target: ObjectReference {
                kind: "ReplicaSet".to_string(),
                name: "web".to_string(),
                api_version: "v1".to_string(),
            },
            algorithm: Algorithm::default(),
            min_replicas: min,
            max_replicas: max,
            stabilization_window_seconds: 0,
            metrics: vec![],
            behavior: Some(ScalingBehavior {
                scale_up,
                scale_down,
            }),
        }
    }

    fn rules(select: PolicySelection, policies: Vec<ScalingPolicy>) -> ScaleRules {
        ScaleRules {
            stabilization_window_seconds: 0,
            select_policy: Some(select),
            policies,
        }
    }

    #[test]
    fn scale_up_disabled_holds_at_current() {
        let spec = spec_with_behavior(
            1,
            100,
            Some(rules(PolicySelection::Disabled, vec![])),
            None,
        );
        let status = ScalingStatus {
            current_replicas: 3,
            ..Default::default()
        };
        let normalizer = BehaviorNormalizer;
        assert_eq!(normalizer.normalize_replicas(&spec, &status, 10), 3);
    }

    #[test]
    fn scale_down_with_max_select_policy_picks_largest_limit() {
        let spec = spec_with_behavior(
            0,
            100,
            None,
            Some(rules(
                PolicySelection::Max,
                vec![ScalingPolicy {
                    type_: ScalingPolicyType::Pods,
                    value: 2,
                    period_seconds: 60,
                }],
            )),
        );
        let status = ScalingStatus {
            current_replicas: 10,
            ..Default::default()
        };
        let normalizer = BehaviorNormalizer;
        // limit = 10 - 2 = 8, desired 0 -> clamp to max(8, min=0, desired=0) = 8
        assert_eq!(normalizer.normalize_replicas(&spec, &status, 0), 8);
    }

    #[test]
    fn scale_down_percent_policy_computes_fractional_limit() {
        let spec = spec_with_behavior(
            0,
            100,
            None,
            Some(rules(
                PolicySelection::Max,
                vec![ScalingPolicy {
                    type_: ScalingPolicyType::Percent,
                    value: 50,
                    period_seconds: 60,
                }],
            )),
        );
        let status = ScalingStatus {
            current_replicas: 10,
            ..Default::default()
        };
        let normalizer = BehaviorNormalizer;
        // limit = 10 * (1 - 0.5) = 5
        assert_eq!(normalizer.normalize_replicas(&spec, &status, 0), 5);
    }

    #[test]
    fn scale_up_is_capped_by_max_replicas() {
        let spec = spec_with_behavior(
            1,
            12,
            Some(rules(
                PolicySelection::Max,
                vec![ScalingPolicy {
                    type_: ScalingPolicyType::Pods,
                    value: 100,
                    period_seconds: 60,
                }],
            )),
            None,
        );
        let status = ScalingStatus {
            current_replicas: 5,
            ..Default::default()
        };
        let normalizer = BehaviorNormalizer;
        assert_eq!(normalizer.normalize_replicas(&spec, &status, 50), 12);
    }
}
