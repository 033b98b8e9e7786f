//! The simple normalizer used when a scaling definition carries no
//! `behavior` policies at all: stabilize against recent recommendations
//! within the spec's stabilization window, then cap the scale-up velocity
//! at `max(2 * current, 4)` before clamping to [min, max]. Grounded in
//! `pkg/normalizer/standard_normalizer.go`.

use chrono::{Duration, Utc};
use resources::objects::scaling::{ScalingSpec, ScalingStatus};

use super::Normalizer;

const SCALE_UP_LIMIT_FACTOR: f64 = 2.0;
const SCALE_UP_LIMIT_MINIMUM: f64 = 4.0;

pub struct StandardNormalizer;

impl Normalizer for StandardNormalizer {
    fn normalize_replicas(
        &self,
        spec: &ScalingSpec,
        status: &ScalingStatus,
        desired_replicas: u32,
    ) -> u32 {
        let max_recommendation = self.find_max_recommendation(
            spec.stabilization_window_seconds,
            status,
            desired_replicas,
        );

        let scale_up_limit = calculate_scale_up_limit(status.current_replicas);
        let max_allowed = spec.max_replicas.min(scale_up_limit);

        if max_recommendation > max_allowed {
            return max_allowed;
        }
        if max_recommendation < spec.min_replicas {
            return spec.min_replicas;
        }
        max_recommendation
    }
}

impl StandardNormalizer {
    /// The largest recommendation recorded within the stabilization window,
    /// or `desired_replicas` itself if nothing in that window exceeds it.
    fn find_max_recommendation(
        &self,
        stabilization_window_seconds: u32,
        status: &ScalingStatus,
        desired_replicas: u32,
    ) -> u32 {
        let cutoff = Utc::now().naive_utc() - Duration::seconds(stabilization_window_seconds as i64);
        status
            .recommendations
            .iter()
            .filter(|r| r.timestamp > cutoff)
            .map(|r| r.replicas)
            .fold(desired_replicas, u32::max)
    }
}

fn calculate_scale_up_limit(current_replicas: u32) -> u32 {
    ((current_replicas as f64 * SCALE_UP_LIMIT_FACTOR).max(SCALE_UP_LIMIT_MINIMUM)) as u32
}

#[cfg(test)]
mod tests {
    use resources::objects::{scaling::Recommendation, ObjectReference};

    use super::*;

    fn spec(min: u32, max: u32, window: u32) -> ScalingSpec {
        ScalingSpec {
            target: ObjectReference {
                kind: "ReplicaSet".to_string(),
                name: "web".to_string(),
                api_version: "v1".to_string(),
            },
            algorithm: Default::default(),
            min_replicas: min,
            max_replicas: max,
            stabilization_window_seconds: window,
            metrics: vec![],
            behavior: None,
        }
    }

    #[test]
    fn scale_up_is_capped_at_twice_current_or_four() {
        let spec = spec(1, 100, 0);
        let status = ScalingStatus {
            current_replicas: 2,
            ..Default::default()
        };
        let normalizer = StandardNormalizer;
        // max(2*2, 4) = 4, so a desired of 10 gets capped at 4
        assert_eq!(normalizer.normalize_replicas(&spec, &status, 10), 4);
    }

    #[test]
    fn clamps_to_max_replicas() {
        let spec = spec(1, 5, 0);
        let status = ScalingStatus {
            current_replicas: 10,
            ..Default::default()
        };
        let normalizer = StandardNormalizer;
        assert_eq!(normalizer.normalize_replicas(&spec, &status, 20), 5);
    }

    #[test]
    fn clamps_to_min_replicas() {
        let spec = spec(3, 100, 0);
        let status = ScalingStatus {
            current_replicas: 3,
            ..Default::default()
        };
        let normalizer = StandardNormalizer;
        assert_eq!(normalizer.normalize_replicas(&spec, &status, 1), 3);
    }

    #[test]
    fn recent_recommendations_within_window_raise_the_floor() {
        let spec = spec(1, 100, 300);
        let status = ScalingStatus {
            current_replicas: 5,
            recommendations: vec![Recommendation::now(8)],
            ..Default::default()
        };
        let normalizer = StandardNormalizer;
        // max(2*5,4)=10 limit so 8 survives unclamped
        assert_eq!(normalizer.normalize_replicas(&spec, &status, 3), 8);
    }
}
