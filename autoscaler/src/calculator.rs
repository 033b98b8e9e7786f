//! Turns a metric's fetched sample values into a proposed replica count.
//! Grounded in `replicas/replicas_calculator.go`, which this corrects the
//! teacher's own `replica_calculator.rs` to match: a tolerance band around
//! 1.0 so small fluctuations don't cause a change, and three ratio formulas
//! depending on whether the metric target is a raw value, an average value,
//! or a resource utilization percentage.

use resources::objects::{metrics::Resource, scaling::MetricTarget};

use crate::errors::CalculationError;

/// How close the usage ratio must be to 1.0 before a replica count change is
/// proposed at all. Matches the Go calculator's default.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

pub struct ReplicaCalculator {
    tolerance: f64,
}

impl ReplicaCalculator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Proposes a replica count from `metric_values` (one sample per pod or
    /// per series, already fetched) for the given `target`. `requested`
    /// is the summed resource request across the scale target's pods,
    /// consulted only for `Utilization` targets.
    pub fn calculate(
        &self,
        current_replicas: u32,
        target: &MetricTarget,
        metric_values: &[i64],
        requested: Option<i64>,
    ) -> Result<u32, CalculationError> {
        match target {
            MetricTarget::Value { value } => {
                let usage_ratio = sum(metric_values) as f64 / *value as f64;
                Ok(self.replicas_from_ratio(current_replicas, usage_ratio))
            },
            MetricTarget::AverageValue { average_value } => {
                let total = sum(metric_values) as f64;
                if current_replicas != 0 {
                    let usage_ratio = total / (*average_value as f64 * current_replicas as f64);
                    if (1.0 - usage_ratio).abs() <= self.tolerance {
                        return Ok(current_replicas);
                    }
                }
                Ok((total / *average_value as f64).ceil() as u32)
            },
            MetricTarget::Utilization {
                average_utilization,
            } => {
                let requested = requested.ok_or(CalculationError::NoRequestsConfigured)?;
                if requested == 0 {
                    return Err(CalculationError::NoRequestsConfigured);
                }
                let usage_ratio =
                    (sum(metric_values) as f64 / requested as f64) / (*average_utilization as f64 / 100.0);
                Ok(self.replicas_from_ratio(current_replicas, usage_ratio))
            },
        }
    }

    /// Shared by `Value` and `Utilization`: applies the tolerance band, then
    /// scales `currentReplicas` by `usageRatio`, handling the cold-start case
    /// (zero current replicas) by scaling from the ratio alone.
    fn replicas_from_ratio(&self, current_replicas: u32, usage_ratio: f64) -> u32 {
        if current_replicas != 0 {
            if (1.0 - usage_ratio).abs() <= self.tolerance {
                return current_replicas;
            }
            (usage_ratio * current_replicas as f64).ceil() as u32
        } else {
            usage_ratio.ceil().max(0.0) as u32
        }
    }
}

impl Default for ReplicaCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

fn sum(values: &[i64]) -> i64 {
    values.iter().sum()
}

/// Resource names this calculator knows how to read request totals for.
/// `Utilization` targets on any other resource kind are rejected before
/// reaching the calculator.
pub fn supported_resource(resource: &Resource) -> bool {
    matches!(resource, Resource::CPU | Resource::Memory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_target_scales_proportionally_outside_tolerance() {
        let calc = ReplicaCalculator::new(0.1);
        // current=2 pods handling 200 total against a target of 100: ratio=2.0
        let replicas = calc
            .calculate(2, &MetricTarget::Value { value: 100 }, &[200], None)
            .unwrap();
        assert_eq!(replicas, 4);
    }

    #[test]
    fn value_target_holds_steady_within_tolerance() {
        let calc = ReplicaCalculator::new(0.1);
        // ratio = 105/100 = 1.05, within 0.1 tolerance of 1.0
        let replicas = calc
            .calculate(3, &MetricTarget::Value { value: 100 }, &[105], None)
            .unwrap();
        assert_eq!(replicas, 3);
    }

    #[test]
    fn average_value_target_divides_by_current_replicas() {
        let calc = ReplicaCalculator::new(0.1);
        // total=600 across 3 replicas averaging 200 vs target 100: ratio=2.0
        let replicas = calc
            .calculate(
                3,
                &MetricTarget::AverageValue { average_value: 100 },
                &[200, 200, 200],
                None,
            )
            .unwrap();
        assert_eq!(replicas, 6);
    }

    #[test]
    fn average_value_target_holds_steady_within_tolerance() {
        let calc = ReplicaCalculator::new(0.1);
        // current=1, target.avg=5, samples=[5]: usage_ratio = 5/(5*1) = 1.0
        let replicas = calc
            .calculate(1, &MetricTarget::AverageValue { average_value: 5 }, &[5], None)
            .unwrap();
        assert_eq!(replicas, 1);
    }

    #[test]
    fn utilization_target_uses_requested_resources() {
        let calc = ReplicaCalculator::new(0.1);
        // usage=800m against requested=1000m (cpu) at 40% target: ratio = 0.8/0.4=2.0
        let replicas = calc
            .calculate(
                2,
                &MetricTarget::Utilization {
                    average_utilization: 40,
                },
                &[800],
                Some(1000),
            )
            .unwrap();
        assert_eq!(replicas, 4);
    }

    #[test]
    fn utilization_target_scales_by_current_replicas_from_per_pod_request() {
        let calc = ReplicaCalculator::new(0.1);
        // total usage=900 across 3 pods each requesting 100, at 100% target:
        // ratio = (900/100)/(100/100) = 9.0, proposal = ceil(9.0*3) = 27.
        // The caller must pass the per-pod request, not per_pod*current_replicas,
        // or this factor of `current_replicas` gets cancelled out.
        let replicas = calc
            .calculate(
                3,
                &MetricTarget::Utilization {
                    average_utilization: 100,
                },
                &[900],
                Some(100),
            )
            .unwrap();
        assert_eq!(replicas, 27);
    }

    #[test]
    fn utilization_target_fails_with_no_requests_configured() {
        let calc = ReplicaCalculator::new(0.1);
        let result = calc.calculate(
            2,
            &MetricTarget::Utilization {
                average_utilization: 40,
            },
            &[800],
            Some(0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn cold_start_scales_from_ratio_alone_when_current_is_zero() {
        let calc = ReplicaCalculator::new(0.1);
        let replicas = calc
            .calculate(0, &MetricTarget::Value { value: 100 }, &[350], None)
            .unwrap();
        assert_eq!(replicas, 4);
    }
}
