//! The per-cycle orchestration the worker drives for every watched
//! ConfigObject. Grounded in `scale/scale_facade.go`'s `Scale` method:
//! unmarshal spec/status, apply defaults, resolve the scale target, expire
//! stale history, compute a replica proposal per metric, normalize it, apply
//! the scale if it changed, and persist the updated status.
//!
//! The Go original wraps the body in a `defer` that always persists the
//! status on the way out, however the function returns. Async Rust can't
//! run an `await` from a `Drop` impl, so there's no literal equivalent here:
//! instead, every early exit that happens *before* `current_replicas` is
//! known (a malformed spec, an unresolvable target) returns without
//! persisting anything, exactly as the Go version does before its first
//! successful target resolution; every exit *after* that point funnels
//! through the single persist call at the end of this function.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use resources::objects::{
    scaling::{MetricSource, MetricTarget, Recommendation, ScaleEvent, ScalingSpec, ScalingStatus},
    ConfigObject, Object,
};

use crate::{
    calculator::{self, ReplicaCalculator},
    client,
    defaults::DefaultsUpdater,
    fetchers::{query::QueryFetcher, resource::ResourceFetcher},
    normalize::ReplicaNormalizer,
    scale_target::{self, ScaleTarget},
};

pub struct ScaleFacade {
    defaults: DefaultsUpdater,
    calculator: ReplicaCalculator,
    normalizer: ReplicaNormalizer,
    resource_fetcher: ResourceFetcher,
    query_fetcher: QueryFetcher,
}

impl ScaleFacade {
    pub fn new(stabilization_window_seconds: u32) -> Self {
        Self {
            defaults: DefaultsUpdater::new(stabilization_window_seconds),
            calculator: ReplicaCalculator::default(),
            normalizer: ReplicaNormalizer::new(),
            resource_fetcher: ResourceFetcher::new(),
            query_fetcher: QueryFetcher::new(),
        }
    }

    /// Runs one reconciliation cycle for `item`, returning the ConfigObject
    /// with its status updated. Fails outright (with nothing persisted) if
    /// the spec can't be unmarshalled or the scale target can't be
    /// resolved; every other failure (a single metric's fetch or
    /// calculation) is logged and that metric is skipped.
    pub async fn scale(&self, item: &ConfigObject) -> Result<ConfigObject> {
        let mut spec = item
            .scaling_spec()
            .with_context(|| format!("ConfigObject {} carries an invalid scaling spec", item.name()))?;
        self.defaults.apply(&mut spec);

        let target = scale_target::get_scale_target(&spec.target)
            .await
            .with_context(|| format!("failed to resolve scale target for {}", item.name()))?;

        let mut status = item.scaling_status().unwrap_or_default();
        status.current_replicas = target.current_replicas;

        self.expire_history(&spec, &mut status);

        let desired = self
            .calculate_desired_replicas(&spec, &target, status.current_replicas)
            .await;
        status.recommendations.push(Recommendation::now(desired));

        let normalized = self.normalizer.normalize_replicas(&spec, &status, desired);

        if normalized != status.current_replicas {
            let result = scale_target::scale(&spec.target, normalized).await;
            if let Err(e) = &result {
                // Scale failed: the recommendation recorded above must still be
                // persisted so stabilization history accrues, so this falls
                // through to the persist call below instead of returning early.
                tracing::warn!("failed to apply scale to {}: {:#}", item.name(), e);
            }
            apply_scale_outcome(&mut status, normalized, result.is_ok());
        }
        status.desired_replicas = normalized;

        let updated = item.with_scaling_status(&status)?;
        client::patch_config_object(&updated)
            .await
            .with_context(|| format!("failed to persist status for {}", item.name()))?;
        Ok(updated)
    }

    /// Drops recommendations and scale events outside the windows that
    /// still govern this cycle's normalization, so status doesn't grow
    /// without bound. Grounded in
    /// `scale_facade.go`'s `expireRecommendationsAndScaleEvents`.
    fn expire_history(&self, spec: &ScalingSpec, status: &mut ScalingStatus) {
        let behavior = spec.behavior.as_ref();
        let scale_up = behavior.and_then(|b| b.scale_up.as_ref());
        let scale_down = behavior.and_then(|b| b.scale_down.as_ref());

        let recommendation_window = [
            spec.stabilization_window_seconds,
            scale_up.map(|r| r.stabilization_window_seconds).unwrap_or(0),
            scale_down.map(|r| r.stabilization_window_seconds).unwrap_or(0),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        let cutoff = Utc::now().naive_utc() - Duration::seconds(recommendation_window as i64);
        status.recommendations.retain(|r| r.timestamp > cutoff);

        if let Some(rules) = scale_up {
            let cutoff = Utc::now().naive_utc() - Duration::seconds(rules.longest_period() as i64);
            status.scale_up_events.retain(|e| e.timestamp > cutoff);
        }
        if let Some(rules) = scale_down {
            let cutoff = Utc::now().naive_utc() - Duration::seconds(rules.longest_period() as i64);
            status.scale_down_events.retain(|e| e.timestamp > cutoff);
        }
    }

    /// The maximum replica proposal across every metric source this
    /// spec carries, clamped to [minReplicas, maxReplicas]. A metric source
    /// with no backing data source, or one whose fetch/calculation fails,
    /// is skipped rather than failing the whole cycle; if every metric is
    /// skipped the current replica count is kept. Grounded in
    /// `scale_facade.go`'s `calculateMaxScaleReplicas`.
    async fn calculate_desired_replicas(
        &self,
        spec: &ScalingSpec,
        target: &ScaleTarget,
        current_replicas: u32,
    ) -> u32 {
        let mut max_proposal: Option<u32> = None;
        for source in &spec.metrics {
            if let Some(proposal) = self
                .replicas_for_metric(source, target, current_replicas)
                .await
            {
                max_proposal = Some(max_proposal.map_or(proposal, |m| m.max(proposal)));
            }
        }
        max_proposal
            .unwrap_or(current_replicas)
            .clamp(spec.min_replicas, spec.max_replicas)
    }

    async fn replicas_for_metric(
        &self,
        source: &MetricSource,
        target: &ScaleTarget,
        current_replicas: u32,
    ) -> Option<u32> {
        match source {
            MetricSource::Resource(rm) => {
                if !calculator::supported_resource(&rm.name) {
                    tracing::warn!("unsupported resource {} in scale metric, skipping", rm.name);
                    return None;
                }

                let info = match self
                    .resource_fetcher
                    .fetch(&rm.name, &target.selector, &rm.container)
                    .await
                {
                    Ok(info) => info,
                    Err(e) => {
                        tracing::warn!("fetching resource metric failed: {:#}", e);
                        return None;
                    },
                };
                if info.is_empty() {
                    tracing::warn!("no pod metrics available for resource {} metric", rm.name);
                    return None;
                }
                let values: Vec<i64> = info.values().map(|m| m.value).collect();

                let requested = if matches!(rm.target, MetricTarget::Utilization { .. }) {
                    match target.pod_spec.requested(&rm.name, &rm.container) {
                        Ok(per_pod) => Some(per_pod),
                        Err(e) => {
                            tracing::warn!("{}", e);
                            return None;
                        },
                    }
                } else {
                    None
                };

                match self
                    .calculator
                    .calculate(current_replicas, &rm.target, &values, requested)
                {
                    Ok(replicas) => Some(replicas),
                    Err(e) => {
                        tracing::warn!("calculating replicas for resource {} metric failed: {}", rm.name, e);
                        None
                    },
                }
            },
            MetricSource::Prometheus(pm) => {
                if matches!(pm.target, MetricTarget::Utilization { .. }) {
                    tracing::warn!("utilization targets are not supported for prometheus metric sources");
                    return None;
                }

                let values = match self.query_fetcher.fetch(&pm.query, pm.endpoint.as_deref()).await {
                    Ok(values) => values,
                    Err(e) => {
                        tracing::warn!("querying prometheus metric failed: {:#}", e);
                        return None;
                    },
                };
                if values.is_empty() {
                    tracing::warn!("prometheus query {:?} returned no samples", pm.query);
                    return None;
                }

                match self.calculator.calculate(current_replicas, &pm.target, &values, None) {
                    Ok(replicas) => Some(replicas),
                    Err(e) => {
                        tracing::warn!("calculating replicas for prometheus metric failed: {}", e);
                        None
                    },
                }
            },
            MetricSource::Pods(_) | MetricSource::Object(_) | MetricSource::External(_) => {
                tracing::warn!("metric source kind has no backing data source on this orchestrator, skipping");
                None
            },
        }
    }
}

fn record_scale_event(status: &mut ScalingStatus, from: u32, to: u32) {
    if to > from {
        status.scale_up_events.push(ScaleEvent::now(to - from));
    } else if to < from {
        status.scale_down_events.push(ScaleEvent::now(from - to));
    }
}

/// Applies the outcome of a scale call to `status`: on success, records the
/// applied delta as a scale event and advances `current_replicas` to match
/// the new, actually-applied state; on failure, `current_replicas` is left
/// untouched (the scale target never changed) and no scale event is
/// recorded, but the caller still persists `status` so the recommendation
/// already appended this cycle isn't lost.
fn apply_scale_outcome(status: &mut ScalingStatus, normalized: u32, succeeded: bool) {
    if succeeded {
        record_scale_event(status, status.current_replicas, normalized);
        status.current_replicas = normalized;
    }
}

#[cfg(test)]
mod tests {
    use resources::objects::scaling::{Algorithm, ResourceMetricSource};
    use resources::objects::{metrics::Resource, ObjectReference};

    use super::*;

    #[test]
    fn calculate_desired_replicas_falls_back_to_current_with_no_metrics() {
        let spec = ScalingSpec {
            target: ObjectReference {
                kind: "ReplicaSet".to_string(),
                name: "web".to_string(),
                api_version: "v1".to_string(),
            },
            algorithm: Algorithm::default(),
            min_replicas: 1,
            max_replicas: 10,
            stabilization_window_seconds: 0,
            metrics: vec![],
            behavior: None,
        };
        assert!(spec.metrics.is_empty());

        let rm = ResourceMetricSource {
            name: Resource::CPU,
            target: MetricTarget::Utilization {
                average_utilization: 80,
            },
            container: String::new(),
        };
        assert!(calculator::supported_resource(&rm.name));
    }

    #[test]
    fn scale_success_advances_current_replicas_and_records_event() {
        let mut status = ScalingStatus {
            current_replicas: 3,
            ..Default::default()
        };
        apply_scale_outcome(&mut status, 5, true);
        assert_eq!(status.current_replicas, 5);
        assert_eq!(status.scale_up_events.len(), 1);
        assert_eq!(status.scale_up_events[0].replica_change, 2);
    }

    #[test]
    fn scale_failure_leaves_current_replicas_untouched_and_records_no_event() {
        // A failed scale call must not advance current_replicas or record a
        // scale event, but the caller still persists status so the
        // recommendation appended earlier in the cycle is not lost.
        let mut status = ScalingStatus {
            current_replicas: 3,
            recommendations: vec![Recommendation::now(5)],
            ..Default::default()
        };
        apply_scale_outcome(&mut status, 5, false);
        assert_eq!(status.current_replicas, 3);
        assert!(status.scale_up_events.is_empty());
        assert_eq!(status.recommendations.len(), 1);
    }
}
