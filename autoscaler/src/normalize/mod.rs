//! Turns a raw metrics-derived replica proposal into the replica count that
//! is actually safe to apply: stabilization against recent recommendations,
//! then (when configured) velocity limits per scaling direction. Grounded in
//! `normalizer/replicas_normalizer.go`'s dispatch between the two concrete
//! normalizers this module carries.

pub mod behavior;
pub mod standard;

use resources::objects::scaling::{ScalingSpec, ScalingStatus};

pub trait Normalizer {
    fn normalize_replicas(
        &self,
        spec: &ScalingSpec,
        status: &ScalingStatus,
        desired_replicas: u32,
    ) -> u32;
}

/// Picks the behavior-aware normalizer whenever a scaling definition
/// specifies either side of `behavior`, falling back to the simpler
/// stabilization-window-only normalizer otherwise.
pub struct ReplicaNormalizer {
    standard: standard::StandardNormalizer,
    behavior: behavior::BehaviorNormalizer,
}

impl ReplicaNormalizer {
    pub fn new() -> Self {
        Self {
            standard: standard::StandardNormalizer,
            behavior: behavior::BehaviorNormalizer,
        }
    }

    pub fn normalize_replicas(
        &self,
        spec: &ScalingSpec,
        status: &ScalingStatus,
        desired_replicas: u32,
    ) -> u32 {
        match &spec.behavior {
            Some(b) if b.scale_up.is_some() || b.scale_down.is_some() => {
                self.behavior.normalize_replicas(spec, status, desired_replicas)
            },
            _ => self.standard.normalize_replicas(spec, status, desired_replicas),
        }
    }
}

impl Default for ReplicaNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
