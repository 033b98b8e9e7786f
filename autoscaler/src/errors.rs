//! Typed error enums for the handful of seams where the facade (`facade.rs`)
//! must match on variant rather than just log-and-continue, per the error
//! taxonomy in the spec this crate implements. Everywhere else in the
//! control loop uses `anyhow::Result` with `.with_context(...)`, matching
//! the rest of this codebase.

use thiserror::Error;

/// Failures from a metric fetcher (`fetchers::*`). Every variant maps to a
/// per-metric warning event; the facade skips that metric and continues
/// with the others.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("backend request failed: {0}")]
    Backend(#[from] reqwest::Error),
    #[error("failed to parse sample value: {0}")]
    Parse(String),
    #[error("no container named {0:?} in target pod spec")]
    ContainerNotFound(String),
}

/// Failures from the replica calculator (`calculator.rs`). The facade
/// treats these as non-fatal: the metric contributes its fallback proposal
/// (current replicas) and the cycle continues.
#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("no resource requests configured for the scale target")]
    NoRequestsConfigured,
}

/// Failures resolving or scaling a target (`scale_target.rs`). Any variant
/// aborts the whole cycle before the status is touched.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("invalid API version in scale target reference: {0}")]
    InvalidApiVersion(String),
    #[error("unable to resolve scale target: {0}")]
    Unresolvable(String),
    #[error("scale subresource has an empty selector")]
    EmptySelector,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
