//! Pluggable metric fetchers: one per [`resources::objects::scaling::MetricSource`]
//! variant that this crate backs with a concrete data source. `Resource`
//! sources are served from the orchestrator's own per-pod metrics endpoint;
//! `Prometheus` sources are served by querying an arbitrary Prometheus-style
//! instant-vector API. `Pods`/`Object`/`External` sources have no backing
//! data source on this orchestrator and are rejected at the calculator.

pub mod query;
pub mod resource;

use std::time::Duration;

/// How long a fetched value, or a client built to fetch one, is reused
/// before being refreshed. Matches `defaultCacheTtl` in the fetcher this
/// module is grounded on.
pub const CACHE_TTL: Duration = Duration::from_secs(30);
