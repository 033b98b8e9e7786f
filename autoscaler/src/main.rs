#[macro_use]
extern crate lazy_static;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use resources::config::AutoscalerConfig;

mod calculator;
mod client;
mod defaults;
mod errors;
mod facade;
mod fetchers;
mod normalize;
mod scale_target;
mod worker;

lazy_static! {
    pub static ref CONFIG: AutoscalerConfig = Config::builder()
        .add_source(File::with_name("/etc/rminik8s/autoscaler.yaml").required(false))
        .add_source(Environment::default())
        .build()
        .unwrap_or_default()
        .try_deserialize::<AutoscalerConfig>()
        .with_context(|| "Failed to parse config".to_string())
        .unwrap_or_default();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!(
        api_server_url = %CONFIG.api_server_url,
        stabilization_window_seconds = CONFIG.stabilization_window_seconds,
        "autoscaler starting"
    );

    let mut reconciler = worker::Reconciler::new(CONFIG.stabilization_window_seconds);
    reconciler.run().await
}
