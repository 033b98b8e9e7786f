//! Thin HTTP client for the orchestrator's API server: list/watch endpoints
//! for the informer, and the handful of get/update calls the scale target
//! adapter and facade need. The API server itself, its object store, and
//! the scale subresource's actual backing implementation are out of scope
//! for this crate — this module only speaks the wire protocol it already
//! exposes, the same way `podautoscaler/utils.rs` did for the HPA.

use anyhow::{anyhow, Error, Result};
use reqwest::Url;
use resources::{
    informer::{ListerWatcher, WsStream},
    models::Response,
    objects::{ConfigObject, Object, ReplicaSet},
};
use serde::{de::DeserializeOwned, Serialize};
use tokio_tungstenite::connect_async;

use crate::CONFIG;

/// Builds the lister/watcher pair an `Informer<T>` polls, following the
/// same `{base}/api/v1/{plural}` / `{base}/api/v1/watch/{plural}` shape
/// every other rMiniK8s controller's informer uses.
pub fn create_lister_watcher<T: Object + Serialize + DeserializeOwned + Send + Sync + 'static>(
    plural: &str,
) -> ListerWatcher<T> {
    let list_url = format!("{}/api/v1/{}", CONFIG.api_server_url, plural);
    let watch_url = format!("{}/api/v1/watch/{}", CONFIG.api_server_watch_url, plural);
    ListerWatcher {
        lister: Box::new(move |_| {
            let list_url = list_url.clone();
            Box::pin(async move {
                let res = reqwest::get(list_url).await?.json::<Response<Vec<T>>>().await?;
                let res = res.data.ok_or_else(|| anyhow!("Lister failed"))?;
                Ok::<Vec<T>, Error>(res)
            })
        }),
        watcher: Box::new(move |_| {
            let watch_url = watch_url.clone();
            Box::pin(async move {
                let url = Url::parse(watch_url.as_str())?;
                let (stream, _) = connect_async(url).await?;
                Ok::<WsStream, Error>(stream)
            })
        }),
    }
}

pub fn config_object_lister_watcher() -> ListerWatcher<ConfigObject> {
    create_lister_watcher("configobjects")
}

/// Reads the current state of a ReplicaSet scale target by name, the only
/// kind this orchestrator's scale subresource is backed by (see
/// `scale_target.rs`).
pub async fn get_replica_set(name: &str) -> Result<ReplicaSet> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!(
            "{}/api/v1/replicasets/{}",
            CONFIG.api_server_url, name
        ))
        .send()
        .await?
        .json::<Response<ReplicaSet>>()
        .await?;
    response.data.ok_or_else(|| anyhow!("Failed to get ReplicaSet {}", name))
}

/// Applies a scale update to a ReplicaSet (i.e. `spec.replicas`).
pub async fn update_replica_set(rs: &ReplicaSet) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .put(format!(
            "{}/api/v1/replicasets/{}",
            CONFIG.api_server_url, rs.metadata.name
        ))
        .json(rs)
        .send()
        .await?
        .json::<Response<()>>()
        .await?;
    if let Some(msg) = response.msg {
        tracing::debug!("{}", msg);
    }
    Ok(())
}

/// Persists a ConfigObject's data, i.e. the merge patch the facade applies
/// after every cycle to write back `kratosStatus`.
pub async fn patch_config_object(object: &ConfigObject) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .put(format!(
            "{}/api/v1/configobjects/{}",
            CONFIG.api_server_url, object.metadata.name
        ))
        .json(object)
        .send()
        .await?
        .json::<Response<()>>()
        .await?;
    if let Some(msg) = response.msg {
        tracing::debug!("{}", msg);
    }
    Ok(())
}
