use anyhow::{anyhow, Result};
use futures_util::stream::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use super::{ListerWatcher, Store};
use crate::{models::etcd::WatchEvent, objects::Object};

pub(super) struct Reflector<T> {
    pub(super) lw: ListerWatcher<T>,
    pub(super) store: Store<T>,
}

#[derive(Debug)]
pub(super) enum ReflectorNotification<T> {
    Add(T),
    /// old value, new value
    Update(T, T),
    Delete(T),
}

impl<T> Reflector<T>
where
    T: Object + Clone + DeserializeOwned + Send + Sync + 'static,
{
    pub(super) async fn run(&self, tx: mpsc::Sender<ReflectorNotification<T>>) -> Result<()> {
        // pull the init changes
        let objects: Vec<T> = (self.lw.lister)(()).await?;
        {
            let mut store = self.store.write().await;
            for object in objects {
                store.insert(object.name().to_owned(), object);
            }
        }
        let (_, mut receiver) = (self.lw.watcher)(()).await?.split();

        loop {
            let msg: Message = receiver
                .next()
                .await
                .ok_or_else(|| anyhow!("Failed to receive watch message from api-server"))??;

            if msg.is_close() {
                return Err(anyhow!("Api-server watch disconnect"));
            }

            if let Message::Text(msg) = msg {
                let event: WatchEvent = serde_json::from_str(msg.as_str())?;
                match event {
                    WatchEvent::Put(e) => {
                        let new: T = serde_json::from_str(&e.object)?;
                        let old = self.store.write().await.insert(e.key.to_owned(), new.clone());
                        match old {
                            Some(old) => tx.send(ReflectorNotification::Update(old, new)).await?,
                            None => tx.send(ReflectorNotification::Add(new)).await?,
                        }
                    },
                    WatchEvent::Delete(e) => {
                        let removed = self.store.write().await.remove(&e.key);
                        if let Some(old) = removed {
                            tx.send(ReflectorNotification::Delete(old)).await?;
                        } else {
                            tracing::warn!("Watch inconsistent, key {} already deleted", e.key);
                        }
                    },
                }
            } else {
                tracing::warn!("Receive none text watch message from api-server");
            }
        }
    }
}
