use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use reflector::{Reflector, ReflectorNotification};
use serde::de::DeserializeOwned;
use tokio::{net::TcpStream, sync::mpsc, sync::RwLock};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::objects::Object;

mod reflector;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Shared, concurrently-readable cache of the last-seen state of every
/// object of a given kind, keyed by name.
pub type Store<T> = Arc<RwLock<HashMap<String, T>>>;

pub type CLS<ARG, RES> = Box<dyn Fn(ARG) -> BoxFuture<'static, Result<RES>> + Send + Sync>;

pub struct ListerWatcher<T> {
    pub lister: CLS<(), Vec<T>>,
    pub watcher: CLS<(), WsStream>,
}

/// Callbacks invoked as the reflector diffs watch notifications against the
/// store.
pub struct EventHandler<T> {
    pub add_cls: CLS<T, ()>,
    pub update_cls: CLS<(T, T), ()>,
    pub delete_cls: CLS<T, ()>,
}

/// Invoked on a fixed period regardless of watch activity, so that
/// consumers relying on full resyncs (not just diffs) get one even during
/// quiet periods.
pub struct ResyncHandler(pub CLS<(), ()>);

const RESYNC_PERIOD: std::time::Duration = std::time::Duration::from_secs(30);

pub struct Informer<T> {
    reflector: Arc<Reflector<T>>,
    eh: EventHandler<T>,
    rh: ResyncHandler,
    store: Store<T>,
}

impl<T> Informer<T>
where
    T: Object + Clone + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(lw: ListerWatcher<T>, eh: EventHandler<T>, rh: ResyncHandler) -> Self {
        let store: Store<T> = Arc::new(RwLock::new(HashMap::new()));
        let reflector = Reflector {
            lw,
            store: store.clone(),
        };
        Self {
            reflector: Arc::new(reflector),
            eh,
            rh,
            store,
        }
    }

    pub fn get_store(&self) -> Store<T> {
        self.store.clone()
    }

    pub async fn run(&self) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<ReflectorNotification<T>>(16);
        let r = self.reflector.clone();
        let reflector_handle = tokio::spawn(async move { r.run(tx).await });

        let mut resync = tokio::time::interval(RESYNC_PERIOD);

        tracing::info!("Informer started");
        loop {
            tokio::select! {
                n = rx.recv() => {
                    let Some(n) = n else { break };
                    match n {
                        ReflectorNotification::Add(new) => (self.eh.add_cls)(new).await?,
                        ReflectorNotification::Update(old, new) => (self.eh.update_cls)((old, new)).await?,
                        ReflectorNotification::Delete(old) => (self.eh.delete_cls)(old).await?,
                    }
                }
                _ = resync.tick() => {
                    (self.rh.0)(()).await.with_context(|| "Resync handler error")?;
                }
            }
        }

        reflector_handle.await?
    }
}
