//! Supervised watch event handler.
//!
//! An [`EventHandler`] owns the single watch subscription for one resource
//! type. It opens the watch stream, keeps it alive, and hands every observed
//! add/update/delete event to a [`ReconcileFactory`].
//!
//! Reconnection is unconditional and unbounded: a stream that ends, errors,
//! or goes quiet for longer than the configured timeout is replaced with a
//! new one built from the same parameters. Only the very first open is
//! reported back to the caller; after that the supervisor never gives up.

use crate::backoff::FibonacciBackoff;
use crate::error::KubeUtilError;
use crate::resolver::ResourceMeta;
use crate::source::{ClusterClient, WatchStream};
use futures::StreamExt;
use kube::api::{DynamicObject, WatchEvent};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn, Instrument, Span};

/// Default idle timeout for a watch connection.
pub const DEFAULT_WATCH_TIMEOUT_SECONDS: u32 = 300;

/// Resource version that starts a watch with the current state of every object.
const INITIAL_RESOURCE_VERSION: &str = "0";

/// HTTP status the API server uses when a resource version is too old.
const GONE: u16 = 410;

/// Watch connection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Seconds a connection may stay idle before it is considered stale.
    /// `0` disables the idle threshold.
    pub timeout_seconds: u32,
    /// Whether idle connections are detected and replaced.
    pub liveness_interval: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_WATCH_TIMEOUT_SECONDS,
            liveness_interval: true,
        }
    }
}

impl WatchConfig {
    /// How long a connection may go without frames before it is replaced.
    #[must_use]
    pub fn idle_threshold(&self) -> Option<Duration> {
        (self.liveness_interval && self.timeout_seconds > 0)
            .then(|| Duration::from_secs(u64::from(self.timeout_seconds)))
    }
}

/// An observed change to a watched object.
#[derive(Debug, Clone)]
pub enum ResourceEvent {
    /// Object was created (or already existed when the watch started)
    Added(DynamicObject),
    /// Object was updated
    Modified(DynamicObject),
    /// Object was deleted
    Deleted(DynamicObject),
}

impl ResourceEvent {
    /// The object carried by the event.
    #[must_use]
    pub fn object(&self) -> &DynamicObject {
        match self {
            Self::Added(obj) | Self::Modified(obj) | Self::Deleted(obj) => obj,
        }
    }

    /// Watch event type as named by the API server.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Added(_) => "ADDED",
            Self::Modified(_) => "MODIFIED",
            Self::Deleted(_) => "DELETED",
        }
    }
}

/// Reconciliation strategy injected into the event handler.
///
/// Invoked exactly once per observed event, sequentially, in the order the
/// API server delivered the events.
#[async_trait::async_trait]
pub trait ReconcileFactory: Send + Sync {
    /// Handles one observed event.
    async fn reconcile(&self, event: ResourceEvent) -> anyhow::Result<()>;
}

/// Everything needed to start an [`EventHandler`].
pub struct EventHandlerParams {
    /// Resolved metadata of the watched resource type
    pub resource_meta: ResourceMeta,
    /// Reconciliation strategy
    pub factory: Arc<dyn ReconcileFactory>,
    /// Shared cluster client
    pub client: Arc<dyn ClusterClient>,
    /// Span every supervisor log line is recorded under
    pub span: Span,
    /// Connection settings
    pub watch_config: WatchConfig,
}

impl fmt::Debug for EventHandlerParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlerParams")
            .field("resource_meta", &self.resource_meta)
            .field("watch_config", &self.watch_config)
            .finish_non_exhaustive()
    }
}

/// A running watch subscription.
///
/// Lives until the process exits; dropping the handle does not stop the
/// supervision task.
#[derive(Debug)]
pub struct EventHandler {
    resource_meta: ResourceMeta,
    task: JoinHandle<()>,
}

impl EventHandler {
    /// Opens the watch and starts supervising it in the background.
    ///
    /// The initial open is awaited; if it fails the error is returned and
    /// nothing is spawned. Retrying is left to the caller.
    pub async fn start(params: EventHandlerParams) -> Result<Self, KubeUtilError> {
        let EventHandlerParams {
            resource_meta,
            factory,
            client,
            span,
            watch_config,
        } = params;

        let supervisor = Supervisor {
            meta: resource_meta.clone(),
            factory,
            client,
            config: watch_config,
            resource_version: INITIAL_RESOURCE_VERSION.to_string(),
            backoff: FibonacciBackoff::default(),
        };

        let stream = supervisor.open().instrument(span.clone()).await?;
        span.in_scope(|| {
            info!(
                "Watching {} {} (timeout {}s, liveness {})",
                resource_meta.api_version(),
                resource_meta.kind(),
                watch_config.timeout_seconds,
                watch_config.liveness_interval
            );
        });

        let task = tokio::spawn(supervisor.run(stream).instrument(span));
        Ok(Self {
            resource_meta,
            task,
        })
    }

    /// Metadata of the watched resource type.
    #[must_use]
    pub fn resource_meta(&self) -> &ResourceMeta {
        &self.resource_meta
    }

    /// Whether the supervision task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the supervision task. Only returns if it panicked or was aborted.
    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}

/// Why a watch connection stopped delivering events.
#[derive(Debug)]
enum StreamEnd {
    /// Server closed the connection, normally at its timeout
    Closed {
        /// Whether any frame arrived before the close
        delivered: bool,
    },
    /// Nothing arrived within the idle threshold
    Stale,
    /// Resource version expired; resume from the current state
    Expired,
    /// Transport error or error frame
    Failed(String),
}

struct Supervisor {
    meta: ResourceMeta,
    factory: Arc<dyn ReconcileFactory>,
    client: Arc<dyn ClusterClient>,
    config: WatchConfig,
    resource_version: String,
    backoff: FibonacciBackoff,
}

impl Supervisor {
    async fn open(&self) -> Result<WatchStream, KubeUtilError> {
        self.client
            .watch(&self.meta, self.config.timeout_seconds, &self.resource_version)
            .await
    }

    async fn run(mut self, mut stream: WatchStream) {
        loop {
            match self.pump(&mut stream).await {
                StreamEnd::Closed { delivered: true } => {
                    debug!("Watch connection closed by server, reconnecting");
                }
                StreamEnd::Closed { delivered: false } => {
                    let delay = self.backoff.next_backoff();
                    debug!("Watch connection closed without events, reconnecting in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
                StreamEnd::Expired => {
                    info!("Resource version {} expired, restarting watch from current state", self.resource_version);
                    self.resource_version = INITIAL_RESOURCE_VERSION.to_string();
                }
                StreamEnd::Stale => {
                    let delay = self.backoff.next_backoff();
                    warn!(
                        "No watch activity for {}s, reconnecting in {:?}",
                        self.config.timeout_seconds, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                StreamEnd::Failed(reason) => {
                    let delay = self.backoff.next_backoff();
                    warn!("Watch stream error: {}, reconnecting in {:?}", reason, delay);
                    tokio::time::sleep(delay).await;
                }
            }
            stream = self.reopen().await;
        }
    }

    async fn reopen(&mut self) -> WatchStream {
        loop {
            match self.open().await {
                Ok(stream) => {
                    debug!(
                        "Watch re-established for {} {} at resourceVersion {}",
                        self.meta.api_version(),
                        self.meta.kind(),
                        self.resource_version
                    );
                    return stream;
                }
                Err(e) => {
                    if matches!(&e, KubeUtilError::Kube(kube::Error::Api(ae)) if ae.code == GONE) {
                        self.resource_version = INITIAL_RESOURCE_VERSION.to_string();
                    }
                    let delay = self.backoff.next_backoff();
                    warn!("Failed to re-establish watch: {}, retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn pump(&mut self, stream: &mut WatchStream) -> StreamEnd {
        let mut delivered = false;
        loop {
            let next = match self.config.idle_threshold() {
                Some(idle) => match tokio::time::timeout(idle, stream.next()).await {
                    Ok(next) => next,
                    Err(_) => return StreamEnd::Stale,
                },
                None => stream.next().await,
            };

            let frame = match next {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return StreamEnd::Failed(e.to_string()),
                None => return StreamEnd::Closed { delivered },
            };
            delivered = true;
            self.backoff.reset();

            match frame {
                WatchEvent::Added(obj) => self.dispatch(ResourceEvent::Added(obj)).await,
                WatchEvent::Modified(obj) => self.dispatch(ResourceEvent::Modified(obj)).await,
                WatchEvent::Deleted(obj) => self.dispatch(ResourceEvent::Deleted(obj)).await,
                WatchEvent::Bookmark(bookmark) => {
                    self.resource_version = bookmark.metadata.resource_version;
                }
                WatchEvent::Error(e) if e.code == GONE => return StreamEnd::Expired,
                WatchEvent::Error(e) => {
                    return StreamEnd::Failed(format!("{} ({}): {}", e.reason, e.code, e.message));
                }
            }
        }
    }

    async fn dispatch(&mut self, event: ResourceEvent) {
        let metadata = &event.object().metadata;
        if let Some(rv) = &metadata.resource_version {
            self.resource_version.clone_from(rv);
        }
        let name = metadata.name.clone().unwrap_or_else(|| "<unknown>".to_string());
        let namespace = metadata.namespace.clone().unwrap_or_default();
        let event_type = event.event_type();

        debug!("{} {} {}/{}", event_type, self.meta.kind(), namespace, name);
        if let Err(e) = self.factory.reconcile(event).await {
            error!(
                "Failed to reconcile {} {} {}/{}: {:#}",
                event_type,
                self.meta.kind(),
                namespace,
                name,
                e
            );
        }
    }
}
