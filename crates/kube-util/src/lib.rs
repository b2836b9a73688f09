//! Kubernetes utilities for Razee controllers
//!
//! Resolves a custom resource type against the cluster's discovery surface
//! and keeps a supervised watch open on it, handing every observed event to
//! an injected reconciliation strategy.
//!
//! # Example
//!
//! ```no_run
//! use kube_util::{
//!     EventHandler, EventHandlerParams, KubeClass, ReconcileFactory, ResourceEvent,
//!     ResourceMetaResolver, WatchConfig, WATCH_VERB,
//! };
//! use std::sync::Arc;
//!
//! struct Logger;
//!
//! #[async_trait::async_trait]
//! impl ReconcileFactory for Logger {
//!     async fn reconcile(&self, event: ResourceEvent) -> anyhow::Result<()> {
//!         println!("{} {:?}", event.event_type(), event.object().metadata.name);
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let kc = Arc::new(KubeClass::try_default().await?);
//! if let Some(meta) = kc.get_resource_meta("deploy.razee.io/v1alpha2", "RemoteResourceS3", WATCH_VERB).await? {
//!     let handler = EventHandler::start(EventHandlerParams {
//!         resource_meta: meta,
//!         factory: Arc::new(Logger),
//!         client: kc,
//!         span: tracing::Span::current(),
//!         watch_config: WatchConfig::default(),
//!     })
//!     .await?;
//!     handler.join().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod client;
pub mod error;
pub mod event_handler;
pub mod identity;
pub mod resolver;
pub mod source;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{DefaultClientProvider, KubeClass};
pub use error::KubeUtilError;
pub use event_handler::{
    EventHandler, EventHandlerParams, ReconcileFactory, ResourceEvent, WatchConfig,
    DEFAULT_WATCH_TIMEOUT_SECONDS,
};
pub use identity::ResourceIdentity;
pub use resolver::{ResourceMeta, ResourceMetaResolver, WATCH_VERB};
pub use source::{ClientProvider, ClusterClient, WatchSource, WatchStream};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockClientProvider, MockKubeClass, RecordingFactory};
