//! In-memory cluster for unit testing
//!
//! This module provides a mock implementation of the cluster client seams
//! that can be used in unit tests without a running API server. Watch
//! connections are scripted up front; once the script runs out, further
//! connections stay open and silent.

use crate::error::KubeUtilError;
use crate::event_handler::{ReconcileFactory, ResourceEvent};
use crate::resolver::{validate_request, ResourceMeta, ResourceMetaResolver};
use crate::source::{ClientProvider, ClusterClient, WatchSource, WatchStream};
use futures::channel::mpsc as stream_channel;
use futures::StreamExt;
use kube::api::{DynamicObject, GroupVersionKind, WatchEvent};
use kube::discovery::ApiResource;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Frame sent over a live scripted watch connection.
pub type WatchFrame = Result<WatchEvent<DynamicObject>, KubeUtilError>;

/// Metadata for a watchable resource with the usual CRD verbs.
#[must_use]
pub fn resource_meta(group: &str, version: &str, kind: &str, plural: &str) -> ResourceMeta {
    let gvk = GroupVersionKind::gvk(group, version, kind);
    ResourceMeta::new(
        ApiResource::from_gvk_with_plural(&gvk, plural),
        true,
        ["get", "list", "watch", "create", "update", "patch", "delete"]
            .iter()
            .map(ToString::to_string)
            .collect(),
    )
}

/// Builds an object of the given resource type.
#[must_use]
pub fn dynamic_object(meta: &ResourceMeta, name: &str, namespace: &str, resource_version: &str) -> DynamicObject {
    let mut obj = DynamicObject::new(name, meta.api_resource()).within(namespace);
    obj.metadata.resource_version = Some(resource_version.to_string());
    obj
}

/// A recorded `get_resource_meta` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveCall {
    /// Requested api version
    pub api_version: String,
    /// Requested kind
    pub kind: String,
    /// Requested verb
    pub verb: String,
}

/// A recorded `watch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchCall {
    /// Api version of the watched resource
    pub api_version: String,
    /// Kind of the watched resource
    pub kind: String,
    /// Requested idle timeout
    pub timeout_seconds: u32,
    /// Resource version the watch resumed from
    pub resource_version: String,
}

enum ScriptedWatch {
    Frames(Vec<WatchFrame>),
    Live(stream_channel::UnboundedReceiver<WatchFrame>),
    Reject(KubeUtilError),
}

#[derive(Default)]
struct MockState {
    resources: HashMap<(String, String), ResourceMeta>,
    resolve_failure: Option<String>,
    resolve_calls: Vec<ResolveCall>,
    watch_calls: Vec<WatchCall>,
    scripted: VecDeque<ScriptedWatch>,
}

/// Mock cluster client for testing
#[derive(Clone, Default)]
pub struct MockKubeClass {
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockKubeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockKubeClass").finish_non_exhaustive()
    }
}

impl MockKubeClass {
    /// Create an empty mock cluster that serves no resource types
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test must not hide its own failure behind a poisoned lock
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Serve `meta` from discovery
    #[must_use]
    pub fn with_resource(self, meta: ResourceMeta) -> Self {
        self.lock()
            .resources
            .insert((meta.api_version().to_string(), meta.kind().to_string()), meta);
        self
    }

    /// Make every discovery request fail with `message`
    pub fn fail_resolution(&self, message: impl Into<String>) {
        self.lock().resolve_failure = Some(message.into());
    }

    /// Script a connection that delivers `frames` and then closes
    pub fn push_frames(&self, frames: Vec<WatchEvent<DynamicObject>>) {
        self.push_results(frames.into_iter().map(Ok).collect());
    }

    /// Script a connection that delivers `frames`, errors included, and then closes
    pub fn push_results(&self, frames: Vec<WatchFrame>) {
        self.lock().scripted.push_back(ScriptedWatch::Frames(frames));
    }

    /// Script a connection driven by the returned sender; dropping it closes the connection
    pub fn push_live(&self) -> stream_channel::UnboundedSender<WatchFrame> {
        let (tx, rx) = stream_channel::unbounded();
        self.lock().scripted.push_back(ScriptedWatch::Live(rx));
        tx
    }

    /// Script a connection attempt that fails to open
    pub fn reject_next_watch(&self, message: impl Into<String>) {
        self.fail_next_watch(KubeUtilError::Watch(message.into()));
    }

    /// Script a connection attempt that fails to open with `error`
    pub fn fail_next_watch(&self, error: KubeUtilError) {
        self.lock().scripted.push_back(ScriptedWatch::Reject(error));
    }

    /// Discovery calls made so far
    #[must_use]
    pub fn resolve_calls(&self) -> Vec<ResolveCall> {
        self.lock().resolve_calls.clone()
    }

    /// Watch connections opened (or attempted) so far
    #[must_use]
    pub fn watch_calls(&self) -> Vec<WatchCall> {
        self.lock().watch_calls.clone()
    }
}

#[async_trait::async_trait]
impl ResourceMetaResolver for MockKubeClass {
    async fn get_resource_meta(
        &self,
        api_version: &str,
        kind: &str,
        verb: &str,
    ) -> Result<Option<ResourceMeta>, KubeUtilError> {
        validate_request(api_version, kind)?;

        let mut state = self.lock();
        state.resolve_calls.push(ResolveCall {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            verb: verb.to_string(),
        });
        if let Some(message) = &state.resolve_failure {
            return Err(KubeUtilError::Discovery(message.clone()));
        }

        Ok(state
            .resources
            .get(&(api_version.to_string(), kind.to_string()))
            .filter(|meta| meta.supports(verb))
            .cloned())
    }
}

#[async_trait::async_trait]
impl WatchSource for MockKubeClass {
    async fn watch(
        &self,
        meta: &ResourceMeta,
        timeout_seconds: u32,
        resource_version: &str,
    ) -> Result<WatchStream, KubeUtilError> {
        let mut state = self.lock();
        state.watch_calls.push(WatchCall {
            api_version: meta.api_version().to_string(),
            kind: meta.kind().to_string(),
            timeout_seconds,
            resource_version: resource_version.to_string(),
        });

        match state.scripted.pop_front() {
            Some(ScriptedWatch::Frames(frames)) => Ok(futures::stream::iter(frames).boxed()),
            Some(ScriptedWatch::Live(rx)) => Ok(rx.boxed()),
            Some(ScriptedWatch::Reject(error)) => Err(error),
            None => Ok(futures::stream::pending::<WatchFrame>().boxed()),
        }
    }
}

/// Client provider handing out a [`MockKubeClass`], or failing to connect
#[derive(Debug, Clone)]
pub struct MockClientProvider {
    client: MockKubeClass,
    failure: Option<String>,
    connects: Arc<AtomicUsize>,
}

impl MockClientProvider {
    /// Provider that connects to `client`
    #[must_use]
    pub fn new(client: MockKubeClass) -> Self {
        Self {
            client,
            failure: None,
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Provider whose connection attempts fail with `message`
    #[must_use]
    pub fn failing(client: MockKubeClass, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(client)
        }
    }

    /// Number of connection attempts
    #[must_use]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ClientProvider for MockClientProvider {
    async fn connect(&self) -> Result<Arc<dyn ClusterClient>, KubeUtilError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(KubeUtilError::ClientConstruction(message.clone())),
            None => Ok(Arc::new(self.client.clone())),
        }
    }
}

/// Factory that forwards every event to a channel
#[derive(Debug, Clone)]
pub struct RecordingFactory {
    tx: mpsc::UnboundedSender<ResourceEvent>,
    fail_names: HashSet<String>,
}

impl RecordingFactory {
    /// Create a factory and the receiver observing its invocations
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResourceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                fail_names: HashSet::new(),
            },
            rx,
        )
    }

    /// Report a reconcile failure for objects named `name` (after recording them)
    #[must_use]
    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_names.insert(name.to_string());
        self
    }
}

#[async_trait::async_trait]
impl ReconcileFactory for RecordingFactory {
    async fn reconcile(&self, event: ResourceEvent) -> anyhow::Result<()> {
        let name = event.object().metadata.name.clone().unwrap_or_default();
        // Receiver may be gone once the test has what it needs
        let _ = self.tx.send(event);
        if self.fail_names.contains(&name) {
            anyhow::bail!("simulated reconcile failure for {name}");
        }
        Ok(())
    }
}
