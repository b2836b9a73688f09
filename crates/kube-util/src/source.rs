//! Cluster client seams.
//!
//! These traits abstract the cluster client so the watch supervisor and the
//! bootstrap driver can be exercised against an in-memory cluster in tests.
//! All async methods must be `Send` to work with Tokio's runtime.

use crate::error::KubeUtilError;
use crate::resolver::{ResourceMeta, ResourceMetaResolver};
use futures::stream::BoxStream;
use kube::api::{DynamicObject, WatchEvent};
use std::sync::Arc;

/// One open watch connection. Ends when the server closes the connection.
pub type WatchStream = BoxStream<'static, Result<WatchEvent<DynamicObject>, KubeUtilError>>;

/// Opens watch connections for a resolved resource type.
#[async_trait::async_trait]
pub trait WatchSource: Send + Sync {
    /// Opens a single watch connection starting after `resource_version`.
    ///
    /// `timeout_seconds` is the idle window requested for the connection;
    /// `0` requests no server-side timeout. Errors returned here mean the
    /// watch could not be established at all (authorization, bad path).
    async fn watch(
        &self,
        meta: &ResourceMeta,
        timeout_seconds: u32,
        resource_version: &str,
    ) -> Result<WatchStream, KubeUtilError>;
}

/// The cluster client shared by discovery and the watch supervisor.
pub trait ClusterClient: ResourceMetaResolver + WatchSource {}

impl<T: ResourceMetaResolver + WatchSource> ClusterClient for T {}

/// Builds the cluster client at startup.
#[async_trait::async_trait]
pub trait ClientProvider: Send + Sync {
    /// Connects to the cluster.
    async fn connect(&self) -> Result<Arc<dyn ClusterClient>, KubeUtilError>;
}
