//! Controller-specific error types.
//!
//! Every variant ends a startup attempt without a watch. None of them is
//! retried in-process; recovery is left to the pod's restart policy.

use kube_util::KubeUtilError;
use thiserror::Error;

/// Errors that can occur while starting the RemoteResourceS3 Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Cluster client could not be built
    #[error("Failed to get KubeClass: {0}")]
    ClientConstruction(#[source] KubeUtilError),

    /// Discovery request itself failed
    #[error("Failed to resolve KubeResourceMeta: {0}")]
    Discovery(#[source] KubeUtilError),

    /// Kind is not served by the cluster, or cannot be watched
    #[error("Unable to find KubeResourceMeta for {0}")]
    ResourceNotWatchable(String),

    /// Initial watch request failed after metadata resolved
    #[error("Error creating new event handler: {0}")]
    WatchEstablishment(#[source] KubeUtilError),
}
