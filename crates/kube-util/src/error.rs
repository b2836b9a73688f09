//! Kubernetes utility errors

use thiserror::Error;

/// Errors raised while talking to the cluster API.
#[derive(Debug, Error)]
pub enum KubeUtilError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Client could not be constructed (no kubeconfig, unreachable API server, ...)
    #[error("Failed to build Kubernetes client: {0}")]
    ClientConstruction(String),

    /// Discovery request failed for a reason other than the kind being absent
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Caller passed an empty api version or kind
    #[error("Invalid resource identity: {0}")]
    InvalidInput(String),

    /// The watch stream failed or delivered an error frame
    #[error("Watch stream error: {0}")]
    Watch(String),
}
