//! Kubernetes-backed cluster client.

use crate::error::KubeUtilError;
use crate::resolver::{find_resource_meta, validate_request, ResourceMeta, ResourceMetaResolver};
use crate::source::{ClientProvider, ClusterClient, WatchSource, WatchStream};
use futures::{StreamExt, TryStreamExt};
use kube::api::{Api, DynamicObject, WatchParams};
use kube::Client;
use std::sync::Arc;
use tracing::debug;

/// Upper bound for the server-side watch timeout.
///
/// The client rejects watch timeouts of 295s and above, since they would
/// outlive its own read timeout.
pub const MAX_SERVER_WATCH_TIMEOUT_SECS: u32 = 290;

/// Cluster client wrapping a `kube::Client`.
#[derive(Clone)]
pub struct KubeClass {
    client: Client,
}

impl std::fmt::Debug for KubeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClass").finish_non_exhaustive()
    }
}

impl KubeClass {
    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the in-cluster environment or local kubeconfig.
    pub async fn try_default() -> Result<Self, KubeUtilError> {
        let client = Client::try_default()
            .await
            .map_err(|e| KubeUtilError::ClientConstruction(e.to_string()))?;
        Ok(Self::new(client))
    }
}

/// Server-side timeout actually sent with the watch request.
#[must_use]
pub fn server_watch_timeout(timeout_seconds: u32) -> Option<u32> {
    (timeout_seconds > 0).then(|| timeout_seconds.min(MAX_SERVER_WATCH_TIMEOUT_SECS))
}

#[async_trait::async_trait]
impl ResourceMetaResolver for KubeClass {
    async fn get_resource_meta(
        &self,
        api_version: &str,
        kind: &str,
        verb: &str,
    ) -> Result<Option<ResourceMeta>, KubeUtilError> {
        validate_request(api_version, kind)?;

        let discovery = if api_version.contains('/') {
            self.client.list_api_group_resources(api_version).await
        } else {
            self.client.list_core_api_resources(api_version).await
        };

        let list = match discovery {
            Ok(list) => list,
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!("Discovery document for {} not served", api_version);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(find_resource_meta(&list, api_version, kind, verb))
    }
}

#[async_trait::async_trait]
impl WatchSource for KubeClass {
    async fn watch(
        &self,
        meta: &ResourceMeta,
        timeout_seconds: u32,
        resource_version: &str,
    ) -> Result<WatchStream, KubeUtilError> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), meta.api_resource());

        let mut params = WatchParams::default();
        if let Some(timeout) = server_watch_timeout(timeout_seconds) {
            params = params.timeout(timeout);
        }

        debug!(
            "Opening watch on {} {} from resourceVersion {}",
            meta.api_version(),
            meta.plural(),
            resource_version
        );
        let stream = api.watch(&params, resource_version).await?;
        Ok(stream.map_err(KubeUtilError::from).boxed())
    }
}

/// Provides a [`KubeClass`] built with `Client::try_default()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClientProvider;

#[async_trait::async_trait]
impl ClientProvider for DefaultClientProvider {
    async fn connect(&self) -> Result<Arc<dyn ClusterClient>, KubeUtilError> {
        let kc = KubeClass::try_default().await?;
        Ok(Arc::new(kc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_watch_timeout_is_clamped() {
        assert_eq!(server_watch_timeout(300), Some(290));
        assert_eq!(server_watch_timeout(60), Some(60));
        assert_eq!(server_watch_timeout(0), None);
    }
}
