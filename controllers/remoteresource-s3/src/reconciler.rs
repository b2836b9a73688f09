//! RemoteResourceS3 reconciliation entry point.
//!
//! The event handler invokes this once per observed event. Fetching and
//! applying the S3-hosted resources happens downstream of this hook.

use kube::ResourceExt;
use kube_util::{ReconcileFactory, ResourceEvent};
use tracing::info;

/// Reconciliation strategy for `RemoteResourceS3` objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteResourceS3Controller;

impl RemoteResourceS3Controller {
    /// Creates a new reconciler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ReconcileFactory for RemoteResourceS3Controller {
    async fn reconcile(&self, event: ResourceEvent) -> anyhow::Result<()> {
        let obj = event.object();
        info!(
            "{} RemoteResourceS3 {}/{} (generation {})",
            event.event_type(),
            obj.namespace().unwrap_or_default(),
            obj.name_any(),
            obj.metadata.generation.unwrap_or_default()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube_util::mock::{dynamic_object, resource_meta};

    #[tokio::test]
    async fn test_reconcile_accepts_every_event_type() {
        let meta = resource_meta("deploy.razee.io", "v1alpha2", "RemoteResourceS3", "remoteresourcess3");
        let controller = RemoteResourceS3Controller::new();

        for event in [
            ResourceEvent::Added(dynamic_object(&meta, "rr", "razee", "1")),
            ResourceEvent::Modified(dynamic_object(&meta, "rr", "razee", "2")),
            ResourceEvent::Deleted(dynamic_object(&meta, "rr", "razee", "3")),
        ] {
            assert!(controller.reconcile(event).await.is_ok());
        }
    }
}
