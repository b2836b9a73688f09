//! Resource metadata resolution.
//!
//! Given an `apiVersion`, kind and verb, the resolver answers whether the
//! cluster serves that kind and permits the verb on it. A negative answer is
//! `Ok(None)`, not an error: the CRD may simply not be installed yet.

use crate::error::KubeUtilError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::api::GroupVersionKind;
use kube::discovery::ApiResource;

/// Verb checked before opening a watch.
pub const WATCH_VERB: &str = "watch";

/// Watch-capable description of a resource type, as served by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMeta {
    api_resource: ApiResource,
    namespaced: bool,
    verbs: Vec<String>,
}

impl ResourceMeta {
    /// Creates resource metadata from its parts.
    #[must_use]
    pub fn new(api_resource: ApiResource, namespaced: bool, verbs: Vec<String>) -> Self {
        Self {
            api_resource,
            namespaced,
            verbs,
        }
    }

    /// The dynamic API resource used to build `Api<DynamicObject>` handles.
    #[must_use]
    pub fn api_resource(&self) -> &ApiResource {
        &self.api_resource
    }

    /// Resource kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.api_resource.kind
    }

    /// `apiVersion` of the resource.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_resource.api_version
    }

    /// Plural resource name used in request paths.
    #[must_use]
    pub fn plural(&self) -> &str {
        &self.api_resource.plural
    }

    /// Whether the resource is namespace scoped.
    #[must_use]
    pub fn namespaced(&self) -> bool {
        self.namespaced
    }

    /// Whether the cluster permits `verb` on this resource.
    #[must_use]
    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v == verb)
    }
}

/// Looks up resource metadata from the cluster's discovery surface.
#[async_trait::async_trait]
pub trait ResourceMetaResolver: Send + Sync {
    /// Resolves `kind` in `api_version`, returning `Ok(None)` when the kind is
    /// unknown or does not permit `verb`.
    async fn get_resource_meta(
        &self,
        api_version: &str,
        kind: &str,
        verb: &str,
    ) -> Result<Option<ResourceMeta>, KubeUtilError>;
}

/// Rejects empty identity components before any request is made.
pub fn validate_request(api_version: &str, kind: &str) -> Result<(), KubeUtilError> {
    if api_version.trim().is_empty() {
        return Err(KubeUtilError::InvalidInput("apiVersion must not be empty".to_string()));
    }
    if kind.trim().is_empty() {
        return Err(KubeUtilError::InvalidInput("kind must not be empty".to_string()));
    }
    Ok(())
}

/// Splits an `apiVersion` into `(group, version)`. The core group is `""`.
#[must_use]
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Picks `kind` out of a discovery document, if present and permitting `verb`.
#[must_use]
pub fn find_resource_meta(
    list: &APIResourceList,
    api_version: &str,
    kind: &str,
    verb: &str,
) -> Option<ResourceMeta> {
    // Subresources ("foos/status") share the parent's kind.
    let resource = list
        .resources
        .iter()
        .find(|r| r.kind == kind && !r.name.contains('/'))?;

    if !resource.verbs.iter().any(|v| v == verb) {
        return None;
    }

    let (group, version) = split_api_version(api_version);
    let gvk = GroupVersionKind::gvk(group, version, &resource.kind);
    Some(ResourceMeta::new(
        ApiResource::from_gvk_with_plural(&gvk, &resource.name),
        resource.namespaced,
        resource.verbs.clone(),
    ))
}
