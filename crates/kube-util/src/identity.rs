//! Identity of the custom resource type a controller watches.

use std::fmt;

/// Group, version and kind of the watched custom resource.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    group: String,
    version: String,
    kind: String,
}

impl ResourceIdentity {
    /// Creates a new identity.
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Resource kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The `apiVersion` string: `group/version`, or `version` for the core group.
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.api_version(), self.kind)
    }
}
