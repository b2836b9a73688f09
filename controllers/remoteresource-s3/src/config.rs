//! Environment-sourced configuration.

use kube_util::{ResourceIdentity, WatchConfig, DEFAULT_WATCH_TIMEOUT_SECONDS};
use std::env;
use tracing::warn;

/// Kind reconciled by this controller.
pub const CONTROLLER_KIND: &str = "RemoteResourceS3";

/// Default API group of the watched kind.
pub const DEFAULT_GROUP: &str = "deploy.razee.io";

/// Default API version of the watched kind.
pub const DEFAULT_VERSION: &str = "v1alpha2";

/// Controller configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Watched resource type
    pub identity: ResourceIdentity,
    /// Watch connection settings
    pub watch: WatchConfig,
}

impl ControllerConfig {
    /// Loads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`.
    ///
    /// Unset and empty variables take their defaults. A timeout that is not a
    /// non-negative integer is reported and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let group = var("GROUP").unwrap_or_else(|| DEFAULT_GROUP.to_string());
        let version = var("VERSION").unwrap_or_else(|| DEFAULT_VERSION.to_string());

        let timeout_seconds = match var("CRD_WATCH_TIMEOUT_SECONDS") {
            None => DEFAULT_WATCH_TIMEOUT_SECONDS,
            Some(raw) => raw.trim().parse::<u32>().unwrap_or_else(|e| {
                warn!(
                    "Ignoring CRD_WATCH_TIMEOUT_SECONDS={:?} ({}), using {}s",
                    raw, e, DEFAULT_WATCH_TIMEOUT_SECONDS
                );
                DEFAULT_WATCH_TIMEOUT_SECONDS
            }),
        };

        Self {
            identity: ResourceIdentity::new(group, version, CONTROLLER_KIND),
            watch: WatchConfig {
                timeout_seconds,
                liveness_interval: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ControllerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ControllerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.identity.api_version(), "deploy.razee.io/v1alpha2");
        assert_eq!(config.identity.kind(), "RemoteResourceS3");
        assert_eq!(config.watch.timeout_seconds, 300);
        assert!(config.watch.liveness_interval);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GROUP", "kapitan.razee.io"),
            ("VERSION", "v1beta1"),
            ("CRD_WATCH_TIMEOUT_SECONDS", "120"),
        ]);
        assert_eq!(config.identity.api_version(), "kapitan.razee.io/v1beta1");
        assert_eq!(config.watch.timeout_seconds, 120);
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = config_from(&[("GROUP", ""), ("VERSION", "  "), ("CRD_WATCH_TIMEOUT_SECONDS", "")]);
        assert_eq!(config.identity.api_version(), "deploy.razee.io/v1alpha2");
        assert_eq!(config.watch.timeout_seconds, 300);
    }

    #[test]
    fn test_invalid_timeout_uses_default() {
        assert_eq!(config_from(&[("CRD_WATCH_TIMEOUT_SECONDS", "five minutes")]).watch.timeout_seconds, 300);
        assert_eq!(config_from(&[("CRD_WATCH_TIMEOUT_SECONDS", "-1")]).watch.timeout_seconds, 300);
    }

    #[test]
    fn test_zero_timeout_is_kept() {
        assert_eq!(config_from(&[("CRD_WATCH_TIMEOUT_SECONDS", "0")]).watch.timeout_seconds, 0);
    }
}
