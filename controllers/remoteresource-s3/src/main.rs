//! RemoteResourceS3 Controller
//!
//! Watches `RemoteResourceS3` custom resources and hands every observed
//! change to the reconciler.
//!
//! Startup failures (no cluster access, CRD not installed, watch forbidden)
//! are logged and the process exits normally; restarting is left to the
//! pod's restart policy.

mod bootstrap;
mod config;
mod error;
mod lifecycle;
mod reconciler;
#[cfg(test)]
mod test_utils;

use crate::bootstrap::Startup;
use crate::config::ControllerConfig;
use crate::lifecycle::ProcessObserver;
use crate::reconciler::RemoteResourceS3Controller;
use kube_util::DefaultClientProvider;
use std::sync::Arc;
use tracing::{debug, info, Instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube's rustls transport needs a process-wide crypto provider
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    let span = bootstrap::controller_span();
    let observer = span.in_scope(ProcessObserver::install);
    let config = span.in_scope(ControllerConfig::from_env);

    span.in_scope(|| {
        info!("Configuration:");
        info!("  Resource: {}", config.identity);
        info!("  Watch timeout: {}s", config.watch.timeout_seconds);
        info!("  Signal observer: {}", observer.observes_signals());
    });

    let factory = Arc::new(RemoteResourceS3Controller::new());
    let startup = bootstrap::run(&DefaultClientProvider, &config, factory)
        .instrument(span.clone())
        .await;

    match startup {
        // The supervision task runs for the life of the process
        Startup::Watching(handler) => {
            if let Err(e) = handler.join().await {
                span.in_scope(|| observer.on_unhandled_failure(&e));
            }
        }
        Startup::ErrorExit(e) => {
            span.in_scope(|| debug!("Startup ended without a watch: {:?}", e));
        }
    }

    span.in_scope(|| observer.on_natural_exit(0));
}
