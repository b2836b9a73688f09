//! Startup driver.
//!
//! Connects to the cluster, resolves the watched kind, and starts the event
//! handler. Startup moves through `Initializing -> Watching` or ends in an
//! error exit; every failure is logged once and absorbed, so the worst
//! outcome is a process with no watch that exits on its own.

use crate::config::{ControllerConfig, CONTROLLER_KIND};
use crate::error::ControllerError;
use kube_util::{
    ClientProvider, ClusterClient, EventHandler, EventHandlerParams, ReconcileFactory, WATCH_VERB,
};
use std::sync::Arc;
use tracing::{error, info, info_span, Span};

/// Outcome of one startup attempt.
#[derive(Debug)]
pub enum Startup {
    /// The event handler is live and owns the watch
    Watching(EventHandler),
    /// No watch was established
    ErrorExit(ControllerError),
}

/// Span tagging every log line with the controller name.
pub fn controller_span() -> Span {
    info_span!("controller", name = CONTROLLER_KIND)
}

/// Resolves the configured kind and starts watching it.
///
/// Does not wait on the watch: once the handler is returned, the
/// supervision task runs on its own.
pub async fn create_event_handler(
    kc: Arc<dyn ClusterClient>,
    config: &ControllerConfig,
    factory: Arc<dyn ReconcileFactory>,
) -> Result<EventHandler, ControllerError> {
    let identity = &config.identity;
    info!("Starting EventHandler for {}", identity);

    let resource_meta = kc
        .get_resource_meta(&identity.api_version(), identity.kind(), WATCH_VERB)
        .await
        .map_err(ControllerError::Discovery)?
        .ok_or_else(|| ControllerError::ResourceNotWatchable(identity.to_string()))?;

    let params = EventHandlerParams {
        resource_meta,
        factory,
        client: kc,
        span: Span::current(),
        watch_config: config.watch,
    };

    EventHandler::start(params)
        .await
        .map_err(ControllerError::WatchEstablishment)
}

/// Runs one startup attempt.
///
/// Client construction and metadata resolution are awaited in order;
/// resolution never starts without a client.
pub async fn run(
    provider: &dyn ClientProvider,
    config: &ControllerConfig,
    factory: Arc<dyn ReconcileFactory>,
) -> Startup {
    info!("Running {}Controller.", config.identity.kind());

    let kc = match provider.connect().await {
        Ok(kc) => kc,
        Err(e) => {
            let err = ControllerError::ClientConstruction(e);
            error!("{}", err);
            return Startup::ErrorExit(err);
        }
    };

    match create_event_handler(kc, config, factory).await {
        Ok(handler) => {
            info!("EventHandler running for {}", config.identity);
            Startup::Watching(handler)
        }
        Err(err) => {
            error!("{}", err);
            Startup::ErrorExit(err)
        }
    }
}
