//! Process lifecycle observer.
//!
//! Observes termination signals, unhandled failures and the natural end of
//! the process, and logs them. It never changes control flow: SIGTERM is
//! logged and otherwise ignored, so the pod is stopped by the kubelet's
//! kill after the grace period.

use std::fmt::Display;
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument, Span};

/// Process-wide observer, installed once at startup.
#[derive(Debug)]
pub struct ProcessObserver {
    signal_listener: Option<JoinHandle<()>>,
}

impl ProcessObserver {
    /// Installs the SIGTERM listener and the panic hook.
    ///
    /// Must be called from within the Tokio runtime.
    #[must_use]
    pub fn install() -> Self {
        install_panic_hook();
        Self {
            signal_listener: spawn_sigterm_listener(),
        }
    }

    /// Whether a SIGTERM listener is active.
    #[must_use]
    pub fn observes_signals(&self) -> bool {
        self.signal_listener.is_some()
    }

    /// Logs a failure nothing else handled.
    pub fn on_unhandled_failure(&self, failure: &dyn Display) {
        log_unhandled_failure(failure);
    }

    /// Logs the process running out of work.
    pub fn on_natural_exit(&self, code: i32) {
        info!("No work found. exiting with code: {}", code);
    }
}

fn log_termination_signal() {
    info!("received SIGTERM. not handling at this time.");
}

fn log_unhandled_failure(failure: &dyn Display) {
    error!("received unhandled failure: {}", failure);
}

fn install_panic_hook() {
    let span = Span::current();
    std::panic::set_hook(Box::new(move |panic| {
        span.in_scope(|| log_unhandled_failure(panic));
    }));
}

#[cfg(unix)]
fn spawn_sigterm_listener() -> Option<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            let listener = async move {
                while sigterm.recv().await.is_some() {
                    log_termination_signal();
                }
            };
            Some(tokio::spawn(listener.instrument(Span::current())))
        }
        Err(e) => {
            warn!("Failed to install SIGTERM listener: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn spawn_sigterm_listener() -> Option<JoinHandle<()>> {
    None
}
