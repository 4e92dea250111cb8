// External crates
use tokio::{signal, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Process-wide interrupt handling, built on-top of a cancellation token
///
/// - The token is cloned into every in-flight RPC and stream drain.
/// - A single background task waits for Ctrl+C and cancels the token.
/// - Nothing else ever cancels it except `trigger()`.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token handed to the command being executed
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel every operation observing this token
    #[instrument(name = "backupctl_shutdown_trigger", target = "helpers::shutdown", level = "trace", skip_all)]
    pub fn trigger(&self) {
        tracing::trace!("Shutdown triggered, cancelling in-flight calls");
        self.token.cancel();
    }

    /// Spawn the interrupt listener. The task ends on its own once the token is
    /// cancelled, so dropping the handle at the end of a run is fine.
    pub fn spawn_interrupt_listener(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                res = signal::ctrl_c() => {
                    match res {
                        Ok(()) => {
                            tracing::warn!("Interrupt received, cancelling current command");
                            shutdown.trigger();
                        }
                        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
                    }
                }
                _ = shutdown.token.cancelled() => {}
            }
        })
    }
}
