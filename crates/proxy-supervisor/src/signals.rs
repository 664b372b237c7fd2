//! OS termination signals mapped to shutdown requests.

use proxy_common::{Error, Result};
use tracing::info;

/// Registered SIGINT/SIGTERM listeners (Ctrl-C on Windows).
///
/// Registration happens eagerly in [`register`](Self::register) so that a
/// signal arriving right after startup is never lost.
pub struct ShutdownSignals {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
}

impl std::fmt::Debug for ShutdownSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignals").finish_non_exhaustive()
    }
}

impl ShutdownSignals {
    /// Install the handlers. Must be called from within a Tokio runtime.
    pub fn register() -> Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let sigterm = signal(SignalKind::terminate())
                .map_err(|e| Error::signal(format!("Failed to create SIGTERM handler: {}", e)))?;
            let sigint = signal(SignalKind::interrupt())
                .map_err(|e| Error::signal(format!("Failed to create SIGINT handler: {}", e)))?;

            Ok(Self { sigterm, sigint })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next termination signal and return its name.
    ///
    /// Returns `None` once the signal streams are closed.
    pub async fn recv(&mut self) -> Option<&'static str> {
        #[cfg(unix)]
        {
            let name = tokio::select! {
                received = self.sigterm.recv() => received.map(|_| "SIGTERM"),
                received = self.sigint.recv() => received.map(|_| "SIGINT"),
            };
            if let Some(name) = name {
                info!("Received {} signal", name);
            }
            name
        }

        #[cfg(not(unix))]
        {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C signal");
                    Some("CTRL_C")
                }
                Err(_) => None,
            }
        }
    }
}
