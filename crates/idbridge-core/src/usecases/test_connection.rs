//! Connection test use case
//!
//! Probes the directory API with the configured credentials and reports a
//! human-readable result. Used by the admin surface before enabling sync
//! and after credential changes.

use std::sync::Arc;

use tracing::{info, warn};

use crate::ports::IDirectoryProvider;

/// Result of a connectivity probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProbe {
    /// Whether the probe succeeded
    pub ok: bool,
    /// Human-readable detail: organization info on success, the classified
    /// error on failure
    pub detail: String,
}

/// Use case probing directory connectivity and credentials
pub struct TestConnectionUseCase {
    directory: Arc<dyn IDirectoryProvider>,
}

impl TestConnectionUseCase {
    /// Creates the use case with its directory dependency
    pub fn new(directory: Arc<dyn IDirectoryProvider>) -> Self {
        Self { directory }
    }

    /// Runs the probe
    pub async fn execute(&self) -> ConnectionProbe {
        match self.directory.test_connection().await {
            Ok(detail) => {
                info!(%detail, "Directory connection test succeeded");
                ConnectionProbe { ok: true, detail }
            }
            Err(e) => {
                warn!(error = %e, "Directory connection test failed");
                ConnectionProbe {
                    ok: false,
                    detail: e.to_string(),
                }
            }
        }
    }
}
