//! Configuration module for IDBridge.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and defaults. The settings are injected
//! into the token provider, directory client, and orchestrator at
//! construction; nothing reads ambient global state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for IDBridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub directory: DirectorySettings,
    pub sync: SyncSettings,
    pub logging: LoggingSettings,
}

/// Directory API connection and credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Directory tenant ID.
    pub tenant_id: String,
    /// Application (client) ID registered with the directory.
    pub client_id: String,
    /// Client secret for the credential exchange.
    pub client_secret: String,
    /// Identity platform authority URL.
    pub authority: String,
    /// Directory API base URL.
    pub base_url: String,
    /// OAuth scope requested with the client-credential grant.
    pub scope: String,
    /// Per-call timeout in seconds for directory API requests.
    pub request_timeout_secs: u64,
    /// Token-bucket burst capacity for outbound requests.
    pub rate_limit_burst: u32,
    /// Token-bucket refill rate (requests per second).
    pub rate_limit_per_sec: f64,
}

/// Orchestration and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Number of worker tasks consuming the sync queue.
    pub workers: usize,
    /// Capacity of the sync queue; submissions beyond it are rejected.
    pub queue_capacity: usize,
    /// Total attempts per task before a transient failure becomes terminal.
    pub max_attempts: u32,
    /// Backoff delays in seconds between attempts (indexed by attempt).
    pub backoff_secs: Vec<u64>,
    /// Length of generated temporary passwords.
    pub temp_password_length: usize,
    /// Minimum age in seconds before the sweep re-admits a failed/pending
    /// record.
    pub sweep_min_age_secs: u64,
    /// Age in seconds after which a stuck `in_progress` record is reaped
    /// to `failed`.
    pub stale_in_progress_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Settings {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Try to load from `path`; fall back to [`Settings::default`] on any
    /// error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/idbridge/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("idbridge")
            .join("config.yaml")
    }
}

impl DirectorySettings {
    /// Returns true if the credential triple is present.
    pub fn is_configured(&self) -> bool {
        !self.tenant_id.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Full token endpoint URL for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Per-call request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SyncSettings {
    /// Backoff delay before retry attempt `attempt + 1` (0-based attempt
    /// index). Falls back to the last configured delay when the schedule
    /// is shorter than the budget.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let secs = self
            .backoff_secs
            .get(attempt as usize)
            .or_else(|| self.backoff_secs.last())
            .copied()
            .unwrap_or(30);
        Duration::from_secs(secs)
    }
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            authority: "https://login.microsoftonline.com".to_string(),
            base_url: "https://graph.microsoft.com/v1.0".to_string(),
            scope: "https://graph.microsoft.com/.default".to_string(),
            request_timeout_secs: 30,
            rate_limit_burst: 10,
            rate_limit_per_sec: 5.0,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
            max_attempts: 3,
            backoff_secs: vec![30, 120, 600],
            temp_password_length: 12,
            sweep_min_age_secs: 30,
            stale_in_progress_secs: 3600,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
