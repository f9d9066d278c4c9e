//! IDBridge Sync - task orchestration
//!
//! The background job layer of the engine:
//! - [`task`] - typed queue entries and submission manifests
//! - [`orchestrator`] - bounded worker pool, per-ID mutual exclusion,
//!   backoff retries, sweep, and cancellation
//! - [`service`] - the admin-facing facade (submission, status, dashboard,
//!   connection test, operator actions)

pub mod orchestrator;
pub mod service;
pub mod task;

pub use orchestrator::{SweepReport, SyncOrchestrator};
pub use service::{DashboardSnapshot, StatusView, SyncService};
pub use task::{RejectReason, SubmissionManifest, SyncTask};
