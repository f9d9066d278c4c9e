//! EventPublisher - non-blocking sync event delivery
//!
//! Bridges the engine's [`ISyncEventSink`] port to the alerting
//! collaborator through a bounded channel. Publishing never blocks and
//! never fails the sync operation that produced the event: when the buffer
//! is full or the consumer is gone, the event is dropped with a
//! `tracing::warn!` line.

use tokio::sync::mpsc;
use tracing::{info, warn};

use idbridge_core::ports::{ISyncEventSink, SyncEvent, SyncEventKind};

/// Default buffer size for the event channel
const DEFAULT_CAPACITY: usize = 256;

/// Non-blocking publisher for terminal sync events
pub struct EventPublisher {
    tx: mpsc::Sender<SyncEvent>,
}

impl EventPublisher {
    /// Creates a publisher and the receiving half for an external consumer
    ///
    /// The consumer drains events at its own pace; a slow consumer costs
    /// dropped events, never blocked syncs.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Creates a publisher whose consumer logs each event via `tracing`
    ///
    /// This is the default collaborator wiring when no external alerting
    /// channel is attached; the spawned task ends when the publisher is
    /// dropped.
    pub fn tracing_sink() -> Self {
        let (publisher, mut rx) = Self::channel(DEFAULT_CAPACITY);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event.event_type {
                    SyncEventKind::SyncSuccess => info!(
                        local_id = %event.local_id,
                        remote_id = event.remote_id.as_ref().map(|r| r.as_str()),
                        timestamp = %event.timestamp,
                        "sync_success"
                    ),
                    SyncEventKind::SyncFailure => warn!(
                        local_id = %event.local_id,
                        error = event.error.as_deref().unwrap_or(""),
                        timestamp = %event.timestamp,
                        "sync_failure"
                    ),
                }
            }
        });

        publisher
    }
}

impl ISyncEventSink for EventPublisher {
    fn publish(&self, event: SyncEvent) {
        if let Err(e) = self.tx.try_send(event) {
            // Delivery failure must never surface to the sync path
            warn!(error = %e, "Dropping sync event: channel full or closed");
        }
    }
}
