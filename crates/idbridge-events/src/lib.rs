//! IDBridge Events - alerting collaborator adapter
//!
//! Implements the core's [`ISyncEventSink`](idbridge_core::ports::ISyncEventSink)
//! port with a bounded, non-blocking channel. Terminal sync transitions are
//! delivered to an external consumer or, by default, to structured tracing
//! output; delivery failures are dropped, never propagated.

pub mod publisher;

pub use publisher::EventPublisher;
