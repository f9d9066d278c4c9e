//! Port definitions (trait interfaces for adapters)
//!
//! Ports follow the hexagonal pattern: the core depends on these traits,
//! adapter crates implement them. The directory port carries the typed
//! error taxonomy; storage and eventing use adapter-level error handling.

pub mod directory;
pub mod events;
pub mod store;
pub mod token;

pub use directory::IDirectoryProvider;
pub use events::{ISyncEventSink, SyncEvent, SyncEventKind};
pub use store::{FailureEntry, IIdentityStore};
pub use token::{AccessToken, ITokenProvider};
