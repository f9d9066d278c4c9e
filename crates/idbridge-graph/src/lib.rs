//! IDBridge Graph - Directory API adapter
//!
//! Implements the core's directory and token ports against a
//! Microsoft-Graph-style user directory:
//! - [`auth`] - client-credential token provider with cached refresh
//! - [`client`] - typed user client with uniform error classification
//! - [`rate_limit`] - shared token-bucket request limiter

pub mod auth;
pub mod client;
pub mod rate_limit;

pub use auth::{ClientCredentialTokenProvider, StaticTokenProvider};
pub use client::GraphDirectoryProvider;
pub use rate_limit::RequestLimiter;
