//! IDBridge Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `IdentityRecord`, `SyncStatus`, `SyncOperation`,
//!   validated newtypes, and the error taxonomy
//! - **Field mapper** - local record → directory payload translation with
//!   pre-flight validation
//! - **Use cases** - `ReconcileIdentityUseCase`, `TestConnectionUseCase`
//! - **Port definitions** - Traits for adapters: `IDirectoryProvider`,
//!   `ITokenProvider`, `IIdentityStore`, `ISyncEventSink`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O dependencies.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod mapper;
pub mod ports;
pub mod usecases;
