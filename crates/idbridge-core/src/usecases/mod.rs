//! Use cases orchestrating domain entities through port interfaces

pub mod reconcile;
pub mod test_connection;

pub use reconcile::{AttemptOutcome, ReconcileIdentityUseCase};
pub use test_connection::{ConnectionProbe, TestConnectionUseCase};
