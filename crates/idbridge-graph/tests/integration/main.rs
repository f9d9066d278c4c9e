//! Integration test root for the directory adapter
//!
//! Tests run against a wiremock-based mock of the directory API; no real
//! network access is required.

mod common;
mod test_auth;
mod test_users;
