//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Builders for accounts, markets and intents
//! - [`config`] - Canonical ledger settings for tests
//! - [`exchange`] - An [`Exchange`](crate::application::Exchange) wired to
//!   in-memory adapters, with handles to drive them

pub mod config;
pub mod domain;
pub mod exchange;
