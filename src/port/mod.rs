//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! The ledger itself performs no I/O. Pricing, market resolution and the
//! custody of principal sit behind these traits so the exchange layer can
//! be wired to real systems or to the in-memory adapters in
//! [`crate::adapter`].
//!
//! # Available Ports
//!
//! - [`PriceEngine`] - Quotes and commits AMM trades per market
//! - [`Oracle`] - Reports the winning outcome of resolving markets
//! - [`Custody`] - Holds the principal backing free collateral

mod custody;
mod oracle;
mod pricing;

pub use custody::Custody;
pub use oracle::{Oracle, Resolution};
pub use pricing::PriceEngine;
