//! Exchange services built on the ledger and the ports.
//!
//! - [`exchange`] - Deposits, withdrawals, AMM trades, intents, resolution
//! - [`shared`] - Thread-safe handle serializing access to one exchange

pub mod exchange;
pub mod shared;

pub use exchange::Exchange;
pub use shared::SharedExchange;
