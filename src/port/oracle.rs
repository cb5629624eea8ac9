//! Oracle port for market resolution.

use crate::domain::{MarketId, OutcomeId};
use crate::error::OracleError;

/// What the oracle currently says about a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Pending,
    Resolved(OutcomeId),
}

/// Source of truth for resolving markets.
pub trait Oracle: Send + Sync {
    /// Look up `market` using the oracle parameters it was created with.
    ///
    /// # Errors
    ///
    /// Returns `OracleError` if the feed is unknown.
    fn resolution(&self, market: MarketId, params: &str) -> Result<Resolution, OracleError>;
}
