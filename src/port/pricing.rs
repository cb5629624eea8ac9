//! Price engine port.

use crate::domain::{Amount, TradeRequest};
use crate::error::PricingError;

/// Prices trades against a market's designated maker.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - `quote` must not change pricing state; the exchange may discard it
/// - `commit` is called only after the ledger settled the quoted trade
pub trait PriceEngine: Send + Sync {
    /// Cash paid by the buying side for `trade`.
    ///
    /// # Errors
    ///
    /// Returns `PricingError` if the trade cannot be priced.
    fn quote(&self, trade: &TradeRequest) -> Result<Amount, PricingError>;

    /// Fold a settled trade into the pricing state.
    fn commit(&self, trade: &TradeRequest, cost: Amount);

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
