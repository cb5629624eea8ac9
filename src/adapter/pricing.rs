//! Fixed-price engine with optional linear price impact.

use std::collections::HashMap;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::trace;

use crate::domain::{Amount, MarketId, OutcomeId, Side, TradeRequest};
use crate::error::PricingError;
use crate::port::PriceEngine;

/// Prices Back shares at a per-outcome price in `[0, 1]`; Lay shares at its
/// complement.
///
/// With a non-zero `impact`, every committed share moves the outcome's price
/// by `impact` in the direction of the trade.
#[derive(Debug)]
pub struct FixedPriceEngine {
    market: MarketId,
    impact: Decimal,
    prices: RwLock<HashMap<OutcomeId, Decimal>>,
}

impl FixedPriceEngine {
    #[must_use]
    pub fn new(market: MarketId, prices: impl IntoIterator<Item = (OutcomeId, Decimal)>) -> Self {
        Self {
            market,
            impact: Decimal::ZERO,
            prices: RwLock::new(prices.into_iter().collect()),
        }
    }

    /// Uniform prices `1 / outcomes` across `outcomes` outcomes.
    #[must_use]
    pub fn uniform(market: MarketId, outcomes: u32) -> Self {
        let price = if outcomes == 0 {
            Decimal::ZERO
        } else {
            Decimal::ONE / Decimal::from(outcomes)
        };
        Self::new(market, (0..outcomes).map(|i| (OutcomeId::new(i), price)))
    }

    #[must_use]
    pub fn with_impact(mut self, impact: Decimal) -> Self {
        self.impact = impact;
        self
    }

    /// Current Back price of `outcome`.
    #[must_use]
    pub fn price(&self, outcome: OutcomeId) -> Option<Decimal> {
        self.prices.read().get(&outcome).copied()
    }

    pub fn set_price(&self, outcome: OutcomeId, price: Decimal) {
        self.prices
            .write()
            .insert(outcome, price.clamp(Decimal::ZERO, Decimal::ONE));
    }
}

impl PriceEngine for FixedPriceEngine {
    fn quote(&self, trade: &TradeRequest) -> Result<Amount, PricingError> {
        if trade.market != self.market {
            return Err(PricingError::Failed(format!(
                "engine for {} asked to price {}",
                self.market, trade.market
            )));
        }
        let back = self.price(trade.outcome).ok_or(PricingError::NoPrice {
            market: trade.market,
            outcome: trade.outcome,
        })?;
        let unit = match trade.side {
            Side::Back => back,
            Side::Lay => Decimal::ONE - back,
        };
        Ok(unit * trade.size)
    }

    fn commit(&self, trade: &TradeRequest, cost: Amount) {
        if self.impact.is_zero() {
            return;
        }
        // Buying Back or selling Lay both make the outcome more likely.
        let bullish = trade.side.is_back() == trade.direction.is_buy();
        let shift = self.impact * trade.size;
        let mut prices = self.prices.write();
        if let Some(price) = prices.get_mut(&trade.outcome) {
            let moved = if bullish { *price + shift } else { *price - shift };
            *price = moved.clamp(Decimal::ZERO, Decimal::ONE);
            trace!(outcome = %trade.outcome, price = %price, cost = %cost, "Price moved");
        }
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
