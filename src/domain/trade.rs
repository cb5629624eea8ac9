//! Trade direction types shared by settlement and pricing.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{MarketId, OutcomeId};
use super::money::Amount;

/// Which exposure a position transfer moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Direct exposure to one outcome.
    Back,
    /// Exposure to every other outcome.
    Lay,
}

impl Side {
    /// Returns true for Back exposure.
    #[must_use]
    pub const fn is_back(self) -> bool {
        matches!(self, Self::Back)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Back => write!(f, "back"),
            Self::Lay => write!(f, "lay"),
        }
    }
}

/// Whether the account acquires or disposes of exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The account receives the position and pays the quote.
    Buy,
    /// The account hands over the position and receives the quote.
    Sell,
}

impl Direction {
    /// Returns true when buying.
    #[must_use]
    pub const fn is_buy(self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// A trade as presented to the price engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub market: MarketId,
    pub outcome: OutcomeId,
    pub side: Side,
    pub direction: Direction,
    /// Shares to move.
    pub size: Amount,
}

impl TradeRequest {
    #[must_use]
    pub const fn new(
        market: MarketId,
        outcome: OutcomeId,
        side: Side,
        direction: Direction,
        size: Amount,
    ) -> Self {
        Self {
            market,
            outcome,
            side,
            direction,
            size,
        }
    }
}
