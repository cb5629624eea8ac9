//! Signed off-chain order types.
//!
//! Signature checking happens in the signing front end; the ledger only sees
//! the decoded [`Intent`] and tracks its [`IntentState`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{AccountId, IntentId, MarketId, OutcomeId};
use super::money::Amount;
use super::trade::{Direction, Side};

/// An order signed by `maker`, fillable by any taker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub id: IntentId,
    pub maker: AccountId,
    pub market: MarketId,
    pub outcome: OutcomeId,
    pub side: Side,
    /// Direction from the maker's point of view.
    pub direction: Direction,
    /// Maximum shares fillable in total.
    pub size: Amount,
    /// Price per share paid by the buying side.
    pub price: Amount,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Intent {
    /// Check that size and price are usable.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` for a non-positive size or a negative price.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.size <= Decimal::ZERO {
            return Err(DomainError::NonPositiveAmount { amount: self.size });
        }
        if self.price < Decimal::ZERO {
            return Err(DomainError::NegativePrice { price: self.price });
        }
        Ok(())
    }

    /// Whether the intent has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| now >= expiry)
    }

    /// Cash paid for `size` shares.
    #[must_use]
    pub fn cost_of(&self, size: Amount) -> Amount {
        self.price * size
    }
}

/// Fill progress of an intent: monotone fill, one-shot cancel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentState {
    filled: Amount,
    cancelled: bool,
}

impl IntentState {
    /// Cumulative filled size.
    #[must_use]
    pub const fn filled(&self) -> Amount {
        self.filled
    }

    /// Whether the intent was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Size still fillable out of `total`.
    #[must_use]
    pub fn remaining(&self, total: Amount) -> Amount {
        (total - self.filled).max(Decimal::ZERO)
    }

    pub(crate) fn record_fill(&mut self, size: Amount) {
        self.filled += size;
    }

    /// Returns false if the intent was already cancelled.
    pub(crate) fn cancel(&mut self) -> bool {
        !std::mem::replace(&mut self.cancelled, true)
    }
}
