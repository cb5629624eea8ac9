//! Fill state of signed intents.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::{AccountId, Amount, Intent, IntentId, IntentState, LedgerEvent};
use crate::error::LedgerError;

use super::settlement::{SettlementReceipt, SettlementRequest};
use super::{check_outcome, Ledger};

#[derive(Debug, Clone)]
struct Entry {
    intent: Intent,
    state: IntentState,
}

/// Submitted intents keyed by id.
#[derive(Debug, Clone, Default)]
pub struct IntentBook {
    entries: HashMap<IntentId, Entry>,
}

impl IntentBook {
    #[must_use]
    pub fn get(&self, id: &IntentId) -> Option<(&Intent, &IntentState)> {
        self.entries
            .get(id)
            .map(|entry| (&entry.intent, &entry.state))
    }

    #[must_use]
    pub fn contains(&self, id: &IntentId) -> bool {
        self.entries.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Intents that are neither cancelled nor fully filled.
    pub fn open(&self) -> impl Iterator<Item = &Intent> {
        self.entries
            .values()
            .filter(|entry| {
                !entry.state.is_cancelled() && entry.state.remaining(entry.intent.size) > Decimal::ZERO
            })
            .map(|entry| &entry.intent)
    }
}

impl Ledger {
    #[must_use]
    pub const fn intents(&self) -> &IntentBook {
        &self.intents
    }

    /// Register an intent for later fills. No capital is reserved.
    ///
    /// # Errors
    ///
    /// Returns an error for a duplicate id, invalid size or price, or an
    /// unknown, resolved or outcome-less market.
    pub fn submit_intent(&mut self, intent: Intent) -> Result<IntentId, LedgerError> {
        intent.validate()?;
        check_outcome(self.open_market(intent.market)?, intent.outcome)?;
        if self.intents.contains(&intent.id) {
            return Err(LedgerError::DuplicateIntent {
                intent: intent.id.clone(),
            });
        }
        let id = intent.id.clone();
        debug!(
            intent = %id,
            maker = %intent.maker,
            market = %intent.market,
            size = %intent.size,
            price = %intent.price,
            "Intent submitted"
        );
        self.intents.entries.insert(
            id.clone(),
            Entry {
                intent,
                state: IntentState::default(),
            },
        );
        Ok(id)
    }

    /// Cancel an intent. Only its maker may, and only once.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIntent`, `NotIntentMaker` or `IntentCancelled`.
    pub fn cancel_intent(&mut self, id: &IntentId, account: &AccountId) -> Result<(), LedgerError> {
        let entry = self
            .intents
            .entries
            .get_mut(id)
            .ok_or_else(|| LedgerError::UnknownIntent { intent: id.clone() })?;
        if &entry.intent.maker != account {
            return Err(LedgerError::NotIntentMaker { intent: id.clone() });
        }
        if !entry.state.cancel() {
            return Err(LedgerError::IntentCancelled { intent: id.clone() });
        }
        info!(intent = %id, "Intent cancelled");
        self.emit(LedgerEvent::IntentCancelled { intent: id.clone() });
        Ok(())
    }

    /// Fill `size` of an intent against `taker` at the intent's price.
    ///
    /// # Errors
    ///
    /// Returns an error if the intent is unknown, cancelled, expired or
    /// would be overfilled, or if the settlement itself is rejected. The
    /// fill is recorded only when settlement succeeds.
    pub fn fill_intent(
        &mut self,
        id: &IntentId,
        taker: &AccountId,
        size: Amount,
        now: DateTime<Utc>,
    ) -> Result<SettlementReceipt, LedgerError> {
        let (intent, state) = self
            .intents
            .get(id)
            .ok_or_else(|| LedgerError::UnknownIntent { intent: id.clone() })?;
        if state.is_cancelled() {
            return Err(LedgerError::IntentCancelled { intent: id.clone() });
        }
        if intent.is_expired(now) {
            return Err(LedgerError::IntentExpired { intent: id.clone() });
        }
        if size <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount { amount: size });
        }
        let remaining = state.remaining(intent.size);
        if size > remaining {
            return Err(LedgerError::IntentOverfill {
                intent: id.clone(),
                remaining,
                requested: size,
            });
        }

        let (buyer, seller) = if intent.direction.is_buy() {
            (intent.maker.clone(), taker.clone())
        } else {
            (taker.clone(), intent.maker.clone())
        };
        let request = SettlementRequest {
            market: intent.market,
            outcome: intent.outcome,
            side: intent.side,
            size,
            seller,
            buyer,
            cost: intent.cost_of(size),
        };

        let receipt = self.settle(&request)?;
        if let Some(entry) = self.intents.entries.get_mut(id) {
            entry.state.record_fill(size);
        }
        self.emit(LedgerEvent::IntentFilled {
            intent: id.clone(),
            taker: taker.clone(),
            size,
        });
        Ok(receipt)
    }
}
