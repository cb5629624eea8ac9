//! Free collateral, touched-market lists and the global balance sheet.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{Amount, MarketId};

/// Markets an account holds exposure in, with O(1) swap-remove.
#[derive(Debug, Clone, Default)]
pub struct TouchedMarkets {
    list: Vec<MarketId>,
    index: HashMap<MarketId, usize>,
}

impl TouchedMarkets {
    /// Returns false if the market was already present.
    pub fn insert(&mut self, market: MarketId) -> bool {
        if self.index.contains_key(&market) {
            return false;
        }
        self.index.insert(market, self.list.len());
        self.list.push(market);
        true
    }

    /// Swap-remove. Returns false if absent.
    pub fn remove(&mut self, market: MarketId) -> bool {
        let Some(position) = self.index.remove(&market) else {
            return false;
        };
        self.list.swap_remove(position);
        if let Some(moved) = self.list.get(position) {
            self.index.insert(*moved, position);
        }
        true
    }

    #[must_use]
    pub fn contains(&self, market: MarketId) -> bool {
        self.index.contains_key(&market)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<MarketId> {
        self.list.get(position).copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[MarketId] {
        &self.list
    }
}

/// Per-account state that is global across markets.
#[derive(Debug, Clone, Default)]
pub struct AccountBook {
    pub(crate) free_collateral: Amount,
    pub(crate) touched: TouchedMarkets,
}

impl AccountBook {
    #[must_use]
    pub const fn free_collateral(&self) -> Amount {
        self.free_collateral
    }

    #[must_use]
    pub const fn touched(&self) -> &TouchedMarkets {
        &self.touched
    }
}

/// Global aggregates.
///
/// `total_markets_value + total_free_collateral == total_value_locked` holds
/// after every operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BalanceSheet {
    market_value: BTreeMap<MarketId, Amount>,
    total_markets_value: Amount,
    total_free_collateral: Amount,
    total_value_locked: Amount,
}

impl BalanceSheet {
    #[must_use]
    pub fn market_value(&self, market: MarketId) -> Amount {
        self.market_value
            .get(&market)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub const fn total_markets_value(&self) -> Amount {
        self.total_markets_value
    }

    #[must_use]
    pub const fn total_free_collateral(&self) -> Amount {
        self.total_free_collateral
    }

    #[must_use]
    pub const fn total_value_locked(&self) -> Amount {
        self.total_value_locked
    }

    /// Whether the balance-sheet identity holds.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_markets_value + self.total_free_collateral == self.total_value_locked
            && self.market_value.values().copied().sum::<Amount>() == self.total_markets_value
    }

    /// New principal entering free collateral.
    pub(crate) fn record_deposit(&mut self, amount: Amount) {
        self.total_free_collateral += amount;
        self.total_value_locked += amount;
    }

    /// Principal leaving free collateral.
    pub(crate) fn record_withdrawal(&mut self, amount: Amount) {
        self.total_free_collateral -= amount;
        self.total_value_locked -= amount;
    }

    /// Fold a batch of capital movements in with one write per market.
    pub(crate) fn apply(&mut self, delta: &AggregateDelta) {
        for (market, change) in &delta.markets {
            if change.is_zero() {
                continue;
            }
            *self.market_value.entry(*market).or_default() += *change;
            self.total_markets_value += *change;
        }
        self.total_free_collateral += delta.free;
    }
}

/// Capital movements between free collateral and markets, batched so the
/// global aggregates are written once per operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateDelta {
    markets: BTreeMap<MarketId, Amount>,
    free: Amount,
}

impl AggregateDelta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Free collateral committed to `market`.
    pub fn allocate(&mut self, market: MarketId, amount: Amount) {
        *self.markets.entry(market).or_default() += amount;
        self.free -= amount;
    }

    /// Committed capital returned to free collateral.
    pub fn deallocate(&mut self, market: MarketId, amount: Amount) {
        *self.markets.entry(market).or_default() -= amount;
        self.free += amount;
    }

    /// Resolution payout leaving `market` for free collateral.
    pub fn pay_out(&mut self, market: MarketId, amount: Amount) {
        self.deallocate(market, amount);
    }

    /// Net change to `market`'s value.
    #[must_use]
    pub fn market(&self, market: MarketId) -> Amount {
        self.markets.get(&market).copied().unwrap_or(Decimal::ZERO)
    }

    /// Net change to total free collateral.
    #[must_use]
    pub const fn free(&self) -> Amount {
        self.free
    }
}
