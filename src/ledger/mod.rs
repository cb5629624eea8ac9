//! Exposure and capital ledger.
//!
//! [`Ledger`] is the explicit state container for every account, market and
//! global aggregate. Operations take `&mut self` and either commit fully or
//! return a [`LedgerError`] having changed nothing.
//!
//! # Modules
//!
//! - [`block`] / [`heap`] / [`index`] - Block-grouped 4-ary extremum heaps
//! - [`exposure`] - Tilt store for one (account, market)
//! - [`solvency`] - Worst/best-case views and capital allocation
//! - [`settlement`] - Position transfer and atomic settlement
//! - [`claims`] - Resolution payouts
//! - [`intent`] - Signed order fill state
//! - [`capital`] - Free collateral and the global balance sheet

pub mod block;
pub mod capital;
pub mod claims;
pub mod exposure;
pub mod heap;
pub mod index;
pub mod intent;
pub mod settlement;
pub mod solvency;

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::{
    AccountId, Amount, ClaimSource, LedgerEvent, Market, MarketId, MarketParams, OutcomeId,
};
use crate::error::LedgerError;

pub use block::{BlockExtremum, HeapKind};
pub use capital::{AccountBook, AggregateDelta, BalanceSheet, TouchedMarkets};
pub use claims::ClaimPlan;
pub use exposure::Exposure;
pub use index::{ExtremumIndex, TiltExtremum};
pub use intent::IntentBook;
pub use settlement::{ParticipantSettlement, SettlementReceipt, SettlementRequest};
pub use solvency::{CapitalMove, SolvencySnapshot};

/// Default number of outcomes per block.
pub const DEFAULT_BLOCK_SIZE: u32 = 16;

/// Work bounds for lazy claim processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimBudget {
    /// Touched markets inspected per pass.
    pub scan: usize,
    /// Claims settled per pass.
    pub claims: usize,
    /// Passes made by the hard path.
    pub hard_passes: usize,
}

impl Default for ClaimBudget {
    fn default() -> Self {
        Self {
            scan: 8,
            claims: 4,
            hard_passes: 4,
        }
    }
}

/// Ledger tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub block_size: u32,
    pub claims: ClaimBudget,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            claims: ClaimBudget::default(),
        }
    }
}

/// Every account, market and aggregate tracked by the exchange.
#[derive(Debug, Default)]
pub struct Ledger {
    settings: LedgerSettings,
    markets: BTreeMap<MarketId, Market>,
    next_market: u64,
    exposures: HashMap<(AccountId, MarketId), Exposure>,
    accounts: HashMap<AccountId, AccountBook>,
    sheet: BalanceSheet,
    intents: IntentBook,
    events: Vec<LedgerEvent>,
}

impl Ledger {
    #[must_use]
    pub fn new(settings: LedgerSettings) -> Self {
        Self {
            settings,
            next_market: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // ---------------------------------------------------------------------
    // Markets
    // ---------------------------------------------------------------------

    /// Register a market and return its id.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Domain` if the parameters are invalid.
    pub fn create_market(&mut self, params: MarketParams) -> Result<MarketId, LedgerError> {
        let id = MarketId::new(self.next_market.max(1));
        let market = Market::try_new(id, params)?;
        info!(
            market = %id,
            outcomes = market.outcome_count(),
            resolving = market.does_resolve(),
            expanding = market.is_expanding(),
            synthetic = %market.params().synthetic_collateral,
            "Market created"
        );
        self.emit(LedgerEvent::MarketCreated {
            market: id,
            outcomes: market.outcome_count(),
        });
        self.markets.insert(id, market);
        self.next_market = id.value() + 1;
        Ok(id)
    }

    /// Grow an expanding market's outcome set by one.
    ///
    /// Only expanding markets fold the zero reserve into every account's
    /// extremum, so only they can grow without moving anyone's worst case.
    ///
    /// # Errors
    ///
    /// Returns an error if the market is unknown, resolved or not expanding.
    pub fn add_outcome(&mut self, market: MarketId) -> Result<OutcomeId, LedgerError> {
        if !self.open_market(market)?.is_expanding() {
            return Err(LedgerError::MarketNotExpanding { market });
        }
        let outcome = self
            .markets
            .get_mut(&market)
            .map(Market::add_outcome)
            .ok_or(LedgerError::UnknownMarket { market })?;
        debug!(market = %market, outcome = %outcome, "Outcome added");
        self.emit(LedgerEvent::OutcomeAdded { market, outcome });
        Ok(outcome)
    }

    /// Record the oracle's winning outcome. Irreversible.
    ///
    /// # Errors
    ///
    /// Returns an error if the market is unknown, does not resolve, is
    /// already resolved, or lacks the outcome.
    pub fn resolve_market(
        &mut self,
        market: MarketId,
        winning: OutcomeId,
    ) -> Result<(), LedgerError> {
        let state = self.open_market(market)?;
        if !state.does_resolve() {
            return Err(LedgerError::MarketNotResolvable { market });
        }
        check_outcome(state, winning)?;

        if let Some(state) = self.markets.get_mut(&market) {
            state.resolve(winning);
        }
        info!(market = %market, winning = %winning, "Market resolved");
        self.emit(LedgerEvent::MarketResolved { market, winning });
        Ok(())
    }

    #[must_use]
    pub fn market(&self, market: MarketId) -> Option<&Market> {
        self.markets.get(&market)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub(crate) fn market_ref(&self, market: MarketId) -> Result<&Market, LedgerError> {
        self.markets
            .get(&market)
            .ok_or(LedgerError::UnknownMarket { market })
    }

    /// The market, provided it exists and is not frozen.
    pub(crate) fn open_market(&self, market: MarketId) -> Result<&Market, LedgerError> {
        let state = self.market_ref(market)?;
        if state.is_resolved() {
            return Err(LedgerError::MarketResolved { market });
        }
        Ok(state)
    }

    // ---------------------------------------------------------------------
    // Tilt store
    // ---------------------------------------------------------------------

    /// Add `delta` to an account's tilt on one outcome.
    ///
    /// This is the raw store update: it maintains the extremum heaps but
    /// performs no solvency check. Settlement is the checked path.
    ///
    /// # Errors
    ///
    /// Returns an error if the market is unknown or resolved, or the outcome
    /// does not exist.
    pub fn update_tilt(
        &mut self,
        account: &AccountId,
        market: MarketId,
        outcome: OutcomeId,
        delta: Amount,
    ) -> Result<(), LedgerError> {
        check_outcome(self.open_market(market)?, outcome)?;
        self.exposure_mut(account, market).update_tilt(outcome, delta);
        Ok(())
    }

    #[must_use]
    pub fn exposure(&self, account: &AccountId, market: MarketId) -> Option<&Exposure> {
        self.exposures.get(&(account.clone(), market))
    }

    /// Exposure entry, created lazily. Creating it marks the market touched.
    pub(crate) fn exposure_mut(&mut self, account: &AccountId, market: MarketId) -> &mut Exposure {
        let block_size = self.settings.block_size;
        let track_max = self
            .markets
            .get(&market)
            .is_some_and(|state| state.tracks_max_for(account));
        let accounts = &mut self.accounts;
        self.exposures
            .entry((account.clone(), market))
            .or_insert_with(|| {
                accounts
                    .entry(account.clone())
                    .or_default()
                    .touched
                    .insert(market);
                Exposure::new(block_size, track_max)
            })
    }

    #[must_use]
    pub fn tilt(&self, account: &AccountId, market: MarketId, outcome: OutcomeId) -> Amount {
        self.exposure(account, market)
            .map_or(Decimal::ZERO, |exposure| exposure.tilt(outcome))
    }

    #[must_use]
    pub fn lay_offset(&self, account: &AccountId, market: MarketId) -> Amount {
        self.exposure(account, market)
            .map_or(Decimal::ZERO, Exposure::lay_offset)
    }

    #[must_use]
    pub fn net_allocation(&self, account: &AccountId, market: MarketId) -> Amount {
        self.exposure(account, market)
            .map_or(Decimal::ZERO, Exposure::net_allocation)
    }

    #[must_use]
    pub fn usdc_spent(&self, account: &AccountId, market: MarketId) -> Amount {
        self.exposure(account, market)
            .map_or(Decimal::ZERO, Exposure::usdc_spent)
    }

    #[must_use]
    pub fn redeemed_usdc(&self, account: &AccountId, market: MarketId) -> Amount {
        self.exposure(account, market)
            .map_or(Decimal::ZERO, Exposure::redeemed_usdc)
    }

    fn reserve_in(&self, market: MarketId, exposure: &Exposure) -> bool {
        self.markets
            .get(&market)
            .is_some_and(|state| has_reserve(state, exposure))
    }

    /// Smallest tilt across the account's outcomes in `market`. O(1).
    #[must_use]
    pub fn min_tilt(&self, account: &AccountId, market: MarketId) -> TiltExtremum {
        self.exposure(account, market)
            .map_or(TiltExtremum::NONE, |exposure| {
                exposure.min_tilt(self.reserve_in(market, exposure))
            })
    }

    /// Largest tilt, or the empty result when best case is untracked. O(1).
    #[must_use]
    pub fn max_tilt(&self, account: &AccountId, market: MarketId) -> TiltExtremum {
        self.exposure(account, market)
            .and_then(|exposure| exposure.max_tilt(self.reserve_in(market, exposure)))
            .unwrap_or(TiltExtremum::NONE)
    }

    /// Gap between the second smallest and the smallest tilt.
    #[must_use]
    pub fn min_tilt_delta(&self, account: &AccountId, market: MarketId) -> Amount {
        self.exposure(account, market)
            .map_or(Decimal::ZERO, |exposure| {
                exposure.min_tilt_delta(self.reserve_in(market, exposure))
            })
    }

    // ---------------------------------------------------------------------
    // Accounts and aggregates
    // ---------------------------------------------------------------------

    pub(crate) fn account_mut(&mut self, account: &AccountId) -> &mut AccountBook {
        self.accounts.entry(account.clone()).or_default()
    }

    #[must_use]
    pub fn free_collateral(&self, account: &AccountId) -> Amount {
        self.accounts
            .get(account)
            .map_or(Decimal::ZERO, AccountBook::free_collateral)
    }

    /// Markets the account holds exposure in, unclaimed.
    #[must_use]
    pub fn touched_markets(&self, account: &AccountId) -> &[MarketId] {
        self.accounts
            .get(account)
            .map_or(&[], |book| book.touched().as_slice())
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.accounts.keys()
    }

    /// Every (account, market) pair with an exposure entry.
    pub fn exposures(&self) -> impl Iterator<Item = (&AccountId, MarketId, &Exposure)> {
        self.exposures
            .iter()
            .map(|((account, market), exposure)| (account, *market, exposure))
    }

    #[must_use]
    pub const fn balance_sheet(&self) -> &BalanceSheet {
        &self.sheet
    }

    /// Sum of net allocations in `market` across accounts.
    #[must_use]
    pub fn allocated_in(&self, market: MarketId) -> Amount {
        self.exposures
            .iter()
            .filter(|((_, id), _)| *id == market)
            .map(|(_, exposure)| exposure.net_allocation())
            .sum()
    }

    /// Credit new principal to an account's free collateral.
    ///
    /// Custody must already hold the principal.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveAmount` for `amount <= 0`.
    pub fn deposit(&mut self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount { amount });
        }
        self.account_mut(account).free_collateral += amount;
        self.sheet.record_deposit(amount);
        info!(account = %account, amount = %amount, "Deposit credited");
        self.emit(LedgerEvent::Deposited {
            account: account.clone(),
            amount,
        });
        Ok(())
    }

    /// Check that `amount` can leave the account, counting winnings the hard
    /// claim path would collect. Nothing is mutated.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveAmount` or `InsufficientFreeCollateral`.
    pub fn prepare_withdrawal(
        &self,
        account: &AccountId,
        amount: Amount,
    ) -> Result<ClaimPlan, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount { amount });
        }
        let free = self.free_collateral(account);
        let shortfall = amount - free;
        let passes = if shortfall > Decimal::ZERO {
            self.settings.claims.hard_passes
        } else {
            1
        };
        let plan = self.plan_claims(account, passes, Some(shortfall));
        let available = free + plan.total();
        if available < amount {
            return Err(LedgerError::InsufficientFreeCollateral {
                account: account.clone(),
                required: amount,
                available,
            });
        }
        Ok(plan)
    }

    /// Commit a withdrawal validated by [`Ledger::prepare_withdrawal`].
    ///
    /// Custody must already have released the principal.
    pub fn commit_withdrawal(&mut self, account: &AccountId, amount: Amount, plan: &ClaimPlan) {
        let mut delta = AggregateDelta::new();
        self.commit_claims(account, plan, ClaimSource::Touch, &mut delta);
        self.sheet.apply(&delta);

        self.account_mut(account).free_collateral -= amount;
        self.sheet.record_withdrawal(amount);
        info!(account = %account, amount = %amount, "Withdrawal released");
        self.emit(LedgerEvent::Withdrawn {
            account: account.clone(),
            amount,
        });
        debug_assert!(self.sheet.is_balanced());
    }

    /// Validate and commit a withdrawal in one step.
    ///
    /// # Errors
    ///
    /// See [`Ledger::prepare_withdrawal`].
    pub fn withdraw(&mut self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let plan = self.prepare_withdrawal(account, amount)?;
        self.commit_withdrawal(account, amount, &plan);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    pub(crate) fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Whether a zero tilt competes with the recorded ones: always in an
/// expanding market, otherwise while some outcome is still untouched.
pub(crate) fn has_reserve(market: &Market, exposure: &Exposure) -> bool {
    market.is_expanding() || exposure.has_unrecorded(market.outcome_count())
}

pub(crate) fn check_outcome(market: &Market, outcome: OutcomeId) -> Result<(), LedgerError> {
    if market.has_outcome(outcome) {
        Ok(())
    } else {
        Err(LedgerError::UnknownOutcome {
            market: market.id(),
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn alice() -> AccountId {
        AccountId::from("alice")
    }

    #[test]
    fn markets_get_sequential_ids() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let a = ledger.create_market(MarketParams::perpetual(2)).unwrap();
        let b = ledger.create_market(MarketParams::resolving(3, "feed")).unwrap();
        assert_eq!(a, MarketId::new(1));
        assert_eq!(b, MarketId::new(2));
        assert_eq!(ledger.market(b).unwrap().outcome_count(), 3);
    }

    #[test]
    fn update_tilt_validates_references() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::resolving(2, "feed")).unwrap();

        let err = ledger
            .update_tilt(&alice(), market, OutcomeId::new(5), dec!(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownOutcome { .. }));

        let err = ledger
            .update_tilt(&alice(), MarketId::new(99), OutcomeId::new(0), dec!(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownMarket { .. }));

        ledger.resolve_market(market, OutcomeId::new(0)).unwrap();
        let err = ledger
            .update_tilt(&alice(), market, OutcomeId::new(0), dec!(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::MarketResolved { .. }));
        assert!(ledger.exposure(&alice(), market).is_none());
    }

    #[test]
    fn first_touch_records_market() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::perpetual(2)).unwrap();
        ledger
            .update_tilt(&alice(), market, OutcomeId::new(1), dec!(-3))
            .unwrap();
        assert_eq!(ledger.touched_markets(&alice()), &[market]);
        assert_eq!(ledger.min_tilt(&alice(), market).value, dec!(-3));
    }

    #[test]
    fn only_expanding_markets_grow() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let fixed = ledger.create_market(MarketParams::perpetual(2)).unwrap();
        assert_eq!(
            ledger.add_outcome(fixed),
            Err(LedgerError::MarketNotExpanding { market: fixed })
        );

        let open = ledger
            .create_market(MarketParams::perpetual(2).expanding())
            .unwrap();
        assert_eq!(ledger.add_outcome(open), Ok(OutcomeId::new(2)));
        assert_eq!(ledger.market(open).unwrap().outcome_count(), 3);
    }

    #[test]
    fn resolve_rejects_perpetual_and_repeat() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let perpetual = ledger.create_market(MarketParams::perpetual(2)).unwrap();
        assert!(matches!(
            ledger.resolve_market(perpetual, OutcomeId::new(0)),
            Err(LedgerError::MarketNotResolvable { .. })
        ));

        let resolving = ledger.create_market(MarketParams::resolving(2, "feed")).unwrap();
        ledger.resolve_market(resolving, OutcomeId::new(1)).unwrap();
        assert!(matches!(
            ledger.resolve_market(resolving, OutcomeId::new(0)),
            Err(LedgerError::MarketResolved { .. })
        ));
        assert_eq!(
            ledger.market(resolving).unwrap().winning_outcome(),
            Some(OutcomeId::new(1))
        );
    }

    #[test]
    fn deposit_and_withdraw_keep_books_balanced() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        ledger.deposit(&alice(), dec!(100)).unwrap();
        ledger.withdraw(&alice(), dec!(30)).unwrap();
        assert_eq!(ledger.free_collateral(&alice()), dec!(70));
        assert_eq!(ledger.balance_sheet().total_value_locked(), dec!(70));
        assert!(ledger.balance_sheet().is_balanced());

        let err = ledger.withdraw(&alice(), dec!(71)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFreeCollateral { .. }));
        assert!(matches!(
            ledger.deposit(&alice(), dec!(0)),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn events_are_drained() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        ledger.create_market(MarketParams::perpetual(2)).unwrap();
        ledger.deposit(&alice(), dec!(1)).unwrap();
        assert_eq!(ledger.drain_events().len(), 2);
        assert!(ledger.drain_events().is_empty());
    }
}
