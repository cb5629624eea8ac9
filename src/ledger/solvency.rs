//! Worst-case and best-case views, and moving capital between an account's
//! free collateral and its markets.
//!
//! Quantities for one (account, market) with net allocation `N`, lay offset
//! `L`, synthetic collateral `ISC`:
//!
//! - real min shares `N + L + min_tilt`, the payout floor over every outcome
//! - effective min shares, the same plus `ISC`; must never go negative
//! - redeemable `-L - max_tilt`, the real capital owed in the best case for
//!   the counterparty; tracked only for a non-resolving market's maker

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::domain::{positive_part, AccountId, Amount, LedgerEvent, MarketId, OutcomeId};
use crate::error::LedgerError;

use super::capital::AggregateDelta;
use super::exposure::Exposure;
use super::{has_reserve, Ledger};

/// A movement of capital between free collateral and a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum CapitalMove {
    Hold,
    Allocate(Amount),
    Deallocate(Amount),
}

impl CapitalMove {
    /// Signed change to free collateral.
    #[must_use]
    pub fn free_delta(self) -> Amount {
        match self {
            Self::Hold => Decimal::ZERO,
            Self::Allocate(amount) => -amount,
            Self::Deallocate(amount) => amount,
        }
    }

    /// Signed change to net allocation.
    #[must_use]
    pub fn allocation_delta(self) -> Amount {
        -self.free_delta()
    }
}

/// The inputs to every solvency rule, captured at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SolvencySnapshot {
    pub net_allocation: Amount,
    pub lay_offset: Amount,
    pub min_tilt: Amount,
    /// `None` when best-case exposure is not tracked.
    pub max_tilt: Option<Amount>,
    pub synthetic_collateral: Amount,
}

impl SolvencySnapshot {
    #[must_use]
    pub fn from_exposure(exposure: &Exposure, reserve: bool, synthetic: Amount) -> Self {
        Self {
            net_allocation: exposure.net_allocation(),
            lay_offset: exposure.lay_offset(),
            min_tilt: exposure.min_tilt(reserve).value,
            max_tilt: exposure.max_tilt(reserve).map(|max| max.value),
            synthetic_collateral: synthetic,
        }
    }

    #[must_use]
    pub fn real_min_shares(&self) -> Amount {
        self.net_allocation + self.lay_offset + self.min_tilt
    }

    #[must_use]
    pub fn effective_min_shares(&self) -> Amount {
        self.real_min_shares() + self.synthetic_collateral
    }

    /// Real capital that must stay allocated for the best case. Zero when
    /// best case is untracked.
    #[must_use]
    pub fn redeemable(&self) -> Amount {
        self.max_tilt
            .map_or(Decimal::ZERO, |max| -self.lay_offset - max)
    }

    #[must_use]
    pub fn is_solvent(&self) -> bool {
        self.effective_min_shares() >= Decimal::ZERO
    }

    #[must_use]
    pub fn is_redeemable(&self) -> bool {
        let redeemable = self.redeemable();
        redeemable <= Decimal::ZERO || self.net_allocation >= redeemable
    }

    /// Smallest allocation restoring both solvency and redeemability.
    #[must_use]
    pub fn shortfall(&self) -> Amount {
        positive_part(-self.effective_min_shares())
            .max(positive_part(self.redeemable() - self.net_allocation))
    }

    /// Largest deallocation keeping both solvency and redeemability.
    #[must_use]
    pub fn excess(&self) -> Amount {
        let floor = self.redeemable().max(Decimal::ZERO);
        let mut excess = self
            .effective_min_shares()
            .min(self.net_allocation - floor);

        let real = self.real_min_shares();
        if self.synthetic_collateral > Decimal::ZERO && real < Decimal::ZERO {
            // Real capital backing a synthetic-funded deficit stays put.
            excess = excess.min(positive_part(self.net_allocation + real));
        }
        positive_part(excess)
    }

    /// The single move that leaves the pair solvent, redeemable and holding
    /// no excess.
    #[must_use]
    pub fn rebalance(&self) -> CapitalMove {
        let shortfall = self.shortfall();
        if shortfall > Decimal::ZERO {
            return CapitalMove::Allocate(shortfall);
        }
        let excess = self.excess();
        if excess > Decimal::ZERO {
            CapitalMove::Deallocate(excess)
        } else {
            CapitalMove::Hold
        }
    }

    /// The snapshot after `capital` is applied.
    #[must_use]
    pub fn after(&self, capital: CapitalMove) -> Self {
        Self {
            net_allocation: self.net_allocation + capital.allocation_delta(),
            ..*self
        }
    }
}

impl Ledger {
    /// Current solvency inputs for the pair.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMarket` if the market does not exist.
    pub fn solvency(
        &self,
        account: &AccountId,
        market: MarketId,
    ) -> Result<SolvencySnapshot, LedgerError> {
        let state = self.market_ref(market)?;
        let synthetic = state.synthetic_collateral_for(account);
        Ok(self.exposure(account, market).map_or(
            SolvencySnapshot {
                synthetic_collateral: synthetic,
                max_tilt: state.tracks_max_for(account).then_some(Decimal::ZERO),
                ..SolvencySnapshot::default()
            },
            |exposure| {
                SolvencySnapshot::from_exposure(exposure, has_reserve(state, exposure), synthetic)
            },
        ))
    }

    #[must_use]
    pub fn real_min_shares(&self, account: &AccountId, market: MarketId) -> Amount {
        self.solvency(account, market)
            .map_or(Decimal::ZERO, |snapshot| snapshot.real_min_shares())
    }

    #[must_use]
    pub fn effective_min_shares(&self, account: &AccountId, market: MarketId) -> Amount {
        self.solvency(account, market)
            .map_or(Decimal::ZERO, |snapshot| snapshot.effective_min_shares())
    }

    #[must_use]
    pub fn redeemable(&self, account: &AccountId, market: MarketId) -> Amount {
        self.solvency(account, market)
            .map_or(Decimal::ZERO, |snapshot| snapshot.redeemable())
    }

    /// Solvency inputs after a hypothetical position change, computed from
    /// the heaps without mutating anything.
    pub(crate) fn projected_solvency(
        &self,
        account: &AccountId,
        market: MarketId,
        outcome: OutcomeId,
        tilt_delta: Amount,
        lay_delta: Amount,
    ) -> Result<SolvencySnapshot, LedgerError> {
        let state = self.market_ref(market)?;
        let fresh;
        let exposure = match self.exposure(account, market) {
            Some(exposure) => exposure,
            None => {
                fresh = Exposure::new(self.settings.block_size, state.tracks_max_for(account));
                &fresh
            }
        };
        let newly_recorded = u32::from(!exposure.is_recorded(outcome));
        let reserve = state.is_expanding()
            || exposure.recorded_count() + newly_recorded < state.outcome_count();
        Ok(SolvencySnapshot {
            net_allocation: exposure.net_allocation(),
            lay_offset: exposure.lay_offset() + lay_delta,
            min_tilt: exposure.projected_min(outcome, tilt_delta, reserve),
            max_tilt: exposure.projected_max(outcome, tilt_delta, reserve),
            synthetic_collateral: state.synthetic_collateral_for(account),
        })
    }

    /// Allocate from free collateral until the pair is solvent and
    /// redeemable. Returns the amount allocated.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFreeCollateral` if free collateral cannot cover
    /// the shortfall; nothing is moved in that case.
    pub fn ensure_solvency(
        &mut self,
        account: &AccountId,
        market: MarketId,
    ) -> Result<Amount, LedgerError> {
        self.open_market(market)?;
        let shortfall = self.solvency(account, market)?.shortfall();
        if shortfall.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let available = self.free_collateral(account);
        if available < shortfall {
            return Err(LedgerError::InsufficientFreeCollateral {
                account: account.clone(),
                required: shortfall,
                available,
            });
        }
        self.commit_capital(account, market, CapitalMove::Allocate(shortfall));
        Ok(shortfall)
    }

    /// Return capital not needed for solvency or redeemability to free
    /// collateral. Returns the amount released.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMarket` or `MarketResolved`.
    pub fn deallocate_excess(
        &mut self,
        account: &AccountId,
        market: MarketId,
    ) -> Result<Amount, LedgerError> {
        self.open_market(market)?;
        let excess = self.solvency(account, market)?.excess();
        if excess > Decimal::ZERO {
            self.commit_capital(account, market, CapitalMove::Deallocate(excess));
        }
        Ok(excess)
    }

    /// Allocate or deallocate, whichever the pair needs.
    ///
    /// # Errors
    ///
    /// See [`Ledger::ensure_solvency`].
    pub fn rebalance_full(
        &mut self,
        account: &AccountId,
        market: MarketId,
    ) -> Result<CapitalMove, LedgerError> {
        self.open_market(market)?;
        let capital = self.solvency(account, market)?.rebalance();
        match capital {
            CapitalMove::Allocate(_) => {
                self.ensure_solvency(account, market)?;
            }
            CapitalMove::Deallocate(_) => {
                self.deallocate_excess(account, market)?;
            }
            CapitalMove::Hold => {}
        }
        Ok(capital)
    }

    fn commit_capital(&mut self, account: &AccountId, market: MarketId, capital: CapitalMove) {
        let mut delta = AggregateDelta::new();
        self.apply_capital_move(account, market, capital, &mut delta);
        self.sheet.apply(&delta);
        debug_assert!(self.sheet.is_balanced());
    }

    /// Move capital for the pair, recording the aggregate change in `delta`.
    pub(crate) fn apply_capital_move(
        &mut self,
        account: &AccountId,
        market: MarketId,
        capital: CapitalMove,
        delta: &mut AggregateDelta,
    ) {
        match capital {
            CapitalMove::Hold => return,
            CapitalMove::Allocate(amount) => {
                self.exposure_mut(account, market).record_spent(amount);
                delta.allocate(market, amount);
                debug!(account = %account, market = %market, amount = %amount, "Capital allocated");
                self.emit(LedgerEvent::CapitalAllocated {
                    account: account.clone(),
                    market,
                    amount,
                });
            }
            CapitalMove::Deallocate(amount) => {
                self.exposure_mut(account, market).record_redeemed(amount);
                delta.deallocate(market, amount);
                debug!(account = %account, market = %market, amount = %amount, "Capital released");
                self.emit(LedgerEvent::CapitalDeallocated {
                    account: account.clone(),
                    market,
                    amount,
                });
            }
        }
        self.account_mut(account).free_collateral += capital.free_delta();
    }
}
