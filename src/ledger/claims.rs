//! Resolution payouts.
//!
//! Once a market resolves, an account's holdings in it are
//! `net_allocation + lay_offset + tilt[winning]`. Claiming pays that out of
//! the market's value into free collateral, zeroes the entries and drops the
//! market from the account's touched list. A second claim pays nothing.
//!
//! Touch-driven claiming is bounded: one pass inspects at most
//! `ClaimBudget::scan` touched markets from the back of the list and settles
//! at most `ClaimBudget::claims` of them. The hard path repeats passes,
//! continuing where the previous one stopped.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::domain::{positive_part, AccountId, Amount, ClaimSource, LedgerEvent, MarketId};
use crate::error::LedgerError;

use super::capital::AggregateDelta;
use super::Ledger;

/// Claims selected for one operation, with the payout each will make.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClaimPlan {
    entries: Vec<(MarketId, Amount)>,
}

impl ClaimPlan {
    fn push(&mut self, market: MarketId, payout: Amount) {
        self.entries.push((market, payout));
    }

    /// Total payout.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.entries.iter().map(|(_, payout)| *payout).sum()
    }

    #[must_use]
    pub fn entries(&self) -> &[(MarketId, Amount)] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Ledger {
    /// Payout a claim on `market` would make now. `None` while unresolved.
    #[must_use]
    pub fn claimable(&self, account: &AccountId, market: MarketId) -> Option<Amount> {
        let winning = self.markets.get(&market)?.winning_outcome()?;
        Some(self.exposure(account, market).map_or(Decimal::ZERO, |exposure| {
            positive_part(
                exposure.net_allocation() + exposure.lay_offset() + exposure.tilt(winning),
            )
        }))
    }

    /// Unclaimed winnings across every touched market, ignoring budgets.
    #[must_use]
    pub fn pending_winnings(&self, account: &AccountId) -> Amount {
        self.touched_markets(account)
            .iter()
            .filter_map(|market| self.claimable(account, *market))
            .sum()
    }

    /// Select claims the way `passes` bounded passes would, stopping early
    /// once `target` is covered.
    pub(crate) fn plan_claims(
        &self,
        account: &AccountId,
        passes: usize,
        target: Option<Amount>,
    ) -> ClaimPlan {
        let budget = self.settings.claims;
        let touched = self.touched_markets(account);
        let mut plan = ClaimPlan::default();
        // Swap-remove only pulls already-visited entries forward, so a
        // backwards walk over the current list sees each market once.
        let mut cursor = touched.len();

        for _ in 0..passes {
            let mut scanned = 0;
            let mut claimed = 0;
            while cursor > 0 && scanned < budget.scan && claimed < budget.claims {
                cursor -= 1;
                scanned += 1;
                let market = touched[cursor];
                if let Some(payout) = self.claimable(account, market) {
                    plan.push(market, payout);
                    claimed += 1;
                }
            }
            let covered = target.is_some_and(|target| plan.total() >= target);
            if cursor == 0 || covered {
                break;
            }
        }
        plan
    }

    /// Pay out every claim in `plan`. Returns the amount credited.
    pub(crate) fn commit_claims(
        &mut self,
        account: &AccountId,
        plan: &ClaimPlan,
        source: ClaimSource,
        delta: &mut AggregateDelta,
    ) -> Amount {
        plan.entries
            .iter()
            .map(|(market, _)| self.claim_market(account, *market, source, delta))
            .sum()
    }

    fn claim_market(
        &mut self,
        account: &AccountId,
        market: MarketId,
        source: ClaimSource,
        delta: &mut AggregateDelta,
    ) -> Amount {
        let Some(payout) = self.claimable(account, market) else {
            return Decimal::ZERO;
        };
        let winning = self.markets.get(&market).and_then(|m| m.winning_outcome());

        if let (Some(exposure), Some(winning)) = (
            self.exposures.get_mut(&(account.clone(), market)),
            winning,
        ) {
            let tilt = exposure.tilt(winning);
            if !tilt.is_zero() {
                exposure.update_tilt(winning, -tilt);
            }
            let lay = exposure.lay_offset();
            exposure.adjust_lay_offset(-lay);
            let committed = exposure.net_allocation();
            if committed > Decimal::ZERO {
                exposure.record_redeemed(committed);
            }
        }

        delta.pay_out(market, payout);
        let book = self.account_mut(account);
        book.free_collateral += payout;
        book.touched.remove(market);

        if payout > Decimal::ZERO {
            debug!(account = %account, market = %market, payout = %payout, ?source, "Winnings claimed");
            self.emit(LedgerEvent::WinningsClaimed {
                account: account.clone(),
                market,
                amount: payout,
                source,
            });
        }
        payout
    }

    fn claim_with(&mut self, account: &AccountId, plan: &ClaimPlan, source: ClaimSource) -> Amount {
        if plan.is_empty() {
            return Decimal::ZERO;
        }
        let mut delta = AggregateDelta::new();
        let total = self.commit_claims(account, plan, source, &mut delta);
        self.sheet.apply(&delta);
        debug_assert!(self.sheet.is_balanced());
        total
    }

    /// One bounded claim pass, as run on every touch. Returns the amount
    /// credited to free collateral.
    pub fn apply_pending_winnings(&mut self, account: &AccountId) -> Amount {
        let plan = self.plan_claims(account, 1, None);
        self.claim_with(account, &plan, ClaimSource::Touch)
    }

    /// Repeat bounded passes until `needed` is covered or the hard-pass
    /// budget runs out. Returns the amount credited.
    pub fn apply_pending_winnings_hard(&mut self, account: &AccountId, needed: Amount) -> Amount {
        let passes = self.settings.claims.hard_passes.max(1);
        let plan = self.plan_claims(account, passes, Some(needed));
        self.claim_with(account, &plan, ClaimSource::Touch)
    }

    /// Claim the listed markets regardless of budgets. Unresolved markets are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMarket` before claiming anything if any id is unknown.
    pub fn batch_claim(
        &mut self,
        account: &AccountId,
        markets: &[MarketId],
    ) -> Result<Amount, LedgerError> {
        for market in markets {
            self.market_ref(*market)?;
        }
        let mut delta = AggregateDelta::new();
        let total: Amount = markets
            .iter()
            .map(|market| self.claim_market(account, *market, ClaimSource::Batch, &mut delta))
            .sum();
        self.sheet.apply(&delta);
        debug_assert!(self.sheet.is_balanced());
        Ok(total)
    }
}
