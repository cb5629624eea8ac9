//! Position transfer and atomic settlement.
//!
//! A settlement bundles the position transfer, the cash leg, a capital
//! rebalance for both participants and a bounded pull of their pending
//! winnings. Everything is computed from heap projections first; only when
//! both participants end with non-negative free collateral is anything
//! written, and the global aggregates then receive one update per market.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{
    AccountId, Amount, ClaimSource, DomainError, LedgerEvent, MarketId, OutcomeId, Side,
};
use crate::error::LedgerError;

use super::capital::AggregateDelta;
use super::claims::ClaimPlan;
use super::solvency::CapitalMove;
use super::{check_outcome, Ledger};

/// A trade between two accounts, as handed to [`Ledger::settle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub market: MarketId,
    pub outcome: OutcomeId,
    pub side: Side,
    pub size: Amount,
    /// Gives up the position and receives `cost`.
    pub seller: AccountId,
    /// Receives the position and pays `cost`.
    pub buyer: AccountId,
    pub cost: Amount,
}

/// What a settlement did to one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantSettlement {
    pub account: AccountId,
    pub capital: CapitalMove,
    /// Resolution winnings pulled in, kept apart from trade proceeds.
    pub winnings: Amount,
    pub free_collateral: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementReceipt {
    pub market: MarketId,
    pub outcome: OutcomeId,
    pub side: Side,
    pub size: Amount,
    pub cost: Amount,
    pub seller: ParticipantSettlement,
    pub buyer: ParticipantSettlement,
}

/// Tilt and lay-offset change for one side of a position transfer.
fn position_delta(side: Side, amount: Amount, receiving: bool) -> (Amount, Amount) {
    let signed = if receiving { amount } else { -amount };
    match side {
        Side::Back => (signed, Decimal::ZERO),
        Side::Lay => (-signed, signed),
    }
}

/// Everything one participant's commit will do, decided up front.
struct ParticipantPlan {
    account: AccountId,
    tilt_delta: Amount,
    lay_delta: Amount,
    cash: Amount,
    capital: CapitalMove,
    claims: ClaimPlan,
}

impl Ledger {
    /// Move exposure between accounts without touching capital.
    ///
    /// `None` on either side mints or burns. No solvency check runs; this is
    /// the primitive under [`Ledger::settle`].
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive amount, a resolved or unknown
    /// market, an unknown outcome, or identical sides.
    pub fn transfer_position(
        &mut self,
        from: Option<&AccountId>,
        to: Option<&AccountId>,
        market: MarketId,
        outcome: OutcomeId,
        side: Side,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount { amount });
        }
        check_outcome(self.open_market(market)?, outcome)?;
        if let (Some(from), Some(to)) = (from, to) {
            if from == to {
                return Err(LedgerError::SelfTrade {
                    account: from.clone(),
                });
            }
        }
        self.apply_position(from, to, market, outcome, side, amount);
        Ok(())
    }

    fn apply_position(
        &mut self,
        from: Option<&AccountId>,
        to: Option<&AccountId>,
        market: MarketId,
        outcome: OutcomeId,
        side: Side,
        amount: Amount,
    ) {
        for (account, receiving) in [(from, false), (to, true)] {
            let Some(account) = account else { continue };
            let (tilt, lay) = position_delta(side, amount, receiving);
            let exposure = self.exposure_mut(account, market);
            exposure.update_tilt(outcome, tilt);
            if !lay.is_zero() {
                exposure.adjust_lay_offset(lay);
            }
        }
        debug!(
            from = from.map(AccountId::as_str),
            to = to.map(AccountId::as_str),
            market = %market,
            outcome = %outcome,
            side = %side,
            amount = %amount,
            "Position transferred"
        );
        self.emit(LedgerEvent::PositionTransferred {
            from: from.cloned(),
            to: to.cloned(),
            market,
            outcome,
            side,
            amount,
        });
    }

    fn plan_participant(
        &self,
        account: &AccountId,
        request: &SettlementRequest,
        receiving: bool,
    ) -> Result<ParticipantPlan, LedgerError> {
        let (tilt_delta, lay_delta) = position_delta(request.side, request.size, receiving);
        let cash = if receiving { -request.cost } else { request.cost };

        let capital = self
            .projected_solvency(account, request.market, request.outcome, tilt_delta, lay_delta)?
            .rebalance();
        let claims = self.plan_claims(account, 1, None);

        let available = self.free_collateral(account) + claims.total();
        let required = -(cash + capital.free_delta());
        if available < required {
            return Err(LedgerError::InsufficientFreeCollateral {
                account: account.clone(),
                required,
                available,
            });
        }
        Ok(ParticipantPlan {
            account: account.clone(),
            tilt_delta,
            lay_delta,
            cash,
            capital,
            claims,
        })
    }

    /// Settle a trade atomically: position, cash, rebalance and pending
    /// winnings for both sides, or nothing at all.
    ///
    /// # Errors
    ///
    /// Returns an error if references are invalid, the accounts coincide,
    /// or either participant cannot fund its side.
    pub fn settle(&mut self, request: &SettlementRequest) -> Result<SettlementReceipt, LedgerError> {
        if request.size <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount {
                amount: request.size,
            });
        }
        if request.cost < Decimal::ZERO {
            return Err(DomainError::NegativePrice {
                price: request.cost,
            }
            .into());
        }
        if request.seller == request.buyer {
            return Err(LedgerError::SelfTrade {
                account: request.seller.clone(),
            });
        }
        check_outcome(self.open_market(request.market)?, request.outcome)?;

        let seller = self.plan_participant(&request.seller, request, false)?;
        let buyer = self.plan_participant(&request.buyer, request, true)?;
        debug_assert_eq!(seller.tilt_delta + buyer.tilt_delta, Decimal::ZERO);
        debug_assert_eq!(seller.lay_delta + buyer.lay_delta, Decimal::ZERO);

        self.apply_position(
            Some(&request.seller),
            Some(&request.buyer),
            request.market,
            request.outcome,
            request.side,
            request.size,
        );

        let mut delta = AggregateDelta::new();
        let seller = self.commit_participant(request.market, seller, &mut delta);
        let buyer = self.commit_participant(request.market, buyer, &mut delta);
        self.sheet.apply(&delta);
        debug_assert!(self.sheet.is_balanced());

        info!(
            market = %request.market,
            outcome = %request.outcome,
            side = %request.side,
            size = %request.size,
            cost = %request.cost,
            seller = %request.seller,
            buyer = %request.buyer,
            "Trade settled"
        );
        self.emit(LedgerEvent::TradeSettled {
            market: request.market,
            outcome: request.outcome,
            side: request.side,
            size: request.size,
            seller: request.seller.clone(),
            buyer: request.buyer.clone(),
            cost: request.cost,
        });

        Ok(SettlementReceipt {
            market: request.market,
            outcome: request.outcome,
            side: request.side,
            size: request.size,
            cost: request.cost,
            seller,
            buyer,
        })
    }

    fn commit_participant(
        &mut self,
        market: MarketId,
        plan: ParticipantPlan,
        delta: &mut AggregateDelta,
    ) -> ParticipantSettlement {
        self.account_mut(&plan.account).free_collateral += plan.cash;
        let winnings = self.commit_claims(&plan.account, &plan.claims, ClaimSource::Settlement, delta);
        self.apply_capital_move(&plan.account, market, plan.capital, delta);
        debug_assert!(self
            .solvency(&plan.account, market)
            .is_ok_and(|snapshot| snapshot.is_solvent() && snapshot.is_redeemable()));

        ParticipantSettlement {
            free_collateral: self.free_collateral(&plan.account),
            account: plan.account,
            capital: plan.capital,
            winnings,
        }
    }

    /// Move exposure between two accounts with no cash leg, rebalancing
    /// both like a settlement.
    ///
    /// # Errors
    ///
    /// See [`Ledger::settle`].
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        market: MarketId,
        outcome: OutcomeId,
        side: Side,
        amount: Amount,
    ) -> Result<SettlementReceipt, LedgerError> {
        self.settle(&SettlementRequest {
            market,
            outcome,
            side,
            size: amount,
            seller: from.clone(),
            buyer: to.clone(),
            cost: Decimal::ZERO,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketParams;
    use crate::ledger::LedgerSettings;
    use rust_decimal_macros::dec;

    fn alice() -> AccountId {
        AccountId::from("alice")
    }

    fn bob() -> AccountId {
        AccountId::from("bob")
    }

    fn request(market: MarketId, side: Side, size: Amount, cost: Amount) -> SettlementRequest {
        SettlementRequest {
            market,
            outcome: OutcomeId::new(0),
            side,
            size,
            seller: bob(),
            buyer: alice(),
            cost,
        }
    }

    #[test]
    fn back_transfer_moves_tilt() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::perpetual(3)).unwrap();
        ledger
            .transfer_position(Some(&bob()), Some(&alice()), market, OutcomeId::new(1), Side::Back, dec!(4))
            .unwrap();
        assert_eq!(ledger.tilt(&alice(), market, OutcomeId::new(1)), dec!(4));
        assert_eq!(ledger.tilt(&bob(), market, OutcomeId::new(1)), dec!(-4));
        assert_eq!(ledger.lay_offset(&alice(), market), dec!(0));
    }

    #[test]
    fn lay_transfer_moves_offset_and_opposite_tilt() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::perpetual(3)).unwrap();
        ledger
            .transfer_position(Some(&bob()), Some(&alice()), market, OutcomeId::new(1), Side::Lay, dec!(4))
            .unwrap();
        assert_eq!(ledger.lay_offset(&alice(), market), dec!(4));
        assert_eq!(ledger.tilt(&alice(), market, OutcomeId::new(1)), dec!(-4));
        assert_eq!(ledger.lay_offset(&bob(), market), dec!(-4));
        assert_eq!(ledger.tilt(&bob(), market, OutcomeId::new(1)), dec!(4));
    }

    #[test]
    fn null_sides_mint_and_burn() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::perpetual(2)).unwrap();
        ledger
            .transfer_position(None, Some(&alice()), market, OutcomeId::new(0), Side::Back, dec!(5))
            .unwrap();
        ledger
            .transfer_position(Some(&alice()), None, market, OutcomeId::new(0), Side::Back, dec!(2))
            .unwrap();
        assert_eq!(ledger.tilt(&alice(), market, OutcomeId::new(0)), dec!(3));
    }

    #[test]
    fn transfer_position_rejects_bad_input() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::resolving(2, "feed")).unwrap();
        let zero = ledger.transfer_position(None, Some(&alice()), market, OutcomeId::new(0), Side::Back, dec!(0));
        assert!(matches!(zero, Err(LedgerError::NonPositiveAmount { .. })));
        let same = ledger.transfer_position(Some(&alice()), Some(&alice()), market, OutcomeId::new(0), Side::Back, dec!(1));
        assert!(matches!(same, Err(LedgerError::SelfTrade { .. })));

        ledger.resolve_market(market, OutcomeId::new(0)).unwrap();
        let frozen = ledger.transfer_position(None, Some(&alice()), market, OutcomeId::new(0), Side::Back, dec!(1));
        assert!(matches!(frozen, Err(LedgerError::MarketResolved { .. })));
    }

    #[test]
    fn settle_moves_cash_and_capital() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::resolving(2, "feed")).unwrap();
        ledger.deposit(&alice(), dec!(100)).unwrap();
        ledger.deposit(&bob(), dec!(100)).unwrap();

        let receipt = ledger.settle(&request(market, Side::Back, dec!(10), dec!(6))).unwrap();
        assert_eq!(receipt.seller.capital, CapitalMove::Allocate(dec!(10)));
        assert_eq!(receipt.buyer.capital, CapitalMove::Hold);
        assert_eq!(receipt.seller.free_collateral, dec!(96));
        assert_eq!(receipt.buyer.free_collateral, dec!(94));
        assert_eq!(ledger.balance_sheet().market_value(market), dec!(10));
        assert_eq!(ledger.balance_sheet().total_value_locked(), dec!(200));
        assert!(ledger.balance_sheet().is_balanced());
    }

    #[test]
    fn settle_releases_capital_when_position_closes() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::resolving(2, "feed")).unwrap();
        ledger.deposit(&alice(), dec!(100)).unwrap();
        ledger.deposit(&bob(), dec!(100)).unwrap();
        ledger.settle(&request(market, Side::Back, dec!(10), dec!(6))).unwrap();

        // Bob buys the shares back.
        let receipt = ledger
            .settle(&SettlementRequest {
                seller: alice(),
                buyer: bob(),
                ..request(market, Side::Back, dec!(10), dec!(5))
            })
            .unwrap();
        assert_eq!(receipt.buyer.capital, CapitalMove::Deallocate(dec!(10)));
        assert_eq!(ledger.free_collateral(&bob()), dec!(101));
        assert_eq!(ledger.free_collateral(&alice()), dec!(99));
        assert_eq!(ledger.balance_sheet().total_markets_value(), dec!(0));
    }

    #[test]
    fn lay_seller_is_charged_for_untouched_outcomes() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::resolving(3, "feed")).unwrap();
        ledger.deposit(&alice(), dec!(100)).unwrap();
        ledger.deposit(&bob(), dec!(100)).unwrap();

        let receipt = ledger.settle(&request(market, Side::Lay, dec!(10), dec!(7))).unwrap();
        // Bob pays 10 on either of the two other outcomes.
        assert_eq!(receipt.seller.capital, CapitalMove::Allocate(dec!(10)));
        assert_eq!(ledger.real_min_shares(&bob(), market), dec!(0));
        assert_eq!(receipt.buyer.capital, CapitalMove::Hold);
    }

    #[test]
    fn failed_settlement_changes_nothing() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::resolving(2, "feed")).unwrap();
        ledger.deposit(&alice(), dec!(100)).unwrap();
        ledger.deposit(&bob(), dec!(5)).unwrap();
        ledger.drain_events();

        let err = ledger.settle(&request(market, Side::Back, dec!(10), dec!(2))).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFreeCollateral {
                account: bob(),
                required: dec!(8),
                available: dec!(5),
            }
        );
        assert!(ledger.exposure(&bob(), market).is_none());
        assert!(ledger.exposure(&alice(), market).is_none());
        assert_eq!(ledger.free_collateral(&alice()), dec!(100));
        assert!(ledger.drain_events().is_empty());
    }

    #[test]
    fn settlement_pulls_pending_winnings() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let old = ledger.create_market(MarketParams::resolving(2, "feed")).unwrap();
        let new = ledger.create_market(MarketParams::resolving(2, "feed")).unwrap();
        ledger.deposit(&alice(), dec!(20)).unwrap();
        ledger.deposit(&bob(), dec!(20)).unwrap();
        ledger.settle(&request(old, Side::Back, dec!(10), dec!(5))).unwrap();
        ledger.resolve_market(old, OutcomeId::new(0)).unwrap();

        // Alice can only afford this with her winnings from the old market.
        let receipt = ledger.settle(&request(new, Side::Back, dec!(30), dec!(25))).unwrap();
        assert_eq!(receipt.buyer.winnings, dec!(10));
        assert_eq!(receipt.buyer.free_collateral, dec!(0));
        assert!(ledger.drain_events().iter().any(|event| matches!(
            event,
            LedgerEvent::WinningsClaimed { source: ClaimSource::Settlement, .. }
        )));
    }

    #[test]
    fn cost_cannot_be_negative() {
        let mut ledger = Ledger::new(LedgerSettings::default());
        let market = ledger.create_market(MarketParams::perpetual(2)).unwrap();
        let err = ledger.settle(&request(market, Side::Back, dec!(1), dec!(-1))).unwrap_err();
        assert!(matches!(err, LedgerError::Domain(DomainError::NegativePrice { .. })));
    }
}
