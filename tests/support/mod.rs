#![allow(dead_code)]

use std::collections::HashMap;

use rust_decimal::Decimal;
use tiltledger::domain::{AccountId, Amount, MarketId};
use tiltledger::ledger::{BalanceSheet, Ledger};

/// Everything a rejected operation must leave untouched.
#[derive(Debug, PartialEq)]
pub struct LedgerFingerprint {
    pub sheet: BalanceSheet,
    pub free: Vec<(AccountId, Amount)>,
    pub exposures: Vec<(AccountId, MarketId, Amount, Amount, Vec<Amount>)>,
}

pub fn fingerprint(ledger: &Ledger) -> LedgerFingerprint {
    let mut free: Vec<_> = ledger
        .accounts()
        .map(|account| (account.clone(), ledger.free_collateral(account)))
        .collect();
    free.sort();

    let mut exposures: Vec<_> = ledger
        .exposures()
        .map(|(account, market, exposure)| {
            (
                account.clone(),
                market,
                exposure.net_allocation(),
                exposure.lay_offset(),
                exposure.recorded_tilts().map(|(_, tilt)| tilt).collect(),
            )
        })
        .collect();
    exposures.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));

    LedgerFingerprint {
        sheet: ledger.balance_sheet().clone(),
        free,
        exposures,
    }
}

/// Assert the balance-sheet identity and per-pair solvency.
pub fn assert_books_hold(ledger: &Ledger) {
    let sheet = ledger.balance_sheet();
    assert!(sheet.is_balanced(), "balance sheet broken: {sheet:?}");

    let free: Amount = ledger
        .accounts()
        .map(|account| ledger.free_collateral(account))
        .sum();
    assert_eq!(free, sheet.total_free_collateral());

    for market in ledger.markets().filter(|market| !market.is_resolved()) {
        assert_eq!(
            sheet.market_value(market.id()),
            ledger.allocated_in(market.id()),
            "market value of {} drifted from its allocations",
            market.id()
        );
    }

    for (account, market, exposure) in ledger.exposures() {
        let resolved = ledger
            .market(market)
            .is_some_and(|state| state.is_resolved());
        if resolved {
            continue;
        }
        assert!(
            ledger.effective_min_shares(account, market) >= Decimal::ZERO,
            "{account} insolvent in {market}: {exposure:?}"
        );
        assert!(
            ledger.redeemable(account, market) <= exposure.net_allocation(),
            "{account} cannot redeem in {market}"
        );
    }
}

/// Remembers every pair's spent and redeemed counters across a run and
/// fails if either ever decreases.
#[derive(Debug, Default)]
pub struct CounterWatch {
    seen: HashMap<(AccountId, MarketId), (Amount, Amount)>,
}

impl CounterWatch {
    pub fn observe(&mut self, ledger: &Ledger) {
        for (account, market, exposure) in ledger.exposures() {
            let spent = exposure.usdc_spent();
            let redeemed = exposure.redeemed_usdc();
            assert_eq!(exposure.net_allocation(), spent - redeemed);
            if let Some((prev_spent, prev_redeemed)) =
                self.seen.insert((account.clone(), market), (spent, redeemed))
            {
                assert!(spent >= prev_spent, "{account} spent went down in {market}");
                assert!(
                    redeemed >= prev_redeemed,
                    "{account} redeemed went down in {market}"
                );
            }
        }
    }
}
