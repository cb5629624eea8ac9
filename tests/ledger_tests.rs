//! Settlement, solvency and claims exercised through the public ledger API.

mod support;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tiltledger::domain::{AccountId, MarketId, MarketParams, OutcomeId, Side};
use tiltledger::error::LedgerError;
use tiltledger::ledger::{Ledger, LedgerSettings, SettlementRequest};
use tiltledger::testkit::config::small_blocks;
use tiltledger::testkit::domain::{account, make_accounts, perpetual_market, resolving_market};

use support::{assert_books_hold, fingerprint, CounterWatch};

fn request(
    market: MarketId,
    outcome: u32,
    side: Side,
    size: Decimal,
    seller: &AccountId,
    buyer: &AccountId,
    cost: Decimal,
) -> SettlementRequest {
    SettlementRequest {
        market,
        outcome: OutcomeId::new(outcome),
        side,
        size,
        seller: seller.clone(),
        buyer: buyer.clone(),
        cost,
    }
}

#[test]
fn lay_seller_backs_every_other_outcome() {
    let mut ledger = Ledger::new(LedgerSettings::default());
    let market = ledger.create_market(MarketParams::resolving(3, "feed")).unwrap();
    let (seller, buyer) = (account("seller"), account("buyer"));
    ledger.deposit(&buyer, dec!(100)).unwrap();

    let lay = request(market, 1, Side::Lay, dec!(10), &seller, &buyer, dec!(0));
    let err = ledger.settle(&lay).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFreeCollateral { .. }));

    ledger.deposit(&seller, dec!(10)).unwrap();
    ledger.settle(&lay).unwrap();
    assert_eq!(ledger.net_allocation(&seller, market), dec!(10));
    assert_eq!(ledger.lay_offset(&seller, market), dec!(-10));
    assert_eq!(ledger.net_allocation(&buyer, market), dec!(0));
    assert_eq!(ledger.real_min_shares(&buyer, market), dec!(0));
    assert_books_hold(&ledger);
}

#[test]
fn synthetic_collateral_covers_maker_worst_case() {
    let mut ledger = Ledger::new(LedgerSettings::default());
    let market = ledger
        .create_market(perpetual_market(2, "mm", dec!(100)))
        .unwrap();
    let (mm, alice) = (account("mm"), account("alice"));
    ledger.deposit(&alice, dec!(200)).unwrap();
    ledger.deposit(&mm, dec!(50)).unwrap();

    ledger
        .settle(&request(market, 0, Side::Back, dec!(150), &mm, &alice, dec!(0)))
        .unwrap();
    assert_eq!(ledger.net_allocation(&mm, market), dec!(50));
    assert_eq!(ledger.effective_min_shares(&mm, market), dec!(0));
    assert_eq!(ledger.real_min_shares(&mm, market), dec!(-100));

    // Any further Back sale on the same outcome needs real capital.
    let err = ledger
        .settle(&request(market, 0, Side::Back, dec!(1), &mm, &alice, dec!(0)))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFreeCollateral { .. }));
    assert_books_hold(&ledger);
}

#[test]
fn random_settlements_keep_books_and_reject_atomically() {
    for seed in 0..8 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ledger = Ledger::new(small_blocks());
        let accounts = make_accounts(5);
        let resolving = ledger
            .create_market(resolving_market(3, "feed", "a0"))
            .unwrap();
        let perpetual = ledger
            .create_market(perpetual_market(4, "a1", dec!(50)))
            .unwrap();
        let expanding = ledger
            .create_market(MarketParams::perpetual(2).with_maker(account("a2")).expanding())
            .unwrap();
        let markets = [resolving, perpetual, expanding];
        let mut counters = CounterWatch::default();

        for acct in &accounts {
            ledger
                .deposit(acct, Decimal::from(rng.gen_range(20i64..200)))
                .unwrap();
        }

        for _ in 0..300 {
            let before = fingerprint(&ledger);
            let result = match rng.gen_range(0..10) {
                0 => {
                    let acct = &accounts[rng.gen_range(0..accounts.len())];
                    ledger
                        .withdraw(acct, Decimal::from(rng.gen_range(1i64..40)))
                        .map(|_| ())
                }
                1 => {
                    let acct = &accounts[rng.gen_range(0..accounts.len())];
                    let market = markets[rng.gen_range(0..markets.len())];
                    ledger.rebalance_full(acct, market).map(|_| ())
                }
                2 => ledger.add_outcome(expanding).map(|_| ()),
                _ => {
                    let market = markets[rng.gen_range(0..markets.len())];
                    let outcomes = ledger.market(market).unwrap().outcome_count();
                    let seller = &accounts[rng.gen_range(0..accounts.len())];
                    let buyer = &accounts[rng.gen_range(0..accounts.len())];
                    let side = if rng.gen_bool(0.5) { Side::Back } else { Side::Lay };
                    let size: i64 = rng.gen_range(1..30);
                    let cost = Decimal::from(rng.gen_range(0..=size));
                    ledger
                        .settle(&request(
                            market,
                            rng.gen_range(0..outcomes),
                            side,
                            Decimal::from(size),
                            seller,
                            buyer,
                            cost,
                        ))
                        .map(|_| ())
                }
            };
            if result.is_err() {
                assert_eq!(fingerprint(&ledger), before, "seed {seed}: rejection mutated state");
            }
            assert_books_hold(&ledger);
            counters.observe(&ledger);
        }

        // Every winner can be paid: claims drain the market exactly.
        ledger.resolve_market(resolving, OutcomeId::new(rng.gen_range(0..3))).unwrap();
        let holders: Vec<AccountId> = ledger
            .exposures()
            .filter(|(_, market, _)| *market == resolving)
            .map(|(acct, _, _)| acct.clone())
            .collect();
        for holder in &holders {
            ledger.batch_claim(holder, &[resolving]).unwrap();
            counters.observe(&ledger);
        }
        assert_eq!(ledger.balance_sheet().market_value(resolving), dec!(0));
        assert_books_hold(&ledger);
    }
}

#[test]
fn settlement_collects_resolved_winnings_first() {
    let mut ledger = Ledger::new(LedgerSettings::default());
    let old = ledger.create_market(MarketParams::resolving(2, "old")).unwrap();
    let new = ledger.create_market(MarketParams::resolving(2, "new")).unwrap();
    let (alice, bob, carol) = (account("alice"), account("bob"), account("carol"));
    ledger.deposit(&bob, dec!(100)).unwrap();
    ledger.deposit(&alice, dec!(4)).unwrap();
    ledger.deposit(&carol, dec!(100)).unwrap();

    ledger
        .settle(&request(old, 0, Side::Back, dec!(10), &bob, &alice, dec!(4)))
        .unwrap();
    assert_eq!(ledger.free_collateral(&alice), dec!(0));
    ledger.resolve_market(old, OutcomeId::new(0)).unwrap();

    // alice pays 6 she only has once her winnings in `old` are folded in.
    let receipt = ledger
        .settle(&request(new, 1, Side::Back, dec!(10), &carol, &alice, dec!(6)))
        .unwrap();
    assert_eq!(receipt.buyer.winnings, dec!(10));
    assert_eq!(ledger.free_collateral(&alice), dec!(4));
    assert_books_hold(&ledger);
}

#[test]
fn market_value_tracks_allocations_until_resolution() {
    let mut ledger = Ledger::new(LedgerSettings::default());
    let market = ledger.create_market(MarketParams::resolving(2, "feed")).unwrap();
    let (seller, buyer) = (account("seller"), account("buyer"));
    ledger.deposit(&seller, dec!(20)).unwrap();
    ledger.deposit(&buyer, dec!(20)).unwrap();

    ledger
        .settle(&request(market, 0, Side::Back, dec!(10), &seller, &buyer, dec!(4)))
        .unwrap();
    assert_eq!(ledger.balance_sheet().market_value(market), dec!(10));
    assert_eq!(ledger.allocated_in(market), dec!(10));

    // Buying back half of the position frees the matching allocation.
    ledger
        .settle(&request(market, 0, Side::Back, dec!(5), &buyer, &seller, dec!(2)))
        .unwrap();
    assert_eq!(
        ledger.balance_sheet().market_value(market),
        ledger.allocated_in(market)
    );
    assert!(ledger.redeemed_usdc(&seller, market) > dec!(0));
    assert_books_hold(&ledger);
}
