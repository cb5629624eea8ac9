//! Builders for domain primitives used across tests.

use rust_decimal::Decimal;

use crate::domain::{
    AccountId, Amount, Direction, Intent, IntentId, MarketId, MarketParams, OutcomeId, Side,
};

/// Create an [`AccountId`] from a string.
pub fn account(id: &str) -> AccountId {
    AccountId::from(id)
}

/// Generate `n` accounts named `a0`, `a1`, ..., `a{n-1}`.
pub fn make_accounts(n: usize) -> Vec<AccountId> {
    (0..n).map(|i| AccountId::from(format!("a{i}"))).collect()
}

pub fn outcome(id: u32) -> OutcomeId {
    OutcomeId::new(id)
}

/// Resolving market with `outcomes` outcomes on feed `feed`, made by `maker`.
pub fn resolving_market(outcomes: u32, feed: &str, maker: &str) -> MarketParams {
    MarketParams::resolving(outcomes, feed).with_maker(account(maker))
}

/// Perpetual market made by `maker` with a synthetic collateral line.
pub fn perpetual_market(outcomes: u32, maker: &str, synthetic: Amount) -> MarketParams {
    MarketParams::perpetual(outcomes)
        .with_maker(account(maker))
        .with_synthetic_collateral(synthetic)
}

/// An open-ended intent to buy Back shares of `outcome`.
pub fn buy_intent(
    id: &str,
    maker: &str,
    market: MarketId,
    outcome: u32,
    size: Amount,
    price: Decimal,
) -> Intent {
    Intent {
        id: IntentId::from(id),
        maker: account(maker),
        market,
        outcome: OutcomeId::new(outcome),
        side: Side::Back,
        direction: Direction::Buy,
        size,
        price,
        expires_at: None,
    }
}
