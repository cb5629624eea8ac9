//! Ledger events consumed by downstream projections.
//!
//! Mirror and event projections read these instead of diffing state. Winnings
//! folded in during a settlement carry [`ClaimSource::Settlement`] so they
//! are never mistaken for trade proceeds.

use serde::Serialize;

use super::id::{AccountId, IntentId, MarketId, OutcomeId};
use super::money::Amount;
use super::trade::Side;

/// Why a resolution payout was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    /// Pulled while settling a trade for the account.
    Settlement,
    /// Pulled lazily on deposit, withdraw or an explicit pending-winnings pass.
    Touch,
    /// Requested by market id.
    Batch,
}

/// A state transition recorded by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    MarketCreated {
        market: MarketId,
        outcomes: u32,
    },
    OutcomeAdded {
        market: MarketId,
        outcome: OutcomeId,
    },
    MarketResolved {
        market: MarketId,
        winning: OutcomeId,
    },
    Deposited {
        account: AccountId,
        amount: Amount,
    },
    Withdrawn {
        account: AccountId,
        amount: Amount,
    },
    PositionTransferred {
        from: Option<AccountId>,
        to: Option<AccountId>,
        market: MarketId,
        outcome: OutcomeId,
        side: Side,
        amount: Amount,
    },
    TradeSettled {
        market: MarketId,
        outcome: OutcomeId,
        side: Side,
        size: Amount,
        seller: AccountId,
        buyer: AccountId,
        cost: Amount,
    },
    CapitalAllocated {
        account: AccountId,
        market: MarketId,
        amount: Amount,
    },
    CapitalDeallocated {
        account: AccountId,
        market: MarketId,
        amount: Amount,
    },
    WinningsClaimed {
        account: AccountId,
        market: MarketId,
        amount: Amount,
        source: ClaimSource,
    },
    IntentFilled {
        intent: IntentId,
        taker: AccountId,
        size: Amount,
    },
    IntentCancelled {
        intent: IntentId,
    },
}
