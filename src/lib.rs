//! Tiltledger - exposure, solvency and settlement accounting for
//! multi-outcome prediction markets.
//!
//! Every (account, market) pair carries a *tilt* per outcome, a lay offset
//! and the capital allocated to back it. The ledger keeps each pair's worst
//! case (and, for a perpetual market's maker, its best case) available in
//! logarithmic time through block-grouped 4-ary heaps, so solvency can be
//! checked before every settlement without scanning outcomes.
//!
//! # Architecture
//!
//! - **`domain`** - Identifiers, markets, trades, intents, events
//! - **`ledger`** - The accounting core: tilt store, extremum index,
//!   solvency engine, settlement, claims and the global balance sheet
//! - **`port`** - Traits for pricing, resolution and custody
//! - **`adapter`** - In-memory implementations of the ports
//! - **`application`** - The exchange service wiring ledger and ports
//! - **`infrastructure`** - Configuration loading and logging
//! - **`cli`** - The `tiltledger` binary's commands
//!
//! # Example
//!
//! ```
//! use tiltledger::domain::{AccountId, MarketParams, OutcomeId, Side};
//! use tiltledger::ledger::{Ledger, LedgerSettings};
//! use rust_decimal_macros::dec;
//!
//! let mut ledger = Ledger::new(LedgerSettings::default());
//! let market = ledger.create_market(MarketParams::resolving(2, "feed")).unwrap();
//! let (alice, bob) = (AccountId::from("alice"), AccountId::from("bob"));
//! ledger.deposit(&alice, dec!(100)).unwrap();
//! ledger.deposit(&bob, dec!(100)).unwrap();
//!
//! // bob writes 10 Back shares of outcome 0 and hands them to alice.
//! ledger
//!     .transfer(&bob, &alice, market, OutcomeId::new(0), Side::Back, dec!(10))
//!     .unwrap();
//! assert_eq!(ledger.tilt(&alice, market, OutcomeId::new(0)), dec!(10));
//! assert!(ledger.balance_sheet().is_balanced());
//! ```

pub mod adapter;
pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ledger;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
