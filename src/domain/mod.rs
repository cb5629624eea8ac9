//! Exchange-agnostic domain types.

pub mod error;
pub mod event;
pub mod id;
pub mod intent;
pub mod market;
pub mod money;
pub mod trade;

pub use error::DomainError;
pub use event::{ClaimSource, LedgerEvent};
pub use id::{AccountId, BlockId, IntentId, MarketId, OutcomeId};
pub use intent::{Intent, IntentState};
pub use market::{Market, MarketParams};
pub use money::{positive_part, Amount};
pub use trade::{Direction, Side, TradeRequest};
