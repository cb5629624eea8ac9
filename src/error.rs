use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::{AccountId, Amount, IntentId, MarketId, OutcomeId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Rejections raised by ledger operations.
///
/// Every variant is raised during validation, before any state is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown market {market}")]
    UnknownMarket { market: MarketId },

    #[error("unknown outcome {outcome} in market {market}")]
    UnknownOutcome { market: MarketId, outcome: OutcomeId },

    #[error("market {market} is resolved")]
    MarketResolved { market: MarketId },

    #[error("market {market} does not resolve")]
    MarketNotResolvable { market: MarketId },

    #[error("market {market} has a fixed outcome set")]
    MarketNotExpanding { market: MarketId },

    #[error("market {market} has no designated maker")]
    NoDesignatedMaker { market: MarketId },

    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Amount },

    #[error("account {account} cannot trade with itself")]
    SelfTrade { account: AccountId },

    #[error("insufficient free collateral for {account}: required {required}, available {available}")]
    InsufficientFreeCollateral {
        account: AccountId,
        required: Amount,
        available: Amount,
    },

    #[error("unknown intent {intent}")]
    UnknownIntent { intent: IntentId },

    #[error("intent {intent} already submitted")]
    DuplicateIntent { intent: IntentId },

    #[error("intent {intent} is cancelled")]
    IntentCancelled { intent: IntentId },

    #[error("intent {intent} has expired")]
    IntentExpired { intent: IntentId },

    #[error("intent {intent} can fill at most {remaining}, requested {requested}")]
    IntentOverfill {
        intent: IntentId,
        remaining: Amount,
        requested: Amount,
    },

    #[error("only the maker of intent {intent} may cancel it")]
    NotIntentMaker { intent: IntentId },

    #[error("quoted {quoted} breaches limit {limit}")]
    SlippageExceeded { quoted: Amount, limit: Amount },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Errors reported by a price engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("no price engine registered for market {market}")]
    MissingEngine { market: MarketId },

    #[error("no price for outcome {outcome} in market {market}")]
    NoPrice { market: MarketId, outcome: OutcomeId },

    #[error("pricing failed: {0}")]
    Failed(String),
}

/// Errors reported by the oracle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle has no feed for market {market}")]
    UnknownFeed { market: MarketId },

    #[error("oracle reported outcome {outcome} which market {market} does not have")]
    InvalidOutcome { market: MarketId, outcome: OutcomeId },
}

/// Errors reported by the custody layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("custody holds {available}, cannot release {requested}")]
    InsufficientPrincipal {
        requested: Amount,
        available: Amount,
    },

    #[error("custody rejected the operation: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Custody(#[from] CustodyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
