//! Domain validation errors for core domain types.
//!
//! These errors are returned by `try_new` constructors when the inputs break
//! a domain invariant, before any ledger state is touched.
//!
//! # Examples
//!
//! ```
//! use tiltledger::domain::error::DomainError;
//! use tiltledger::domain::market::MarketParams;
//! use rust_decimal_macros::dec;
//!
//! // Synthetic collateral requires a designated maker.
//! let result = MarketParams::perpetual(2).with_synthetic_collateral(dec!(100)).validate();
//! assert!(matches!(result, Err(DomainError::SyntheticCollateralWithoutMaker)));
//! ```

use thiserror::Error;

use super::money::Amount;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Markets must start with at least one outcome.
    #[error("outcomes cannot be empty")]
    EmptyOutcomes,

    /// Synthetic collateral is only granted to a designated maker.
    #[error("synthetic collateral requires a designated maker")]
    SyntheticCollateralWithoutMaker,

    /// Synthetic collateral is only granted in non-resolving markets.
    #[error("synthetic collateral is not allowed in resolving markets")]
    SyntheticCollateralInResolvingMarket,

    /// Synthetic collateral cannot be negative.
    #[error("synthetic collateral must be 0 or greater, got {amount}")]
    NegativeSyntheticCollateral {
        /// The invalid amount that was provided.
        amount: Amount,
    },

    /// Amounts moved between accounts must be positive.
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The invalid amount that was provided.
        amount: Amount,
    },

    /// Prices quoted on intents cannot be negative.
    #[error("price must be 0 or greater, got {price}")]
    NegativePrice {
        /// The invalid price that was provided.
        price: Amount,
    },
}
