//! Market-related domain types.
//!
//! - [`MarketParams`] - Creation parameters, validated before a market exists
//! - [`Market`] - A market with a growing outcome set and optional resolution

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{AccountId, MarketId, OutcomeId};
use super::money::Amount;

/// Parameters for creating a market.
///
/// Resolving markets are settled by an oracle and pay out on the winning
/// outcome. Non-resolving (perpetual) markets never resolve and may grant
/// their designated maker a synthetic collateral line.
///
/// # Example
///
/// ```
/// use tiltledger::domain::{AccountId, MarketParams};
/// use rust_decimal_macros::dec;
///
/// let params = MarketParams::perpetual(3)
///     .with_maker(AccountId::from("maker"))
///     .with_synthetic_collateral(dec!(100))
///     .expanding();
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    /// Number of outcomes registered at creation.
    pub outcomes: u32,
    /// Whether an oracle eventually resolves this market.
    pub does_resolve: bool,
    /// The market-making account whose best case is tracked.
    #[serde(default)]
    pub designated_maker: Option<AccountId>,
    /// Solvency allowance granted to the designated maker.
    #[serde(default)]
    pub synthetic_collateral: Amount,
    /// Outcome set still growing, with an implicit zero-tilt reserve bucket.
    #[serde(default)]
    pub expanding: bool,
    /// Opaque parameters forwarded to the oracle.
    #[serde(default)]
    pub oracle_params: String,
}

impl MarketParams {
    /// A market resolved by the oracle.
    #[must_use]
    pub fn resolving(outcomes: u32, oracle_params: impl Into<String>) -> Self {
        Self {
            outcomes,
            does_resolve: true,
            designated_maker: None,
            synthetic_collateral: Decimal::ZERO,
            expanding: false,
            oracle_params: oracle_params.into(),
        }
    }

    /// A market that never resolves.
    #[must_use]
    pub fn perpetual(outcomes: u32) -> Self {
        Self {
            outcomes,
            does_resolve: false,
            designated_maker: None,
            synthetic_collateral: Decimal::ZERO,
            expanding: false,
            oracle_params: String::new(),
        }
    }

    /// Set the designated maker.
    #[must_use]
    pub fn with_maker(mut self, maker: AccountId) -> Self {
        self.designated_maker = Some(maker);
        self
    }

    /// Set the synthetic collateral line.
    #[must_use]
    pub fn with_synthetic_collateral(mut self, amount: Amount) -> Self {
        self.synthetic_collateral = amount;
        self
    }

    /// Mark the outcome set as expanding.
    #[must_use]
    pub fn expanding(mut self) -> Self {
        self.expanding = true;
        self
    }

    /// Check creation invariants.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the outcome set is empty or the synthetic
    /// collateral line is negative, lacks a maker, or sits on a resolving
    /// market.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.outcomes == 0 {
            return Err(DomainError::EmptyOutcomes);
        }
        if self.synthetic_collateral < Decimal::ZERO {
            return Err(DomainError::NegativeSyntheticCollateral {
                amount: self.synthetic_collateral,
            });
        }
        if self.synthetic_collateral > Decimal::ZERO {
            if self.designated_maker.is_none() {
                return Err(DomainError::SyntheticCollateralWithoutMaker);
            }
            if self.does_resolve {
                return Err(DomainError::SyntheticCollateralInResolvingMarket);
            }
        }
        Ok(())
    }
}

/// A market tracked by the ledger.
///
/// Outcome ids are dense (`0..outcome_count`) and only ever grow. Once a
/// winning outcome is recorded the market is frozen.
#[derive(Debug, Clone)]
pub struct Market {
    id: MarketId,
    params: MarketParams,
    outcome_count: u32,
    winning_outcome: Option<OutcomeId>,
}

impl Market {
    /// Create a new market with domain invariant validation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if `params` fails [`MarketParams::validate`].
    pub fn try_new(id: MarketId, params: MarketParams) -> Result<Self, DomainError> {
        params.validate()?;
        Ok(Self {
            id,
            outcome_count: params.outcomes,
            params,
            winning_outcome: None,
        })
    }

    /// Get the market ID.
    #[must_use]
    pub const fn id(&self) -> MarketId {
        self.id
    }

    /// Get the creation parameters.
    #[must_use]
    pub const fn params(&self) -> &MarketParams {
        &self.params
    }

    /// Whether an oracle resolves this market.
    #[must_use]
    pub const fn does_resolve(&self) -> bool {
        self.params.does_resolve
    }

    /// Whether the outcome set carries an implicit reserve bucket.
    #[must_use]
    pub const fn is_expanding(&self) -> bool {
        self.params.expanding
    }

    /// The designated maker, if any.
    #[must_use]
    pub fn designated_maker(&self) -> Option<&AccountId> {
        self.params.designated_maker.as_ref()
    }

    /// Whether `account` is the designated maker.
    #[must_use]
    pub fn is_designated_maker(&self, account: &AccountId) -> bool {
        self.params.designated_maker.as_ref() == Some(account)
    }

    /// Whether best-case (MAX) exposure is tracked for `account`.
    ///
    /// Only the designated maker of a non-resolving market can be forced to
    /// honor more claims than it holds.
    #[must_use]
    pub fn tracks_max_for(&self, account: &AccountId) -> bool {
        !self.params.does_resolve && self.is_designated_maker(account)
    }

    /// Synthetic collateral available to `account`.
    #[must_use]
    pub fn synthetic_collateral_for(&self, account: &AccountId) -> Amount {
        if self.tracks_max_for(account) {
            self.params.synthetic_collateral
        } else {
            Decimal::ZERO
        }
    }

    /// Number of outcomes currently registered.
    #[must_use]
    pub const fn outcome_count(&self) -> u32 {
        self.outcome_count
    }

    /// Whether `outcome` exists in this market.
    #[must_use]
    pub const fn has_outcome(&self, outcome: OutcomeId) -> bool {
        outcome.value() < self.outcome_count
    }

    /// Register one more outcome and return its id.
    pub fn add_outcome(&mut self) -> OutcomeId {
        let id = OutcomeId::new(self.outcome_count);
        self.outcome_count += 1;
        id
    }

    /// The winning outcome once resolved.
    #[must_use]
    pub const fn winning_outcome(&self) -> Option<OutcomeId> {
        self.winning_outcome
    }

    /// Whether the market has been resolved (and is frozen).
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.winning_outcome.is_some()
    }

    /// Record the winning outcome.
    pub(crate) fn resolve(&mut self, winning: OutcomeId) {
        self.winning_outcome = Some(winning);
    }
}
