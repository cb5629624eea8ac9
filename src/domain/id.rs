//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Account identifier - newtype for type safety.
///
/// Accounts are opaque: no state is stored against the identifier itself,
/// everything is keyed by `(account, market[, outcome])`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new `AccountId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the account ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Market identifier, allocated sequentially by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketId(u64);

impl MarketId {
    /// Create a new `MarketId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mkt-{}", self.0)
    }
}

/// Outcome identifier, dense within a market (`0..outcome_count`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutcomeId(u32);

impl OutcomeId {
    /// Create a new `OutcomeId` from a raw index.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the underlying index.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Index into per-outcome storage.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The block this outcome belongs to for a given block size.
    #[must_use]
    pub const fn block(self, block_size: u32) -> BlockId {
        BlockId(self.0 / block_size)
    }
}

impl fmt::Display for OutcomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fixed-size partition of a market's outcome space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a new `BlockId` from a raw index.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Index into per-block storage.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Outcomes covered by this block.
    #[must_use]
    pub fn outcomes(self, block_size: u32) -> impl Iterator<Item = OutcomeId> {
        let start = self.0 * block_size;
        (start..start + block_size).map(OutcomeId::new)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blk-{}", self.0)
    }
}

/// Identifier of a signed off-chain order.
///
/// Generated as UUID v4 for new intents, or constructed from an existing
/// string (for example an order hash computed by the signing front end).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentId(String);

impl IntentId {
    /// Create a new `IntentId` with a generated UUID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the intent ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for IntentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IntentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IntentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
