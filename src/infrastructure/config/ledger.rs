//! Ledger and claim-processing configuration.

use serde::Deserialize;

use crate::ledger::{ClaimBudget, LedgerSettings, DEFAULT_BLOCK_SIZE};

/// Exposure store tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Outcomes per block (default: 16).
    #[serde(default = "default_block_size")]
    pub block_size: u32,
}

const fn default_block_size() -> u32 {
    DEFAULT_BLOCK_SIZE
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
        }
    }
}

/// Bounds on lazy claim and resolution work per touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ClaimsConfig {
    /// Touched markets inspected per pass (default: 8).
    #[serde(default = "default_scan_budget")]
    pub scan_budget: usize,
    /// Claims settled per pass (default: 4).
    #[serde(default = "default_claim_budget")]
    pub claim_budget: usize,
    /// Oracle lookups per touch (default: 4).
    #[serde(default = "default_resolve_budget")]
    pub resolve_budget: usize,
    /// Passes the hard path may make (default: 4).
    #[serde(default = "default_hard_passes")]
    pub hard_passes: usize,
}

const fn default_scan_budget() -> usize {
    8
}

const fn default_claim_budget() -> usize {
    4
}

const fn default_resolve_budget() -> usize {
    4
}

const fn default_hard_passes() -> usize {
    4
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            scan_budget: default_scan_budget(),
            claim_budget: default_claim_budget(),
            resolve_budget: default_resolve_budget(),
            hard_passes: default_hard_passes(),
        }
    }
}

impl From<ClaimsConfig> for ClaimBudget {
    fn from(config: ClaimsConfig) -> Self {
        Self {
            scan: config.scan_budget,
            claims: config.claim_budget,
            hard_passes: config.hard_passes,
        }
    }
}

impl LedgerConfig {
    #[must_use]
    pub fn settings(self, claims: ClaimsConfig) -> LedgerSettings {
        LedgerSettings {
            block_size: self.block_size,
            claims: claims.into(),
        }
    }
}
