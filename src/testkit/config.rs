//! Canonical test configurations.

use crate::ledger::{ClaimBudget, LedgerSettings};

/// Tiny blocks so even small markets span several of them.
pub fn small_blocks() -> LedgerSettings {
    LedgerSettings {
        block_size: 2,
        ..LedgerSettings::default()
    }
}

/// Budgets tight enough that lazy claiming needs several touches.
pub fn tight_claims() -> LedgerSettings {
    LedgerSettings {
        claims: ClaimBudget {
            scan: 2,
            claims: 1,
            hard_passes: 2,
        },
        ..LedgerSettings::default()
    }
}
