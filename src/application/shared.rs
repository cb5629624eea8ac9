//! Exchange shared across threads.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::domain::{AccountId, Amount};
use crate::ledger::BalanceSheet;

use super::Exchange;

/// Cloneable handle to one [`Exchange`].
///
/// Every operation runs under a single lock, so the check and commit halves
/// of a settlement can never interleave with another writer.
#[derive(Debug, Clone)]
pub struct SharedExchange {
    inner: Arc<Mutex<Exchange>>,
}

impl SharedExchange {
    #[must_use]
    pub fn new(exchange: Exchange) -> Self {
        Self {
            inner: Arc::new(Mutex::new(exchange)),
        }
    }

    /// Exclusive access for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, Exchange> {
        self.inner.lock()
    }

    /// Run `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut Exchange) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn free_collateral(&self, account: &AccountId) -> Amount {
        self.inner.lock().ledger().free_collateral(account)
    }

    /// Snapshot of the aggregate balance sheet.
    pub fn balance_sheet(&self) -> BalanceSheet {
        self.inner.lock().ledger().balance_sheet().clone()
    }
}
