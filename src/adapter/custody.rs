//! Custody that keeps principal in a counter.

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::Amount;
use crate::error::CustodyError;
use crate::port::Custody;

#[derive(Debug, Default)]
pub struct InMemoryCustody {
    principal: Mutex<Amount>,
}

impl InMemoryCustody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Custody for InMemoryCustody {
    fn deposit_principal(&self, amount: Amount) -> Result<(), CustodyError> {
        if amount <= Decimal::ZERO {
            return Err(CustodyError::Rejected(format!("cannot deposit {amount}")));
        }
        *self.principal.lock() += amount;
        Ok(())
    }

    fn withdraw_principal(&self, amount: Amount) -> Result<(), CustodyError> {
        let mut principal = self.principal.lock();
        if *principal < amount {
            return Err(CustodyError::InsufficientPrincipal {
                requested: amount,
                available: *principal,
            });
        }
        *principal -= amount;
        Ok(())
    }

    fn principal(&self) -> Amount {
        *self.principal.lock()
    }
}
