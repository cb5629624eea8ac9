//! Custody port for principal entering and leaving the exchange.

use crate::domain::Amount;
use crate::error::CustodyError;

/// Holds the real principal behind every account's free collateral.
///
/// The ledger credits a deposit only after `deposit_principal` succeeds and debits a
/// withdrawal only after `withdraw_principal` succeeds.
pub trait Custody: Send + Sync {
    /// Take `amount` of principal into custody.
    ///
    /// # Errors
    ///
    /// Returns `CustodyError` if the transfer is refused.
    fn deposit_principal(&self, amount: Amount) -> Result<(), CustodyError>;

    /// Pay `amount` of principal out of custody.
    ///
    /// # Errors
    ///
    /// Returns `CustodyError` if custody cannot release the amount.
    fn withdraw_principal(&self, amount: Amount) -> Result<(), CustodyError>;

    /// Principal currently held.
    fn principal(&self) -> Amount;
}
