//! Infrastructure configuration modules.

pub mod ledger;
pub mod logging;
pub mod settings;

pub use ledger::{ClaimsConfig, LedgerConfig};
pub use logging::LoggingConfig;
pub use settings::Config;
