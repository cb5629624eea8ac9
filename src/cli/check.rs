//! `tiltledger check`: diagnostics that do not touch any ledger state.

use std::path::Path;

use super::output;
use crate::error::Result;
use crate::infrastructure::config::Config;

/// Validate a configuration file and summarize the effective settings.
///
/// # Errors
///
/// Returns the load or validation error.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    output::section("Configuration");
    output::field("path", path.display());

    let config = Config::load(path)?;
    let settings = config.ledger_settings();
    output::success("configuration file is valid");
    output::field("log level", &config.logging.level);
    output::field("log format", &config.logging.format);
    output::field("block size", settings.block_size);
    output::field("scan budget", settings.claims.scan);
    output::field("claim budget", settings.claims.claims);
    output::field("hard passes", settings.claims.hard_passes);
    output::field("resolve budget", config.resolve_budget());
    if config.resolve_budget() == 0 {
        output::warning("resolve budget is 0; winnings are only collected by explicit claims");
    }
    Ok(())
}
