//! Command-line interface definitions.
//!
//! The binary validates configuration files and replays TOML scenarios
//! against an in-process exchange.

pub mod check;
pub mod output;
pub mod scenario;
pub mod simulate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tilt ledger accounting tools
#[derive(Parser, Debug)]
#[command(name = "tiltledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),

    /// Replay a scenario file against a fresh exchange
    Simulate(SimulateArgs),
}

/// Subcommands for `tiltledger check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Path to the scenario file
    pub scenario: PathBuf,

    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Stop at the first rejected step
    #[arg(long)]
    pub strict: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_config() {
        let cli = Cli::try_parse_from(["tiltledger", "check", "config", "ledger.toml"]).unwrap();
        match cli.command {
            Commands::Check(CheckCommand::Config(arg)) => {
                assert_eq!(arg.config, PathBuf::from("ledger.toml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_simulate_with_global_flags() {
        let cli = Cli::try_parse_from([
            "tiltledger",
            "simulate",
            "run.toml",
            "--config",
            "c.toml",
            "--strict",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.scenario, PathBuf::from("run.toml"));
                assert_eq!(args.config, Some(PathBuf::from("c.toml")));
                assert!(args.strict);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn simulate_requires_scenario() {
        assert!(Cli::try_parse_from(["tiltledger", "simulate"]).is_err());
    }
}
