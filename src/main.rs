use clap::Parser;
use tiltledger::cli::{self, output, CheckCommand, Cli, Commands};
use tiltledger::infrastructure::config::{Config, LoggingConfig};
use tracing::{debug, error};

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    output::configure(output::OutputConfig {
        json: cli.json,
        quiet: cli.quiet,
    });

    // A broken config is reported by the command itself.
    let logging = match &cli.command {
        Commands::Simulate(args) => args
            .config
            .as_ref()
            .and_then(|path| Config::load(path).ok())
            .map(|config| config.logging)
            .unwrap_or_default(),
        Commands::Check(_) => LoggingConfig::default(),
    };
    logging.init();
    debug!(command = ?cli.command, "tiltledger starting");

    let result = match &cli.command {
        Commands::Check(CheckCommand::Config(arg)) => cli::check::execute_config(&arg.config),
        Commands::Simulate(args) => cli::simulate::execute(args),
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
