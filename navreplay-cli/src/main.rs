//! NavReplay CLI - Command-line interface
//!
//! Inspect recorded trip histories and replay them in real time against a
//! route session.

mod commands;
mod error;
mod router;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use navreplay::config::{config_file_path, ConfigFile};
use navreplay::logging::init_logging;
use tracing::{debug, error};

use commands::config::ConfigAction;
use commands::inspect::InspectArgs;
use commands::replay::ReplayArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "navreplay", version, about = "Replay recorded navigation trips")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level or filter directives, overriding the config file
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Summarize a recorded history
    Inspect(InspectArgs),

    /// Replay a recorded history in real time
    Replay(ReplayArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.unwrap_or_else(config_file_path);
    let mut config = ConfigFile::load_from(&config_path)?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    let _logging = init_logging(&config.logging)?;
    debug!(
        version = navreplay::VERSION,
        config = %config_path.display(),
        "navreplay starting"
    );

    match cli.command {
        Commands::Inspect(args) => commands::inspect::run(args, &config),
        Commands::Replay(args) => commands::replay::run(args, &config),
        Commands::Config { action } => commands::config::run(action, &config_path, &config),
    }
}
