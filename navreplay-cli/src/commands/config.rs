//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use std::path::Path;

use clap::Subcommand;
use navreplay::config::ConfigFile;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show the configuration file path
    Path,

    /// Show the effective settings
    Show,

    /// Write a configuration file with the current settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(action: ConfigAction, path: &Path, config: &ConfigFile) -> Result<(), CliError> {
    match action {
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigAction::Show => {
            print!("{}", render(config)?);
            Ok(())
        }
        ConfigAction::Init { force } => run_init(path, config, force),
    }
}

fn run_init(path: &Path, config: &ConfigFile, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        )));
    }
    config.save_to(path)?;
    println!("Configuration file: {}", path.display());
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

fn render(config: &ConfigFile) -> Result<String, CliError> {
    let mut buffer = Vec::new();
    config
        .to_ini()
        .write_to(&mut buffer)
        .map_err(|e| CliError::Output(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| CliError::Output(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_sections() {
        let text = render(&ConfigFile::default()).unwrap();
        assert!(text.contains("[replay]"));
        assert!(text.contains("timestamp_order=pass_through"));
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        let config = ConfigFile::default();

        run_init(&path, &config, false).unwrap();
        assert!(path.exists());
        assert!(matches!(
            run_init(&path, &config, false),
            Err(CliError::Config(_))
        ));
        run_init(&path, &config, true).unwrap();
    }
}
