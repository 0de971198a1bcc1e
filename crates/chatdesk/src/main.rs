// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatdesk - multi-account WhatsApp help desk.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod accounts;
mod serve;

use std::path::PathBuf;

use chatdesk_config::{ChatdeskConfig, ConfigError};
use clap::{Parser, Subcommand};

/// Chatdesk - multi-account WhatsApp help desk.
#[derive(Parser, Debug)]
#[command(name = "chatdesk", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start every auto-start session and ingest messages until stopped.
    Serve,
    /// List configured accounts with their stored status and queues.
    Accounts,
    /// Manage chatdesk configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Load and validate the configuration, then exit.
    Check,
}

fn load(path: Option<&PathBuf>) -> Result<ChatdeskConfig, Vec<ConfigError>> {
    match path {
        Some(path) => chatdesk_config::load_and_validate_path(path),
        None => chatdesk_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            chatdesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Accounts) => accounts::run_accounts(&config).await,
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => {
            println!(
                "chatdesk: config ok ({} account(s), service.name={})",
                config.accounts.len(),
                config.service.name
            );
            Ok(())
        }
        None => {
            println!("chatdesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("chatdesk: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["chatdesk", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert!(cli.config.is_none());

        let cli = Cli::try_parse_from([
            "chatdesk",
            "config",
            "check",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Check
            })
        ));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));

        assert!(Cli::try_parse_from(["chatdesk", "config"]).is_err());
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatdesk.toml");
        std::fs::write(
            &path,
            r#"
[[accounts]]
id = 1
name = "ventas"
"#,
        )
        .unwrap();

        let config = load(Some(&path)).expect("config should be valid");
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.service.name, "chatdesk");
    }

    #[test]
    fn invalid_config_file_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatdesk.toml");
        std::fs::write(&path, "[service]\nnmae = \"typo\"\n").unwrap();

        let errors = load(Some(&path)).unwrap_err();
        assert!(!errors.is_empty());
    }
}
