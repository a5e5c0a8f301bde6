// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tandem - hand-off router connecting bot users with human agents.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod pipeline;
mod shell;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tandem_config::TandemConfig;

/// Tandem - hand-off router connecting bot users with human agents.
#[derive(Parser, Debug)]
#[command(name = "tandem", version, about, long_about = None)]
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
    /// Drive the router from an interactive console.
    Shell,
    /// Show aggregation channels, requests, connections, and message logs.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tandem_config::load_and_validate_path(path),
        None => tandem_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tandem_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let result = match cli.command {
        Some(Commands::Shell) => shell::run_shell(config).await,
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("tandem: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

fn print_config(config: &TandemConfig) -> Result<(), tandem_core::TandemError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| tandem_core::TandemError::Config(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}

/// Initialize tracing subscriber with EnvFilter.
///
/// `RUST_LOG` wins when set; otherwise `tandem={level},warn`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tandem={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn default_config_renders_as_toml() {
        let config = tandem_config::load_and_validate_str("").expect("defaults are valid");
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("conversation_timeout_secs = 3600"));
        let reparsed = tandem_config::load_and_validate_str(&rendered).unwrap();
        assert_eq!(reparsed.handoff.trigger_keyword, "human");
    }

    #[test]
    fn cli_parses_status_flags() {
        let cli = Cli::try_parse_from(["tandem", "--config", "x.toml", "status", "--json"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("x.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Status { json: true, plain: false })
        ));
    }
}
