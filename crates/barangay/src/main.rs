// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Barangay chat desk.
//!
//! Binary entry point: an interactive shell for residents and staff, a
//! conversation listing, and a config dump.

mod conversations;
mod shell;

use std::path::PathBuf;

use barangay_config::model::BarangayConfig;
use clap::{Parser, Subcommand, ValueEnum};

/// Barangay office chat desk.
#[derive(Parser, Debug)]
#[command(name = "barangay", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Who the shell acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Role {
    Resident,
    Staff,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat interactively as a resident or a staff member.
    Shell {
        /// Side of the desk to act on.
        #[arg(long = "as", value_enum)]
        role: Role,
        /// Resident email, or staff uid.
        who: String,
    },
    /// List conversations in the store.
    Conversations {
        /// Only show this status (bot, waiting, active, resolved).
        #[arg(long)]
        status: Option<String>,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn load(path: Option<&std::path::Path>) -> BarangayConfig {
    let loaded = match path {
        Some(path) => barangay_config::load_and_validate_path(path),
        None => barangay_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            barangay_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("barangay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load(cli.config.as_deref());
    init_tracing(&config.portal.log_level);

    let result = match cli.command {
        Some(Commands::Shell { role, who }) => shell::run_shell(config, role, &who).await,
        Some(Commands::Conversations { status, json }) => {
            conversations::run_conversations(&config, status.as_deref(), json).await
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(text) => {
                print!("{text}");
                Ok(())
            }
            Err(e) => Err(barangay_core::BarangayError::Internal(format!(
                "failed to render configuration: {e}"
            ))),
        },
        None => {
            println!("barangay: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
