// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! feedstr - republishes syndication feeds as signed records.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use feedstr_config::FeedstrConfig;
use feedstr_core::FeedstrError;

/// feedstr - republishes syndication feeds as signed records.
#[derive(Parser, Debug)]
#[command(name = "feedstr", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sync engine and the admin gateway.
    Serve,
    /// Print the public identity a feed URL maps to.
    Derive {
        /// Canonical feed URL.
        url: String,
    },
    /// Validate the configuration and exit.
    CheckConfig,
}

fn load_config(path: Option<&Path>) -> Option<FeedstrConfig> {
    let loaded = match path {
        Some(path) => feedstr_config::load_and_validate_path(path),
        None => feedstr_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            feedstr_config::render_errors(&errors);
            None
        }
    }
}

/// Public key of the identity `url` maps to under the configured secret.
fn derive_pubkey(config: &FeedstrConfig, url: &str) -> Result<String, FeedstrError> {
    let secret = config
        .service
        .secret
        .as_deref()
        .ok_or_else(|| FeedstrError::Config("service.secret is required".into()))?;
    let keypair = feedstr_identity::derive_identity(url.trim(), secret)?;
    Ok(keypair.public_hex())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(config) = load_config(cli.config.as_deref()) else {
        return ExitCode::FAILURE;
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Derive { url }) => derive_pubkey(&config, &url).map(|pubkey| {
            println!("{pubkey}");
        }),
        Some(Commands::CheckConfig) => {
            println!("feedstr: configuration ok (service.name={})", config.service.name);
            Ok(())
        }
        None => {
            println!("feedstr: use --help for available commands");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
