//! Storefront CLI - a terminal front-end for the storefront API.
//!
//! Wires configuration, the credential store, the request pipeline and the
//! session facade together, then runs one subcommand.

mod cli;
mod commands;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use storefront_core::{ApiClient, Config, CredentialStore, SessionManager};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Log file prefix inside the `--log-file` directory
const LOG_FILE_PREFIX: &str = "storefront.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard must stay alive for file logs to be flushed.
fn init_tracing(cli: &Cli) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match cli.log_file {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(&cli);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load().context("Failed to load config")?;
    let base_url = config.resolve_base_url(cli.base_url.as_deref());
    let backend = cli.store.unwrap_or(config.store_backend);
    info!(%base_url, ?backend, "Storefront CLI starting");

    let store = CredentialStore::new(
        config
            .open_store(backend)
            .context("Failed to open credential store")?,
    );
    let api = ApiClient::new(&base_url, store).context("Failed to build HTTP client")?;
    let session = SessionManager::new(api);

    commands::run(cli.command, &session, &mut config).await
}
