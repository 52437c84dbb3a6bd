//! Warden janitor - removes expired OAuth 2.0 and OpenID Connect state.

use clap::Parser;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use warden_cli::commands;
use warden_cli::error::{EXIT_CONFIG, EXIT_SUCCESS};
use warden_cli::{Cli, Formatter, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_CONFIG } else { EXIT_SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    // Logs go to stderr; stdout carries only the step report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current batch");
            trigger.cancel();
        }
    });

    match run(cli, cancel).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> warden_cli::Result<u8> {
    let settings = Settings::resolve(&cli)?;

    match settings.janitor.interval {
        Some(interval) => commands::execute_watch(&settings, interval, cancel).await,
        None => {
            let formatter = Formatter::new(cli.format);
            commands::execute_flush(&settings, &formatter, cancel).await
        }
    }
}
