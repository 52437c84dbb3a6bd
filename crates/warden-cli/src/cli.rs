//! CLI argument definitions and parsing.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Remove expired OAuth 2.0 and OpenID Connect state.
///
/// Deletes login and consent requests, access and refresh token sessions,
/// and trust grants that are older than both `--keep-if-younger` and their
/// lifespan.
#[derive(Debug, Parser)]
#[command(name = "janitor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Database connection string (sqlite://<path>, memory, or a file path)
    #[arg(env = "DSN")]
    pub dsn: String,

    /// Keep everything requested within this window (e.g. 1h, 30m)
    #[arg(long, value_parser = parse_duration)]
    pub keep_if_younger: Option<Duration>,

    /// Maximum age of login and consent requests
    #[arg(long, value_parser = parse_duration)]
    pub consent_request_lifespan: Option<Duration>,

    /// Access token lifespan, unless a client overrides it
    #[arg(long, value_parser = parse_duration)]
    pub access_lifespan: Option<Duration>,

    /// Refresh token lifespan, unless a client overrides it
    #[arg(long, value_parser = parse_duration)]
    pub refresh_lifespan: Option<Duration>,

    /// Maximum rows deleted per step
    #[arg(long)]
    pub limit: Option<usize>,

    /// Rows deleted per transaction
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only flush access and refresh tokens (combinable)
    #[arg(long)]
    pub tokens: bool,

    /// Only flush login and consent requests (combinable)
    #[arg(long)]
    pub requests: bool,

    /// Only flush trust grants (combinable)
    #[arg(long)]
    pub grants: bool,

    /// Keep running, one pass per interval, until interrupted
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: CliFormat,
}

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// `step=<name> deleted=<n> err=<kind>` lines
    Text,
    /// One JSON object per step
    Json,
}

/// Parse a human-readable duration such as `90s`, `1h30m` or `24h`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}
