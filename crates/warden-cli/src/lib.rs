//! Warden CLI library.
//!
//! Argument parsing, settings resolution, the flush and watch commands, and
//! report formatting for the `janitor` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, CliFormat};
pub use config::Settings;
pub use error::{CliError, Result};
pub use output::Formatter;
