//! Connection string parsing
//!
//! Accepted forms:
//! - `memory`, `:memory:`, `sqlite::memory:`, `sqlite://:memory:`
//! - `sqlite://<path>` or `sqlite:<path>` (query parameters are ignored)
//! - a bare filesystem path

use crate::StoreError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dsn {
    /// Private in-memory database
    Memory,

    /// Database file
    File(PathBuf),
}

impl FromStr for Dsn {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(StoreError::InvalidDsn("empty connection string".to_string()));
        }

        let rest = if let Some(rest) = s.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = s.strip_prefix("sqlite:") {
            rest
        } else if let Some((scheme, _)) = s.split_once("://") {
            return Err(StoreError::InvalidDsn(format!(
                "unsupported scheme '{}'",
                scheme
            )));
        } else {
            s
        };

        // `file:` URIs and query parameters carry nothing we use
        let rest = rest.strip_prefix("file:").unwrap_or(rest);
        let path = rest.split('?').next().unwrap_or_default();

        match path {
            "" => Err(StoreError::InvalidDsn(format!("no database path in '{}'", s))),
            "memory" | ":memory:" => Ok(Dsn::Memory),
            path => Ok(Dsn::File(PathBuf::from(path))),
        }
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dsn::Memory => f.write_str("sqlite::memory:"),
            Dsn::File(path) => write!(f, "sqlite://{}", path.display()),
        }
    }
}
