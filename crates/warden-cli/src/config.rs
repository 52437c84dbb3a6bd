//! Settings resolution: configuration file first, then command-line flags.

use crate::cli::Cli;
use crate::error::Result;
use warden_domain::LifespanOverlay;
use warden_janitor::{JanitorConfig, StepSelection};

/// Everything a run needs, resolved from file and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Database connection string
    pub dsn: String,

    /// Janitor configuration (limits, lifespan defaults, steps, interval)
    pub janitor: JanitorConfig,

    /// Lifespans given on the command line
    pub overlay: LifespanOverlay,
}

impl Settings {
    /// Resolve settings from parsed arguments.
    ///
    /// The file (if any) replaces the built-in defaults; flags replace file
    /// values. Lifespan flags are kept apart as an overlay so per-client
    /// overrides in the database still take precedence over them.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut janitor = match &cli.config {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                JanitorConfig::from_file(path)?
            }
            None => JanitorConfig::default(),
        };

        if let Some(keep) = cli.keep_if_younger {
            janitor.keep_if_younger = keep;
        }
        if let Some(limit) = cli.limit {
            janitor.limit = limit;
        }
        if let Some(batch_size) = cli.batch_size {
            janitor.batch_size = batch_size;
        }
        if let Some(interval) = cli.interval {
            janitor.interval = Some(interval);
        }
        if cli.tokens || cli.requests || cli.grants {
            janitor.steps = StepSelection {
                tokens: cli.tokens,
                requests: cli.requests,
                grants: cli.grants,
            };
        }
        janitor.validate()?;

        let mut overlay = LifespanOverlay::none();
        if let Some(lifespan) = cli.access_lifespan {
            overlay = overlay.with_access_token(lifespan);
        }
        if let Some(lifespan) = cli.refresh_lifespan {
            overlay = overlay.with_refresh_token(lifespan);
        }
        if let Some(lifespan) = cli.consent_request_lifespan {
            overlay = overlay.with_consent_request_max_age(lifespan);
        }

        Ok(Self {
            dsn: cli.dsn.clone(),
            janitor,
            overlay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_CONFIG;
    use clap::Parser;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use warden_domain::LifespanKind;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["janitor", "memory"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&cli(&[])).unwrap();
        assert_eq!(settings.dsn, "memory");
        assert_eq!(settings.janitor, JanitorConfig::default());
        assert!(settings.overlay.is_empty());
    }

    #[test]
    fn test_flags_override() {
        let settings = Settings::resolve(&cli(&[
            "--limit=10",
            "--batch-size=5",
            "--keep-if-younger=2h",
            "--requests",
        ]))
        .unwrap();

        assert_eq!(settings.janitor.limit, 10);
        assert_eq!(settings.janitor.batch_size, 5);
        assert_eq!(settings.janitor.keep_if_younger, Duration::from_secs(7200));
        assert!(settings.janitor.steps.requests);
        assert!(!settings.janitor.steps.tokens);
    }

    #[test]
    fn test_lifespan_flags_become_overlay() {
        let settings = Settings::resolve(&cli(&[
            "--access-lifespan=15m",
            "--consent-request-lifespan=1h",
        ]))
        .unwrap();

        assert_eq!(
            settings.overlay.get(LifespanKind::AccessToken),
            Some(Duration::from_secs(900))
        );
        assert_eq!(settings.overlay.get(LifespanKind::RefreshToken), None);
        assert_eq!(
            settings.overlay.get(LifespanKind::ConsentRequest),
            Some(Duration::from_secs(3600))
        );
        // Process defaults are untouched
        assert_eq!(
            settings.janitor.access_token_lifespan,
            JanitorConfig::default().access_token_lifespan
        );
    }

    #[test]
    fn test_file_then_flags() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "limit = 300\nbatch_size = 30\nrefresh_token_lifespan = \"2h\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let settings = Settings::resolve(&cli(&["--config", &path, "--limit=50"])).unwrap();

        assert_eq!(settings.janitor.limit, 50);
        assert_eq!(settings.janitor.batch_size, 30);
        assert_eq!(
            settings.janitor.refresh_token_lifespan,
            Duration::from_secs(7200)
        );
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = Settings::resolve(&cli(&["--limit=0"])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);

        let err = Settings::resolve(&cli(&["--config", "/nonexistent/warden.toml"])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }
}
