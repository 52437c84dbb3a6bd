//! Configuration for Janitor operations
//!
//! Defines flush limits, lifespan defaults and which steps run.

use crate::{JanitorError, Step};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use warden_domain::LifespanPolicy;

const HOUR: Duration = Duration::from_secs(3600);

/// Configuration for the Janitor service
///
/// Every field has a default, so a TOML file only needs the values it
/// changes.
///
/// # Examples
///
/// ```
/// use warden_janitor::JanitorConfig;
///
/// let config = JanitorConfig::default();
/// assert_eq!(config.limit, 100_000);
/// assert_eq!(config.batch_size, 100);
///
/// let config: JanitorConfig = toml::from_str(r#"
///     limit = 500
///     access_token_lifespan = "15m"
/// "#).unwrap();
/// assert_eq!(config.limit, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JanitorConfig {
    /// Maximum rows deleted per step per round
    /// Default: 100000
    pub limit: usize,

    /// Rows deleted per transaction
    /// Default: 100
    pub batch_size: usize,

    /// Keep rows requested within this window regardless of lifespan
    /// Default: 0s (the lifespans alone decide)
    #[serde(with = "humantime_serde")]
    pub keep_if_younger: Duration,

    /// Default access-token lifespan
    /// Default: 1h
    #[serde(with = "humantime_serde")]
    pub access_token_lifespan: Duration,

    /// Default refresh-token lifespan
    /// Default: 1h
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifespan: Duration,

    /// Maximum age of login and consent requests
    /// Default: 30m
    #[serde(with = "humantime_serde")]
    pub consent_request_max_age: Duration,

    /// Flush invocations per step while each round hits the limit
    /// Default: 1
    pub rounds: usize,

    /// Run a pass on this interval instead of once
    /// Default: none
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,

    /// Which steps run
    pub steps: StepSelection,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            limit: 100_000,
            batch_size: 100,
            keep_if_younger: Duration::ZERO,
            access_token_lifespan: HOUR,
            refresh_token_lifespan: HOUR,
            consent_request_max_age: HOUR / 2,
            rounds: 1,
            interval: None,
            steps: StepSelection::default(),
        }
    }
}

impl JanitorConfig {
    /// Load configuration from a TOML file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, JanitorError> {
        let contents = fs::read_to_string(path)?;
        let config: JanitorConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no pass can run with
    ///
    /// A batch size above the limit is not an error; the flusher clamps it.
    pub fn validate(&self) -> Result<(), JanitorError> {
        if self.limit == 0 {
            return Err(JanitorError::Config("limit must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(JanitorError::Config("batch size must be at least 1".into()));
        }
        if self.rounds == 0 {
            return Err(JanitorError::Config("rounds must be at least 1".into()));
        }
        if self.interval == Some(Duration::ZERO) {
            return Err(JanitorError::Config("interval must be positive".into()));
        }
        Ok(())
    }

    /// Lifespan defaults handed to the store
    pub fn lifespan_policy(&self) -> LifespanPolicy {
        LifespanPolicy {
            access_token: self.access_token_lifespan,
            refresh_token: self.refresh_token_lifespan,
            consent_request_max_age: self.consent_request_max_age,
        }
    }
}

/// Step groups to run; when none is selected, every step runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepSelection {
    /// Access and refresh tokens
    pub tokens: bool,

    /// Login and consent requests
    pub requests: bool,

    /// Trust grants
    pub grants: bool,
}

impl StepSelection {
    /// Every step
    pub fn all() -> Self {
        Self::default()
    }

    /// Does this selection run `step`?
    pub fn includes(&self, step: Step) -> bool {
        if !(self.tokens || self.requests || self.grants) {
            return true;
        }
        match step {
            Step::LoginConsent => self.requests,
            Step::AccessTokens | Step::RefreshTokens => self.tokens,
            Step::TrustGrants => self.grants,
        }
    }
}
