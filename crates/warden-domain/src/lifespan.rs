//! Lifespan policy - resolves the expiration threshold per artifact class
//!
//! Resolution order, most specific first:
//! 1. Per-client override stored on the client record (applied by the store
//!    in SQL, since it varies per row)
//! 2. Per-call [`LifespanOverlay`]
//! 3. Process defaults in [`LifespanPolicy`]

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

/// Artifact classes that expire by lifespan
///
/// Trust grants are absent: they carry their own absolute expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifespanKind {
    /// Access-token sessions
    AccessToken,

    /// Refresh-token sessions
    RefreshToken,

    /// Login and consent requests
    ConsentRequest,
}

impl LifespanKind {
    /// Configuration key name
    pub fn as_str(&self) -> &'static str {
        match self {
            LifespanKind::AccessToken => "access_token_lifespan",
            LifespanKind::RefreshToken => "refresh_token_lifespan",
            LifespanKind::ConsentRequest => "consent_request_max_age",
        }
    }
}

/// Process-wide lifespan defaults
///
/// Given to a store when it is constructed and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifespanPolicy {
    /// Access-token lifespan (default 1h)
    pub access_token: Duration,

    /// Refresh-token lifespan (default 1h)
    pub refresh_token: Duration,

    /// Maximum age of login and consent requests (default 30m)
    pub consent_request_max_age: Duration,
}

impl Default for LifespanPolicy {
    fn default() -> Self {
        Self {
            access_token: HOUR,
            refresh_token: HOUR,
            consent_request_max_age: HOUR / 2,
        }
    }
}

/// Per-call overrides of the process defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifespanOverlay {
    /// Access-token lifespan override
    pub access_token: Option<Duration>,

    /// Refresh-token lifespan override
    pub refresh_token: Option<Duration>,

    /// Consent request max-age override
    pub consent_request_max_age: Option<Duration>,
}

impl LifespanOverlay {
    /// Overlay that overrides nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// True when no value is overridden
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Override the access-token lifespan
    pub fn with_access_token(mut self, lifespan: Duration) -> Self {
        self.access_token = Some(lifespan);
        self
    }

    /// Override the refresh-token lifespan
    pub fn with_refresh_token(mut self, lifespan: Duration) -> Self {
        self.refresh_token = Some(lifespan);
        self
    }

    /// Override the consent request max-age
    pub fn with_consent_request_max_age(mut self, lifespan: Duration) -> Self {
        self.consent_request_max_age = Some(lifespan);
        self
    }

    /// Override for one class, if any
    pub fn get(&self, kind: LifespanKind) -> Option<Duration> {
        match kind {
            LifespanKind::AccessToken => self.access_token,
            LifespanKind::RefreshToken => self.refresh_token,
            LifespanKind::ConsentRequest => self.consent_request_max_age,
        }
    }
}

impl LifespanPolicy {
    /// Same lifespan for every class (handy for fixtures)
    pub fn uniform(lifespan: Duration) -> Self {
        Self {
            access_token: lifespan,
            refresh_token: lifespan,
            consent_request_max_age: lifespan,
        }
    }

    /// Process default for one class
    pub fn default_for(&self, kind: LifespanKind) -> Duration {
        match kind {
            LifespanKind::AccessToken => self.access_token,
            LifespanKind::RefreshToken => self.refresh_token,
            LifespanKind::ConsentRequest => self.consent_request_max_age,
        }
    }

    /// Lifespan for a class with the overlay applied
    pub fn resolve(&self, kind: LifespanKind, overlay: &LifespanOverlay) -> Duration {
        overlay.get(kind).unwrap_or_else(|| self.default_for(kind))
    }

    /// `now - lifespan` for a class with the overlay applied
    pub fn cutoff(
        &self,
        kind: LifespanKind,
        now: DateTime<Utc>,
        overlay: &LifespanOverlay,
    ) -> DateTime<Utc> {
        cutoff(now, self.resolve(kind, overlay))
    }
}

/// `now - lifespan`, saturating at the earliest representable instant
///
/// Sub-second parts of `lifespan` are dropped, matching the integer
/// arithmetic the store performs in SQL.
pub fn cutoff(now: DateTime<Utc>, lifespan: Duration) -> DateTime<Utc> {
    let delta = TimeDelta::try_seconds(as_secs(lifespan)).unwrap_or(TimeDelta::MAX);
    now.checked_sub_signed(delta)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Lifespan in whole seconds, saturating at `i64::MAX`
pub fn as_secs(lifespan: Duration) -> i64 {
    i64::try_from(lifespan.as_secs()).unwrap_or(i64::MAX)
}
