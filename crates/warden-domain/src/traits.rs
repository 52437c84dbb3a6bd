//! Trait definitions for storage
//!
//! These traits define the boundary between the janitor and persistence.
//! Implementations live in other crates (warden-store).
//!
//! Every `flush_inactive_*` operation shares one contract:
//! - candidates are artifacts older than `min(not_after, cutoff)`
//! - at most `limit` are deleted, in transactional batches of at most
//!   `batch_size`, in a deterministic order
//! - cancellation is checked between batches
//! - the returned count does not say whether candidates remain

use crate::{
    AccessTokenSession, Client, ConsentRequest, FlushContext, LoginOutcome, LoginRequest,
    RefreshTokenSession, TrustGrant,
};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Error categories observable by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested artifact does not exist
    NotFound,

    /// Connection loss, constraint violation, timeout
    Storage,

    /// The pass was cancelled
    Cancelled,
}

impl ErrorKind {
    /// Short name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a store error
pub trait StoreFailure {
    /// Category of this error
    fn kind(&self) -> ErrorKind;

    /// Deletions committed before a flush failed
    fn committed(&self) -> usize {
        0
    }
}

/// Artifact kinds, for error messages and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// OAuth 2.0 client
    Client,
    /// Login request
    LoginRequest,
    /// Consent request
    ConsentRequest,
    /// Access-token session
    AccessTokenSession,
    /// Refresh-token session
    RefreshTokenSession,
    /// JWT-bearer trust grant
    TrustGrant,
}

impl ArtifactKind {
    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Client => "client",
            ArtifactKind::LoginRequest => "login request",
            ArtifactKind::ConsentRequest => "consent request",
            ArtifactKind::AccessTokenSession => "access token session",
            ArtifactKind::RefreshTokenSession => "refresh token session",
            ArtifactKind::TrustGrant => "trust grant",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common base of every store trait
pub trait ArtifactStore {
    /// Error type for store operations
    type Error: StoreFailure + fmt::Display + fmt::Debug;
}

/// Client records
pub trait ClientStore: ArtifactStore {
    /// Persist a client
    fn create_client(&self, client: &Client) -> Result<(), Self::Error>;

    /// Fetch a client, NotFound when absent
    fn get_client(&self, id: &str) -> Result<Client, Self::Error>;
}

/// Login and consent requests, flushed together
pub trait LoginConsentStore: ArtifactStore {
    /// Persist a login request
    fn create_login_request(&self, request: &LoginRequest) -> Result<(), Self::Error>;

    /// Fetch a login request, NotFound when absent
    fn get_login_request(&self, challenge: &str) -> Result<LoginRequest, Self::Error>;

    /// Record the login UI's decision
    fn handle_login_request(
        &self,
        challenge: &str,
        outcome: LoginOutcome,
        handled_at: DateTime<Utc>,
    ) -> Result<LoginRequest, Self::Error>;

    /// Persist a consent request
    fn create_consent_request(&self, request: &ConsentRequest) -> Result<(), Self::Error>;

    /// Fetch a consent request, NotFound when absent
    fn get_consent_request(&self, challenge: &str) -> Result<ConsentRequest, Self::Error>;

    /// Delete expired login requests (cascading to their consent requests),
    /// then expired consent requests whose login request survived
    fn flush_inactive_login_consent_requests(
        &self,
        ctx: &FlushContext,
        not_after: DateTime<Utc>,
        limit: usize,
        batch_size: usize,
    ) -> Result<usize, Self::Error>;
}

/// Access-token sessions
pub trait AccessTokenStore: ArtifactStore {
    /// Persist an access-token session
    fn create_access_token_session(&self, session: &AccessTokenSession)
        -> Result<(), Self::Error>;

    /// Fetch an access-token session, NotFound when absent
    fn get_access_token_session(&self, signature: &str)
        -> Result<AccessTokenSession, Self::Error>;

    /// Revoke one access token
    fn delete_access_token_session(&self, signature: &str) -> Result<(), Self::Error>;

    /// Delete access-token sessions past their lifespan
    fn flush_inactive_access_tokens(
        &self,
        ctx: &FlushContext,
        not_after: DateTime<Utc>,
        limit: usize,
        batch_size: usize,
    ) -> Result<usize, Self::Error>;
}

/// Refresh-token sessions
pub trait RefreshTokenStore: ArtifactStore {
    /// Persist a refresh-token session
    fn create_refresh_token_session(&self, session: &RefreshTokenSession)
        -> Result<(), Self::Error>;

    /// Fetch a refresh-token session, NotFound when absent
    fn get_refresh_token_session(&self, signature: &str)
        -> Result<RefreshTokenSession, Self::Error>;

    /// Revoke one refresh token
    fn delete_refresh_token_session(&self, signature: &str) -> Result<(), Self::Error>;

    /// Revoke every refresh and access token issued for a request
    ///
    /// Returns the number of sessions removed.
    fn revoke_refresh_token_family(&self, request_id: &str) -> Result<usize, Self::Error>;

    /// Delete refresh-token sessions past their lifespan
    fn flush_inactive_refresh_tokens(
        &self,
        ctx: &FlushContext,
        not_after: DateTime<Utc>,
        limit: usize,
        batch_size: usize,
    ) -> Result<usize, Self::Error>;
}

/// JWT-bearer trust grants
pub trait TrustGrantStore: ArtifactStore {
    /// Persist a trust grant
    fn create_grant(&self, grant: &TrustGrant) -> Result<(), Self::Error>;

    /// Fetch a trust grant, NotFound when absent
    fn get_concrete_grant(&self, id: Uuid) -> Result<TrustGrant, Self::Error>;

    /// Delete one grant
    fn delete_grant(&self, id: Uuid) -> Result<(), Self::Error>;

    /// Delete grants that expired before `min(not_after, now)`
    fn flush_inactive_grants(
        &self,
        ctx: &FlushContext,
        not_after: DateTime<Utc>,
        limit: usize,
        batch_size: usize,
    ) -> Result<usize, Self::Error>;
}

/// Everything the janitor flushes
pub trait JanitorStore:
    LoginConsentStore + AccessTokenStore + RefreshTokenStore + TrustGrantStore
{
}

impl<T> JanitorStore for T where
    T: LoginConsentStore + AccessTokenStore + RefreshTokenStore + TrustGrantStore
{
}
