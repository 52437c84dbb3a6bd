//! Client module - the owner every artifact references

use std::time::Duration;

/// Per-client lifespan overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientLifespans {
    /// Access-token lifespan for this client
    pub access_token: Option<Duration>,

    /// Refresh-token lifespan for this client
    pub refresh_token: Option<Duration>,
}

/// An OAuth 2.0 client, reduced to what the janitor needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Client identifier
    pub id: String,

    /// Lifespan overrides for this client's tokens
    pub lifespans: ClientLifespans,
}

impl Client {
    /// Client without lifespan overrides
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lifespans: ClientLifespans::default(),
        }
    }

    /// Set this client's access-token lifespan
    pub fn with_access_token_lifespan(mut self, lifespan: Duration) -> Self {
        self.lifespans.access_token = Some(lifespan);
        self
    }

    /// Set this client's refresh-token lifespan
    pub fn with_refresh_token_lifespan(mut self, lifespan: Duration) -> Self {
        self.lifespans.refresh_token = Some(lifespan);
        self
    }
}
