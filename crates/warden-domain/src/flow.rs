//! Login and consent requests - the pending halves of an authorization flow

use chrono::{DateTime, Utc};

/// Decision returned by the login UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginOutcome {
    /// The end user authenticated
    Accepted,

    /// The login was refused or aborted
    Rejected,
}

impl LoginOutcome {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginOutcome::Accepted => "accepted",
            LoginOutcome::Rejected => "rejected",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(LoginOutcome::Accepted),
            "rejected" => Some(LoginOutcome::Rejected),
            _ => None,
        }
    }
}

/// A pending end-user login challenge
#[derive(Debug, Clone, PartialEq)]
pub struct LoginRequest {
    /// Login challenge
    pub id: String,

    /// Subject the login is for (may be empty before authentication)
    pub subject: String,

    /// Owning client
    pub client_id: String,

    /// Original authorization request URL
    pub request_url: String,

    /// Scopes requested by the client
    pub requested_scope: Vec<String>,

    /// When the authorization endpoint initiated the login
    pub requested_at: DateTime<Utc>,

    /// When the subject last authenticated, if known
    pub authenticated_at: Option<DateTime<Utc>>,

    /// Opaque verifier
    pub verifier: String,

    /// When the login UI returned a decision
    pub handled_at: Option<DateTime<Utc>>,

    /// The decision, once handled
    pub outcome: Option<LoginOutcome>,
}

impl LoginRequest {
    /// Create an unhandled login request
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: String::new(),
            client_id: client_id.into(),
            request_url: String::new(),
            requested_scope: Vec::new(),
            requested_at,
            authenticated_at: None,
            verifier: String::new(),
            handled_at: None,
            outcome: None,
        }
    }

    /// Has the login UI returned a decision?
    pub fn is_handled(&self) -> bool {
        self.handled_at.is_some()
    }
}

/// A pending consent challenge, child of a login request
#[derive(Debug, Clone, PartialEq)]
pub struct ConsentRequest {
    /// Consent challenge
    pub id: String,

    /// Parent login challenge (cascade source)
    pub login_challenge: Option<String>,

    /// Subject granting consent
    pub subject: String,

    /// Owning client
    pub client_id: String,

    /// Original authorization request URL
    pub request_url: String,

    /// Scopes requested by the client
    pub requested_scope: Vec<String>,

    /// When the consent request was created
    pub requested_at: DateTime<Utc>,

    /// Opaque verifier
    pub verifier: String,

    /// Anti-CSRF value
    pub csrf: String,
}

impl ConsentRequest {
    /// Create a consent request for a login challenge
    pub fn new(
        id: impl Into<String>,
        login_challenge: Option<String>,
        client_id: impl Into<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            login_challenge,
            subject: String::new(),
            client_id: client_id.into(),
            request_url: String::new(),
            requested_scope: Vec::new(),
            requested_at,
            verifier: String::new(),
            csrf: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_roundtrip() {
        for outcome in [LoginOutcome::Accepted, LoginOutcome::Rejected] {
            assert_eq!(LoginOutcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(LoginOutcome::parse("maybe"), None);
    }

    #[test]
    fn test_new_login_is_unhandled() {
        let login = LoginRequest::new("challenge", "client", Utc::now());
        assert!(!login.is_handled());
        assert!(login.outcome.is_none());
    }
}
