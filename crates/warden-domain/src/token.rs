//! Token sessions - persisted state behind issued access and refresh tokens

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Form key carrying the refresh token
pub const REFRESH_TOKEN_FORM_KEY: &str = "refresh_token";

/// The authorization request a token was issued for
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRequest {
    /// Request identifier, shared by every token of one grant
    pub id: String,

    /// Owning client
    pub client_id: String,

    /// Scopes requested by the client
    pub requested_scope: Vec<String>,

    /// Scopes actually granted
    pub granted_scope: Vec<String>,

    /// Request form values
    pub form: BTreeMap<String, Vec<String>>,

    /// Opaque session blob
    pub session: serde_json::Value,

    /// When the token was requested
    pub requested_at: DateTime<Utc>,
}

impl TokenRequest {
    /// Create a request with empty scopes, form and session
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            requested_scope: Vec::new(),
            granted_scope: Vec::new(),
            form: BTreeMap::new(),
            session: serde_json::Value::Null,
            requested_at,
        }
    }
}

/// Session behind an access token, keyed by token signature
#[derive(Debug, Clone, PartialEq)]
pub struct AccessTokenSession {
    /// Token signature
    pub signature: String,

    /// Originating request
    pub request: TokenRequest,
}

impl AccessTokenSession {
    /// Create an access-token session
    pub fn new(signature: impl Into<String>, request: TokenRequest) -> Self {
        Self {
            signature: signature.into(),
            request,
        }
    }
}

/// Session behind a refresh token, keyed by token signature
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenSession {
    /// Token signature
    pub signature: String,

    /// Signature of the access token issued alongside, if any
    pub access_token_signature: Option<String>,

    /// Grant types used to obtain the token
    pub grant_types: Vec<String>,

    /// False once the token was used for rotation
    pub active: bool,

    /// Originating request
    pub request: TokenRequest,
}

impl RefreshTokenSession {
    /// Create an active refresh-token session
    ///
    /// The `refresh_token` form value is set to `<request id>.<signature>`.
    pub fn new(signature: impl Into<String>, mut request: TokenRequest) -> Self {
        let signature = signature.into();
        request.form.insert(
            REFRESH_TOKEN_FORM_KEY.to_string(),
            vec![encode_refresh_token(&request.id, &signature)],
        );
        Self {
            signature,
            access_token_signature: None,
            grant_types: vec!["refresh_token".to_string()],
            active: true,
            request,
        }
    }

    /// The encoded refresh token from the request form, if present
    pub fn refresh_token(&self) -> Option<&str> {
        self.request
            .form
            .get(REFRESH_TOKEN_FORM_KEY)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Encode a refresh token as `<id>.<signature>`
pub fn encode_refresh_token(id: &str, signature: &str) -> String {
    format!("{}.{}", id, signature)
}
