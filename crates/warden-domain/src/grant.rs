//! Trust grants (RFC 7523 JWT-bearer assertion grants)

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Public key descriptor of a trusted issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Key set name
    pub set: String,

    /// Key identifier within the set
    pub key_id: String,
}

/// Authorizes a third-party issuer to present JWT-bearer assertions
///
/// Unlike the other artifacts, a grant records its absolute expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustGrant {
    /// Grant identifier
    pub id: Uuid,

    /// Trusted issuer
    pub issuer: String,

    /// Subject the issuer may assert (empty when any subject is allowed)
    pub subject: String,

    /// Issuer may assert any subject
    pub allow_any_subject: bool,

    /// Scopes the issuer may request
    pub scope: Vec<String>,

    /// Key used to verify assertions
    pub public_key: PublicKey,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}
