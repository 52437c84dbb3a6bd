//! Fixture harness for janitor tests
//!
//! A [`JanitorFixture`] owns three artifacts of every kind, requested at
//! `now`, `now - (lifespan + 1m)` (login requests: `+ 10m`) and
//! `now - (lifespan + 1h)`. Every identifier starts with the fixture's unique
//! name, so fixtures sharing a database never touch each other's rows.
//!
//! After a flush, the `validate_*` methods compare what the store still holds
//! with what the expiry predicate says should remain, and return every
//! artifact that disagrees.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;
use warden_domain::expiry::{is_expired, is_grant_expired};
use warden_domain::lifespan::{as_secs, cutoff};
use warden_domain::traits::{
    AccessTokenStore, ClientStore, JanitorStore, LoginConsentStore, RefreshTokenStore,
    TrustGrantStore,
};
use warden_domain::{
    AccessTokenSession, ArtifactKind, Client, ConsentRequest, ErrorKind, LifespanPolicy,
    LoginOutcome, LoginRequest, PublicKey, RefreshTokenSession, StoreFailure, TokenRequest,
    TrustGrant,
};

/// Lifespan every fixture class is configured with
pub const HARNESS_LIFESPAN: Duration = Duration::from_secs(3600);

/// `not_after` offsets (subtracted from `now`) each scenario runs with
pub const NOT_AFTER_TEST_CYCLES: [(&str, Duration); 3] = [
    ("notAfter24h", Duration::from_secs(24 * 3600)),
    ("notAfter1h30m", Duration::from_secs(3600 + 1800)),
    ("notAfterNow", Duration::ZERO),
];

/// Whether an artifact should survive a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Still readable after the flush
    Retained,
    /// Gone after the flush
    Deleted,
}

impl Expectation {
    fn from_expired(expired: bool) -> Self {
        if expired {
            Expectation::Deleted
        } else {
            Expectation::Retained
        }
    }
}

/// An artifact whose presence disagrees with the expiry predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Artifact identifier
    pub id: String,
    /// What the predicate expected
    pub expected: Expectation,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actual = match self.expected {
            Expectation::Retained => "deleted",
            Expectation::Deleted => "retained",
        };
        write!(f, "{} {} was {} (expected {:?})", self.kind, self.id, actual, self.expected)
    }
}

/// Three artifacts of every kind under one unique name
#[derive(Debug, Clone)]
pub struct JanitorFixture {
    unique_name: String,
    now: DateTime<Utc>,
    lifespan: Duration,
    logins: Vec<LoginRequest>,
    consents: Vec<ConsentRequest>,
    access_tokens: Vec<AccessTokenSession>,
    refresh_tokens: Vec<RefreshTokenSession>,
    grants: Vec<TrustGrant>,
}

impl JanitorFixture {
    /// Build fixtures relative to `now` with [`HARNESS_LIFESPAN`]
    pub fn new(unique_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        let unique_name = unique_name.into();
        let lifespan = HARNESS_LIFESPAN;
        let l = TimeDelta::seconds(as_secs(lifespan));
        let login_offsets = [
            TimeDelta::zero(),
            l + TimeDelta::minutes(10),
            l + TimeDelta::hours(1),
        ];
        let offsets = [
            TimeDelta::zero(),
            l + TimeDelta::minutes(1),
            l + TimeDelta::hours(1),
        ];
        let scope = vec!["foo".to_string(), "bar".to_string()];

        let mut logins = Vec::new();
        let mut consents = Vec::new();
        let mut access_tokens = Vec::new();
        let mut refresh_tokens = Vec::new();
        let mut grants = Vec::new();

        for (i, (login_offset, offset)) in login_offsets.iter().zip(offsets.iter()).enumerate() {
            let n = i + 1;
            let flow_client = format!("{}_flush-login-consent-{}", unique_name, n);

            let login_id = format!("{}_flush-login-{}", unique_name, n);
            let requested_at = now - *login_offset;
            let mut login = LoginRequest::new(login_id.clone(), flow_client.clone(), requested_at);
            login.subject = login_id.clone();
            login.request_url = "http://localhost".to_string();
            login.requested_scope = scope.clone();
            login.authenticated_at = Some(requested_at);
            login.verifier = login_id.clone();
            logins.push(login);

            let consent_id = format!("{}_flush-consent-{}", unique_name, n);
            let mut consent =
                ConsentRequest::new(consent_id.clone(), Some(login_id), flow_client, now - *offset);
            consent.subject = consent_id.clone();
            consent.request_url = "http://redirect".to_string();
            consent.requested_scope = scope.clone();
            consent.verifier = consent_id.clone();
            consent.csrf = consent_id;
            consents.push(consent);

            let access_id = format!("{}_flush-access-{}", unique_name, n);
            let mut request = TokenRequest::new(access_id.clone(), access_id.clone(), now - *offset);
            request.requested_scope = scope.clone();
            request.granted_scope = scope.clone();
            request.session = serde_session(&access_id);
            access_tokens.push(AccessTokenSession::new(access_id, request));

            let refresh_id = format!("{}_flush-refresh-{}", unique_name, n);
            let mut request = TokenRequest::new(refresh_id.clone(), refresh_id.clone(), now - *offset);
            request.requested_scope = scope.clone();
            request.granted_scope = scope.clone();
            request.session = serde_session(&refresh_id);
            refresh_tokens.push(RefreshTokenSession::new(refresh_id, request));

            let created_at = now - *offset;
            grants.push(TrustGrant {
                id: Uuid::new_v4(),
                issuer: format!("{}_flush-grant-iss-{}", unique_name, n),
                subject: format!("{}_flush-grant-sub-{}", unique_name, n),
                allow_any_subject: false,
                scope: vec!["openid".to_string(), "offline".to_string()],
                public_key: PublicKey {
                    set: format!("{}_flush-grant-{}", unique_name, n),
                    key_id: format!("{}_flush-grant-kid-{}", unique_name, n),
                },
                created_at,
                expires_at: created_at + l,
            });
        }

        Self {
            unique_name,
            now,
            lifespan,
            logins,
            consents,
            access_tokens,
            refresh_tokens,
            grants,
        }
    }

    /// Prefix shared by every identifier
    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    /// The instant fixtures were generated against
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Lifespan policy the store under test must use
    pub fn policy(&self) -> LifespanPolicy {
        LifespanPolicy::uniform(self.lifespan)
    }

    /// `not_after` for a cycle offset
    pub fn not_after(&self, offset: Duration) -> DateTime<Utc> {
        self.now - TimeDelta::seconds(as_secs(offset))
    }

    /// Login request fixtures
    pub fn login_requests(&self) -> &[LoginRequest] {
        &self.logins
    }

    /// Consent request fixtures, each linked to the login of the same index
    pub fn consent_requests(&self) -> &[ConsentRequest] {
        &self.consents
    }

    /// Access-token session fixtures
    pub fn access_tokens(&self) -> &[AccessTokenSession] {
        &self.access_tokens
    }

    /// Refresh-token session fixtures
    pub fn refresh_tokens(&self) -> &[RefreshTokenSession] {
        &self.refresh_tokens
    }

    /// Trust grant fixtures
    pub fn grants(&self) -> &[TrustGrant] {
        &self.grants
    }

    /// Persist login requests, their consent requests and owning clients
    pub fn seed_login_consent<S>(&self, store: &S) -> Result<(), S::Error>
    where
        S: ClientStore + LoginConsentStore,
    {
        for login in &self.logins {
            store.create_client(&Client::new(login.client_id.clone()))?;
            store.create_login_request(login)?;
        }
        for consent in &self.consents {
            store.create_consent_request(consent)?;
        }
        Ok(())
    }

    /// Persist login requests only, each marked handled with `outcome`
    pub fn seed_handled_logins<S>(&self, store: &S, outcome: LoginOutcome) -> Result<(), S::Error>
    where
        S: ClientStore + LoginConsentStore,
    {
        for login in &self.logins {
            store.create_client(&Client::new(login.client_id.clone()))?;
            store.create_login_request(login)?;
            store.handle_login_request(&login.id, outcome, self.now)?;
        }
        Ok(())
    }

    /// Persist access-token sessions and their clients
    pub fn seed_access_tokens<S>(&self, store: &S) -> Result<(), S::Error>
    where
        S: ClientStore + AccessTokenStore,
    {
        for session in &self.access_tokens {
            store.create_client(&Client::new(session.request.client_id.clone()))?;
            store.create_access_token_session(session)?;
        }
        Ok(())
    }

    /// Persist refresh-token sessions and their clients
    pub fn seed_refresh_tokens<S>(&self, store: &S) -> Result<(), S::Error>
    where
        S: ClientStore + RefreshTokenStore,
    {
        for session in &self.refresh_tokens {
            store.create_client(&Client::new(session.request.client_id.clone()))?;
            store.create_refresh_token_session(session)?;
        }
        Ok(())
    }

    /// Persist trust grants
    pub fn seed_grants<S: TrustGrantStore>(&self, store: &S) -> Result<(), S::Error> {
        for grant in &self.grants {
            store.create_grant(grant)?;
        }
        Ok(())
    }

    /// Persist every fixture
    pub fn seed_all<S>(&self, store: &S) -> Result<(), S::Error>
    where
        S: ClientStore + JanitorStore,
    {
        self.seed_login_consent(store)?;
        self.seed_access_tokens(store)?;
        self.seed_refresh_tokens(store)?;
        self.seed_grants(store)
    }

    fn lifespan_cutoff(&self) -> DateTime<Utc> {
        cutoff(self.now, self.lifespan)
    }

    /// Expected fate of a login request
    pub fn expect_login(&self, login: &LoginRequest, not_after: DateTime<Utc>) -> Expectation {
        Expectation::from_expired(is_expired(not_after, self.lifespan_cutoff(), login.requested_at))
    }

    /// Expected fate of a consent request: its own expiry, or its login's
    pub fn expect_consent(&self, consent: &ConsentRequest, not_after: DateTime<Utc>) -> Expectation {
        let own = is_expired(not_after, self.lifespan_cutoff(), consent.requested_at);
        let parent = consent
            .login_challenge
            .as_deref()
            .and_then(|id| self.logins.iter().find(|l| l.id == id))
            .map(|login| self.expect_login(login, not_after) == Expectation::Deleted)
            .unwrap_or(false);
        Expectation::from_expired(own || parent)
    }

    /// Expected fate of a token session requested at `requested_at`
    pub fn expect_token(&self, requested_at: DateTime<Utc>, not_after: DateTime<Utc>) -> Expectation {
        Expectation::from_expired(is_expired(not_after, self.lifespan_cutoff(), requested_at))
    }

    /// Expected fate of a trust grant
    pub fn expect_grant(&self, grant: &TrustGrant, not_after: DateTime<Utc>) -> Expectation {
        Expectation::from_expired(is_grant_expired(not_after, self.now, grant.expires_at))
    }

    /// Compare login and consent requests against the predicate
    pub fn validate_login_consent<S: LoginConsentStore>(
        &self,
        store: &S,
        not_after: DateTime<Utc>,
    ) -> Result<Vec<Mismatch>, S::Error> {
        let mut mismatches = Vec::new();
        for login in &self.logins {
            tracing::debug!("login flush check: {}", login.id);
            check(
                ArtifactKind::LoginRequest,
                &login.id,
                self.expect_login(login, not_after),
                store.get_login_request(&login.id),
                &mut mismatches,
            )?;
        }
        for consent in &self.consents {
            tracing::debug!("consent flush check: {}", consent.id);
            check(
                ArtifactKind::ConsentRequest,
                &consent.id,
                self.expect_consent(consent, not_after),
                store.get_consent_request(&consent.id),
                &mut mismatches,
            )?;
        }
        Ok(mismatches)
    }

    /// Compare access-token sessions against the predicate
    pub fn validate_access_tokens<S: AccessTokenStore>(
        &self,
        store: &S,
        not_after: DateTime<Utc>,
    ) -> Result<Vec<Mismatch>, S::Error> {
        let mut mismatches = Vec::new();
        for session in &self.access_tokens {
            check(
                ArtifactKind::AccessTokenSession,
                &session.signature,
                self.expect_token(session.request.requested_at, not_after),
                store.get_access_token_session(&session.signature),
                &mut mismatches,
            )?;
        }
        Ok(mismatches)
    }

    /// Compare refresh-token sessions against the predicate
    pub fn validate_refresh_tokens<S: RefreshTokenStore>(
        &self,
        store: &S,
        not_after: DateTime<Utc>,
    ) -> Result<Vec<Mismatch>, S::Error> {
        let mut mismatches = Vec::new();
        for session in &self.refresh_tokens {
            check(
                ArtifactKind::RefreshTokenSession,
                &session.signature,
                self.expect_token(session.request.requested_at, not_after),
                store.get_refresh_token_session(&session.signature),
                &mut mismatches,
            )?;
        }
        Ok(mismatches)
    }

    /// Compare trust grants against the predicate
    pub fn validate_grants<S: TrustGrantStore>(
        &self,
        store: &S,
        not_after: DateTime<Utc>,
    ) -> Result<Vec<Mismatch>, S::Error> {
        let mut mismatches = Vec::new();
        for grant in &self.grants {
            check(
                ArtifactKind::TrustGrant,
                &grant.issuer,
                self.expect_grant(grant, not_after),
                store.get_concrete_grant(grant.id),
                &mut mismatches,
            )?;
        }
        Ok(mismatches)
    }

    /// Compare every fixture against the predicate
    pub fn validate_all<S: JanitorStore>(
        &self,
        store: &S,
        not_after: DateTime<Utc>,
    ) -> Result<Vec<Mismatch>, S::Error> {
        let mut mismatches = self.validate_login_consent(store, not_after)?;
        mismatches.extend(self.validate_access_tokens(store, not_after)?);
        mismatches.extend(self.validate_refresh_tokens(store, not_after)?);
        mismatches.extend(self.validate_grants(store, not_after)?);
        Ok(mismatches)
    }
}

fn serde_session(subject: &str) -> serde_json::Value {
    serde_json::json!({ "subject": subject })
}

/// Record a mismatch when presence disagrees with `expected`
fn check<T, E: StoreFailure>(
    kind: ArtifactKind,
    id: &str,
    expected: Expectation,
    lookup: Result<T, E>,
    mismatches: &mut Vec<Mismatch>,
) -> Result<(), E> {
    let present = match lookup {
        Ok(_) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => return Err(e),
    };
    let actual = if present {
        Expectation::Retained
    } else {
        Expectation::Deleted
    };
    if actual != expected {
        mismatches.push(Mismatch {
            kind,
            id: id.to_string(),
            expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> JanitorFixture {
        JanitorFixture::new("unit", DateTime::from_timestamp(1_700_000_000, 0).unwrap())
    }

    #[test]
    fn test_offsets() {
        let f = fixture();
        let ages: Vec<i64> = f
            .login_requests()
            .iter()
            .map(|l| (f.now() - l.requested_at).num_minutes())
            .collect();
        assert_eq!(ages, vec![0, 70, 120]);

        let ages: Vec<i64> = f
            .access_tokens()
            .iter()
            .map(|s| (f.now() - s.request.requested_at).num_minutes())
            .collect();
        assert_eq!(ages, vec![0, 61, 120]);

        let expiries: Vec<i64> = f
            .grants()
            .iter()
            .map(|g| (g.expires_at - f.now()).num_minutes())
            .collect();
        assert_eq!(expiries, vec![60, -1, -60]);
    }

    #[test]
    fn test_identifiers_share_prefix() {
        let f = fixture();
        assert!(f.login_requests().iter().all(|l| l.id.starts_with("unit_")));
        assert!(f.consent_requests().iter().all(|c| c.id.starts_with("unit_")));
        assert!(f.refresh_tokens().iter().all(|r| r.signature.starts_with("unit_")));
        assert!(f.grants().iter().all(|g| g.issuer.starts_with("unit_")));
    }

    #[test]
    fn test_expectations_per_cycle() {
        let f = fixture();
        let expected = |cycle: usize| -> Vec<Expectation> {
            let not_after = f.not_after(NOT_AFTER_TEST_CYCLES[cycle].1);
            f.login_requests()
                .iter()
                .map(|l| f.expect_login(l, not_after))
                .collect()
        };
        use Expectation::*;

        assert_eq!(expected(0), vec![Retained, Retained, Retained]);
        assert_eq!(expected(1), vec![Retained, Retained, Deleted]);
        assert_eq!(expected(2), vec![Retained, Deleted, Deleted]);
    }

    #[test]
    fn test_consent_follows_parent() {
        let f = fixture();
        let not_after = f.not_after(NOT_AFTER_TEST_CYCLES[1].1);
        let oldest = &f.login_requests()[2];
        let fresh = ConsentRequest::new(
            "unit_fresh-consent",
            Some(oldest.id.clone()),
            oldest.client_id.clone(),
            f.now(),
        );

        assert_eq!(f.expect_login(oldest, not_after), Expectation::Deleted);
        assert_eq!(f.expect_consent(&fresh, not_after), Expectation::Deleted);
        assert_eq!(
            f.expect_consent(&f.consent_requests()[0], not_after),
            Expectation::Retained
        );
    }

    #[test]
    fn test_unexpired_grant_always_retained() {
        let f = fixture();
        let grant = &f.grants()[0];
        let far_future = f.now() + TimeDelta::days(365);
        assert_eq!(f.expect_grant(grant, far_future), Expectation::Retained);
    }
}
