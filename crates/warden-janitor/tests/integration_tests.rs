//! Integration tests for warden-janitor
//!
//! These tests run full janitor passes against an in-memory SQLite store
//! seeded by the fixture harness.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use warden_domain::traits::{LoginConsentStore, TrustGrantStore};
use warden_domain::{
    ConsentRequest, ErrorKind, LoginOutcome, LoginRequest, MockClock, PublicKey, StoreFailure,
    TrustGrant,
};
use warden_janitor::harness::{JanitorFixture, HARNESS_LIFESPAN, NOT_AFTER_TEST_CYCLES};
use warden_janitor::{Janitor, JanitorConfig, PassReport, Step, StepOutcome, StepSelection};
use warden_store::SqliteStore;

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn config(steps: StepSelection) -> JanitorConfig {
    JanitorConfig {
        access_token_lifespan: HARNESS_LIFESPAN,
        refresh_token_lifespan: HARNESS_LIFESPAN,
        consent_request_max_age: HARNESS_LIFESPAN,
        steps,
        ..JanitorConfig::default()
    }
}

fn janitor(config: JanitorConfig, at: DateTime<Utc>) -> Janitor {
    Janitor::new(config)
        .unwrap()
        .with_clock(Arc::new(MockClock::new(at)))
}

fn store(fixture: &JanitorFixture) -> SqliteStore {
    SqliteStore::in_memory(fixture.policy()).unwrap()
}

fn deleted(report: &PassReport, step: Step) -> usize {
    report.step(step).map(|s| s.deleted).unwrap_or(0)
}

#[test]
fn test_flush_cycles_match_predicate() {
    for (name, offset) in NOT_AFTER_TEST_CYCLES {
        let fixture = JanitorFixture::new(format!("cycle-{}", name), now());
        let store = store(&fixture);
        fixture.seed_all(&store).unwrap();

        let not_after = fixture.not_after(offset);
        let report = janitor(config(StepSelection::all()), now()).run(
            &store,
            CancellationToken::new(),
            not_after,
        );
        assert!(report.is_success(), "{}: {:?}", name, report);

        let mismatches = fixture.validate_all(&store, not_after).unwrap();
        assert!(mismatches.is_empty(), "{}: {:?}", name, mismatches);
    }
}

#[test]
fn test_flush_cycles_per_kind() {
    let selections = [
        StepSelection { requests: true, ..StepSelection::default() },
        StepSelection { tokens: true, ..StepSelection::default() },
        StepSelection { grants: true, ..StepSelection::default() },
    ];

    for (name, offset) in NOT_AFTER_TEST_CYCLES {
        for (i, steps) in selections.into_iter().enumerate() {
            let fixture = JanitorFixture::new(format!("kind-{}-{}", i, name), now());
            let store = store(&fixture);
            let not_after = fixture.not_after(offset);

            let report = if steps.requests {
                fixture.seed_login_consent(&store).unwrap();
                janitor(config(steps), now()).run(&store, CancellationToken::new(), not_after)
            } else if steps.tokens {
                fixture.seed_access_tokens(&store).unwrap();
                fixture.seed_refresh_tokens(&store).unwrap();
                janitor(config(steps), now()).run(&store, CancellationToken::new(), not_after)
            } else {
                fixture.seed_grants(&store).unwrap();
                janitor(config(steps), now()).run(&store, CancellationToken::new(), not_after)
            };
            assert!(report.is_success());

            let mismatches = if steps.requests {
                fixture.validate_login_consent(&store, not_after).unwrap()
            } else if steps.tokens {
                let mut m = fixture.validate_access_tokens(&store, not_after).unwrap();
                m.extend(fixture.validate_refresh_tokens(&store, not_after).unwrap());
                m
            } else {
                fixture.validate_grants(&store, not_after).unwrap()
            };
            assert!(mismatches.is_empty(), "{} {}: {:?}", i, name, mismatches);
        }
    }
}

#[test]
fn test_step_counts_at_now() {
    let fixture = JanitorFixture::new("counts", now());
    let store = store(&fixture);
    fixture.seed_all(&store).unwrap();

    let report = janitor(config(StepSelection::all()), now()).run(
        &store,
        CancellationToken::new(),
        fixture.not_after(std::time::Duration::ZERO),
    );

    // Two logins, plus the consent whose login survived; the third consent
    // goes with its login and is not counted
    assert_eq!(deleted(&report, Step::LoginConsent), 3);
    assert_eq!(deleted(&report, Step::AccessTokens), 2);
    assert_eq!(deleted(&report, Step::RefreshTokens), 2);
    assert_eq!(deleted(&report, Step::TrustGrants), 2);
    assert_eq!(report.total_deleted(), 9);
}

#[test]
fn test_later_not_after_never_deletes_fewer() {
    let mut previous = 0;
    for (name, offset) in NOT_AFTER_TEST_CYCLES {
        let fixture = JanitorFixture::new(format!("monotonic-{}", name), now());
        let store = store(&fixture);
        fixture.seed_all(&store).unwrap();

        let report = janitor(config(StepSelection::all()), now()).run(
            &store,
            CancellationToken::new(),
            fixture.not_after(offset),
        );
        assert!(report.total_deleted() >= previous, "{}", name);
        previous = report.total_deleted();
    }
    assert_eq!(previous, 9);
}

#[test]
fn test_login_scenarios() {
    // notAfter24h keeps all three, the other cycles drop the two oldest
    let expected = [[true, true, true], [true, true, false], [true, false, false]];

    for ((name, offset), retained) in NOT_AFTER_TEST_CYCLES.into_iter().zip(expected) {
        let fixture = JanitorFixture::new(format!("scenario-{}", name), now());
        let store = store(&fixture);
        fixture.seed_login_consent(&store).unwrap();

        janitor(config(StepSelection::all()), now()).run(
            &store,
            CancellationToken::new(),
            fixture.not_after(offset),
        );

        for (login, keep) in fixture.login_requests().iter().zip(retained) {
            let result = store.get_login_request(&login.id);
            if keep {
                assert!(result.is_ok(), "{}: {} should be retained", name, login.id);
            } else {
                assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound, "{}", name);
            }
        }
    }
}

#[test]
fn test_limit_is_strict() {
    // Every login requested well before the cutoff
    let fixture = JanitorFixture::new("limit", now() - TimeDelta::hours(3));
    let store = store(&fixture);
    fixture
        .seed_handled_logins(&store, LoginOutcome::Rejected)
        .unwrap();

    let limited = JanitorConfig {
        limit: 2,
        batch_size: 1,
        ..config(StepSelection { requests: true, ..StepSelection::default() })
    };
    let mut janitor = janitor(limited, now());

    let first = janitor.run(&store, CancellationToken::new(), now());
    assert_eq!(deleted(&first, Step::LoginConsent), 2);

    let remaining = fixture
        .login_requests()
        .iter()
        .filter(|l| store.get_login_request(&l.id).is_ok())
        .count();
    assert_eq!(remaining, 1);

    let second = janitor.run(&store, CancellationToken::new(), now());
    assert_eq!(deleted(&second, Step::LoginConsent), 1);
    for login in fixture.login_requests() {
        assert!(store.get_login_request(&login.id).is_err());
    }
}

#[test]
fn test_rounds_drain_past_limit() {
    let fixture = JanitorFixture::new("rounds", now() - TimeDelta::hours(3));
    let store = store(&fixture);
    fixture
        .seed_handled_logins(&store, LoginOutcome::Accepted)
        .unwrap();

    let config = JanitorConfig {
        limit: 2,
        batch_size: 1,
        rounds: 3,
        ..config(StepSelection { requests: true, ..StepSelection::default() })
    };
    let report = janitor(config, now()).run(&store, CancellationToken::new(), now());

    assert_eq!(deleted(&report, Step::LoginConsent), 3);
}

#[test]
fn test_pass_is_idempotent() {
    let fixture = JanitorFixture::new("idempotent", now());
    let store = store(&fixture);
    fixture.seed_all(&store).unwrap();
    let not_after = now();
    let mut janitor = janitor(config(StepSelection::all()), now());

    let first = janitor.run(&store, CancellationToken::new(), not_after);
    let second = janitor.run(&store, CancellationToken::new(), not_after);

    assert_eq!(first.total_deleted(), 9);
    assert_eq!(second.total_deleted(), 0);
    assert!(fixture.validate_all(&store, not_after).unwrap().is_empty());
    assert_eq!(janitor.metrics().pass_count, 2);
}

#[test]
fn test_consent_cascades_with_login() {
    let fixture = JanitorFixture::new("cascade", now());
    let store = store(&fixture);
    fixture.seed_login_consent(&store).unwrap();

    // A fresh consent hanging off the oldest login
    let oldest: &LoginRequest = &fixture.login_requests()[2];
    let fresh = ConsentRequest::new(
        "cascade_fresh-consent",
        Some(oldest.id.clone()),
        oldest.client_id.clone(),
        now(),
    );
    store.create_consent_request(&fresh).unwrap();

    let not_after = fixture.not_after(NOT_AFTER_TEST_CYCLES[1].1);
    let report = janitor(config(StepSelection::all()), now()).run(
        &store,
        CancellationToken::new(),
        not_after,
    );

    assert_eq!(deleted(&report, Step::LoginConsent), 1);
    assert_eq!(
        store.get_consent_request(&fresh.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(fixture.validate_login_consent(&store, not_after).unwrap().is_empty());
}

#[test]
fn test_fixtures_sharing_a_store() {
    let a = JanitorFixture::new("shared-a", now());
    let b = JanitorFixture::new("shared-b", now());
    let store = store(&a);
    a.seed_all(&store).unwrap();
    b.seed_all(&store).unwrap();

    let not_after = a.not_after(NOT_AFTER_TEST_CYCLES[1].1);
    let report = janitor(config(StepSelection::all()), now()).run(
        &store,
        CancellationToken::new(),
        not_after,
    );

    assert_eq!(report.total_deleted(), 6);
    assert!(a.validate_all(&store, not_after).unwrap().is_empty());
    assert!(b.validate_all(&store, not_after).unwrap().is_empty());
}

fn grant(issuer: &str, expires_at: DateTime<Utc>) -> TrustGrant {
    TrustGrant {
        id: Uuid::new_v4(),
        issuer: issuer.to_string(),
        subject: "subject".to_string(),
        allow_any_subject: false,
        scope: vec!["openid".to_string()],
        public_key: PublicKey {
            set: format!("{}-set", issuer),
            key_id: format!("{}-kid", issuer),
        },
        created_at: expires_at - TimeDelta::hours(1),
        expires_at,
    }
}

#[test]
fn test_unexpired_grant_survives_future_bound() {
    let store = SqliteStore::in_memory(config(StepSelection::all()).lifespan_policy()).unwrap();
    let grant = grant("unexpired", now() + TimeDelta::hours(1));
    store.create_grant(&grant).unwrap();

    let grants_only = config(StepSelection { grants: true, ..StepSelection::default() });
    let report = janitor(grants_only, now()).run(
        &store,
        CancellationToken::new(),
        now() + TimeDelta::minutes(30),
    );

    assert_eq!(deleted(&report, Step::TrustGrants), 0);
    assert!(store.get_concrete_grant(grant.id).is_ok());
}

#[test]
fn test_expired_grant_deleted() {
    let store = SqliteStore::in_memory(config(StepSelection::all()).lifespan_policy()).unwrap();
    let grant = grant("expired", now() - TimeDelta::hours(1));
    store.create_grant(&grant).unwrap();

    let grants_only = config(StepSelection { grants: true, ..StepSelection::default() });
    let report = janitor(grants_only, now()).run(&store, CancellationToken::new(), now());

    assert_eq!(deleted(&report, Step::TrustGrants), 1);
    assert_eq!(
        store.get_concrete_grant(grant.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_cancelled_pass_deletes_nothing() {
    let fixture = JanitorFixture::new("cancelled", now());
    let store = store(&fixture);
    fixture.seed_all(&store).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = janitor(config(StepSelection::all()), now()).run(&store, cancel, now());

    assert!(report.is_cancelled());
    assert_eq!(report.total_deleted(), 0);
    assert!(report
        .steps
        .iter()
        .all(|s| matches!(s.outcome, StepOutcome::Skipped)));
    assert!(report.into_result().is_err());
}

#[test]
fn test_sweep_uses_keep_if_younger() {
    let fixture = JanitorFixture::new("keep", now());
    let store = store(&fixture);
    fixture.seed_access_tokens(&store).unwrap();

    // Keep everything younger than 90 minutes: only the 2h-old token goes
    let keep = JanitorConfig {
        keep_if_younger: std::time::Duration::from_secs(90 * 60),
        ..config(StepSelection { tokens: true, ..StepSelection::default() })
    };
    let report = janitor(keep, now()).sweep(&store, CancellationToken::new());

    assert_eq!(report.not_after, now() - TimeDelta::minutes(90));
    assert_eq!(deleted(&report, Step::AccessTokens), 1);
    assert!(fixture
        .validate_access_tokens(&store, report.not_after)
        .unwrap()
        .is_empty());
}
