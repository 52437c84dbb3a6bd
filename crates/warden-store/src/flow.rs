//! Login and consent requests
//!
//! Login eligibility depends only on `requested_at`. `handled_at` and
//! `outcome` are recorded but never consulted by the flush: a handled flow
//! is past retention exactly when its request is, so handled and unhandled
//! requests share one cutoff.

use crate::codec::{json_column, opt_timestamp_column, timestamp_column};
use crate::sweep::Sweep;
use crate::{Result, SqliteStore, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension};
use warden_domain::expiry::effective_cutoff;
use warden_domain::traits::LoginConsentStore;
use warden_domain::{
    ArtifactKind, ConsentRequest, FlushContext, LifespanKind, LoginOutcome, LoginRequest,
};

const LOGIN_COLUMNS: &str = "id, subject, client_id, request_url, requested_scope, requested_at, \
     authenticated_at, verifier, handled_at, outcome";

const CONSENT_COLUMNS: &str = "id, login_challenge, subject, client_id, request_url, \
     requested_scope, requested_at, verifier, csrf";

fn login_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LoginRequest> {
    let outcome: Option<String> = row.get(9)?;
    Ok(LoginRequest {
        id: row.get(0)?,
        subject: row.get(1)?,
        client_id: row.get(2)?,
        request_url: row.get(3)?,
        requested_scope: json_column(row, 4)?,
        requested_at: timestamp_column(row, 5)?,
        authenticated_at: opt_timestamp_column(row, 6)?,
        verifier: row.get(7)?,
        handled_at: opt_timestamp_column(row, 8)?,
        outcome: outcome.as_deref().and_then(LoginOutcome::parse),
    })
}

fn consent_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConsentRequest> {
    Ok(ConsentRequest {
        id: row.get(0)?,
        login_challenge: row.get(1)?,
        subject: row.get(2)?,
        client_id: row.get(3)?,
        request_url: row.get(4)?,
        requested_scope: json_column(row, 5)?,
        requested_at: timestamp_column(row, 6)?,
        verifier: row.get(7)?,
        csrf: row.get(8)?,
    })
}

impl LoginConsentStore for SqliteStore {
    fn create_login_request(&self, request: &LoginRequest) -> Result<()> {
        let scope = serde_json::to_string(&request.requested_scope)?;
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO login_requests ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                LOGIN_COLUMNS
            ),
            params![
                &request.id,
                &request.subject,
                &request.client_id,
                &request.request_url,
                scope,
                request.requested_at.timestamp(),
                request.authenticated_at.map(|t| t.timestamp()),
                &request.verifier,
                request.handled_at.map(|t| t.timestamp()),
                request.outcome.map(|o| o.as_str()),
            ],
        )?;
        Ok(())
    }

    fn get_login_request(&self, challenge: &str) -> Result<LoginRequest> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM login_requests WHERE id = ?1", LOGIN_COLUMNS),
            params![challenge],
            login_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(ArtifactKind::LoginRequest, challenge))
    }

    fn handle_login_request(
        &self,
        challenge: &str,
        outcome: LoginOutcome,
        handled_at: DateTime<Utc>,
    ) -> Result<LoginRequest> {
        let updated = {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE login_requests SET handled_at = ?1, outcome = ?2 WHERE id = ?3",
                params![handled_at.timestamp(), outcome.as_str(), challenge],
            )?
        };
        if updated == 0 {
            return Err(StoreError::not_found(ArtifactKind::LoginRequest, challenge));
        }
        self.get_login_request(challenge)
    }

    fn create_consent_request(&self, request: &ConsentRequest) -> Result<()> {
        let scope = serde_json::to_string(&request.requested_scope)?;
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO consent_requests ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                CONSENT_COLUMNS
            ),
            params![
                &request.id,
                &request.login_challenge,
                &request.subject,
                &request.client_id,
                &request.request_url,
                scope,
                request.requested_at.timestamp(),
                &request.verifier,
                &request.csrf,
            ],
        )?;
        Ok(())
    }

    fn get_consent_request(&self, challenge: &str) -> Result<ConsentRequest> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM consent_requests WHERE id = ?1", CONSENT_COLUMNS),
            params![challenge],
            consent_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(ArtifactKind::ConsentRequest, challenge))
    }

    fn flush_inactive_login_consent_requests(
        &self,
        ctx: &FlushContext,
        not_after: DateTime<Utc>,
        limit: usize,
        batch_size: usize,
    ) -> Result<usize> {
        let cutoff = ctx.cutoff(self.policy(), LifespanKind::ConsentRequest);
        let lesser = effective_cutoff(not_after, cutoff);

        // Consent requests of a deleted login go with it (ON DELETE CASCADE)
        let logins = Sweep {
            label: "login requests",
            table: "login_requests",
            key: "id",
            candidates: "SELECT id FROM login_requests
                 WHERE requested_at < ?1
                 ORDER BY requested_at, id
                 LIMIT ?2",
            params: vec![Value::Integer(lesser)],
        };
        let mut deleted = self.sweep(ctx, &logins, limit, batch_size, 0)?;

        // Expired consent requests whose login request is still around
        let consents = Sweep {
            label: "consent requests",
            table: "consent_requests",
            key: "id",
            candidates: "SELECT id FROM consent_requests
                 WHERE requested_at < ?1
                 ORDER BY requested_at, id
                 LIMIT ?2",
            params: vec![Value::Integer(lesser)],
        };
        deleted += self.sweep(ctx, &consents, limit - deleted, batch_size, deleted)?;

        tracing::info!(
            "Flushed {} login/consent requests requested before {}",
            deleted,
            lesser
        );
        Ok(deleted)
    }
}
