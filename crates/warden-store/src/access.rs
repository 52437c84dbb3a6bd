//! Access-token sessions

use crate::codec::{json_column, timestamp_column};
use crate::sweep::Sweep;
use crate::{Result, SqliteStore, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension};
use warden_domain::expiry::is_unbounded;
use warden_domain::lifespan::as_secs;
use warden_domain::traits::AccessTokenStore;
use warden_domain::{
    AccessTokenSession, ArtifactKind, FlushContext, LifespanKind, LifespanPolicy, TokenRequest,
};

/// JSON-encoded columns of a token request
pub(crate) struct EncodedRequest {
    pub(crate) requested_scope: String,
    pub(crate) granted_scope: String,
    pub(crate) form: String,
    pub(crate) session: String,
}

impl EncodedRequest {
    pub(crate) fn new(request: &TokenRequest) -> Result<Self> {
        Ok(Self {
            requested_scope: serde_json::to_string(&request.requested_scope)?,
            granted_scope: serde_json::to_string(&request.granted_scope)?,
            form: serde_json::to_string(&request.form)?,
            session: serde_json::to_string(&request.session)?,
        })
    }
}

/// Rebuild a token request from the columns starting at `first`:
/// request_id, client_id, requested_scope, granted_scope, form, session, requested_at
pub(crate) fn request_from_row(
    row: &rusqlite::Row<'_>,
    first: usize,
) -> rusqlite::Result<TokenRequest> {
    Ok(TokenRequest {
        id: row.get(first)?,
        client_id: row.get(first + 1)?,
        requested_scope: json_column(row, first + 2)?,
        granted_scope: json_column(row, first + 3)?,
        form: json_column(row, first + 4)?,
        session: json_column(row, first + 5)?,
        requested_at: timestamp_column(row, first + 6)?,
    })
}

/// Parameters for a token flush: bound, now, lifespan default
///
/// The candidate query compares `requested_at` against
/// `MIN(?1, ?2 - COALESCE(<client lifespan>, ?3))`, so a client's own
/// lifespan wins over the policy and overlay.
pub(crate) fn token_flush_params(
    ctx: &FlushContext,
    policy: &LifespanPolicy,
    kind: LifespanKind,
    not_after: DateTime<Utc>,
) -> Vec<Value> {
    let bound = if is_unbounded(not_after) {
        i64::MAX
    } else {
        not_after.timestamp()
    };
    let lifespan = as_secs(policy.resolve(kind, ctx.overlay()));
    vec![
        Value::Integer(bound),
        Value::Integer(ctx.now().timestamp()),
        Value::Integer(lifespan),
    ]
}

impl AccessTokenStore for SqliteStore {
    fn create_access_token_session(&self, session: &AccessTokenSession) -> Result<()> {
        let request = &session.request;
        let encoded = EncodedRequest::new(request)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO access_token_sessions
                (signature, request_id, client_id, requested_scope, granted_scope,
                 form, session, requested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &session.signature,
                &request.id,
                &request.client_id,
                encoded.requested_scope,
                encoded.granted_scope,
                encoded.form,
                encoded.session,
                request.requested_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    fn get_access_token_session(&self, signature: &str) -> Result<AccessTokenSession> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT signature, request_id, client_id, requested_scope, granted_scope,
                    form, session, requested_at
             FROM access_token_sessions WHERE signature = ?1",
            params![signature],
            |row| {
                Ok(AccessTokenSession {
                    signature: row.get(0)?,
                    request: request_from_row(row, 1)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(ArtifactKind::AccessTokenSession, signature))
    }

    fn delete_access_token_session(&self, signature: &str) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM access_token_sessions WHERE signature = ?1",
            params![signature],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found(ArtifactKind::AccessTokenSession, signature));
        }
        Ok(())
    }

    fn flush_inactive_access_tokens(
        &self,
        ctx: &FlushContext,
        not_after: DateTime<Utc>,
        limit: usize,
        batch_size: usize,
    ) -> Result<usize> {
        let sweep = Sweep {
            label: "access tokens",
            table: "access_token_sessions",
            key: "signature",
            candidates: "SELECT s.signature FROM access_token_sessions s
                 LEFT JOIN clients c ON c.id = s.client_id
                 WHERE s.requested_at < MIN(?1, ?2 - COALESCE(c.access_token_lifespan_secs, ?3))
                 ORDER BY s.requested_at, s.signature
                 LIMIT ?4",
            params: token_flush_params(ctx, self.policy(), LifespanKind::AccessToken, not_after),
        };
        let deleted = self.sweep(ctx, &sweep, limit, batch_size, 0)?;

        tracing::info!("Flushed {} access token sessions", deleted);
        Ok(deleted)
    }
}
