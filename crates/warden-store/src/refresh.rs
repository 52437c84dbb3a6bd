//! Refresh-token sessions

use crate::access::{request_from_row, token_flush_params, EncodedRequest};
use crate::codec::json_column;
use crate::sweep::Sweep;
use crate::{Result, SqliteStore, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use warden_domain::traits::RefreshTokenStore;
use warden_domain::{ArtifactKind, FlushContext, LifespanKind, RefreshTokenSession};

impl RefreshTokenStore for SqliteStore {
    fn create_refresh_token_session(&self, session: &RefreshTokenSession) -> Result<()> {
        let request = &session.request;
        let encoded = EncodedRequest::new(request)?;
        let grant_types = serde_json::to_string(&session.grant_types)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO refresh_token_sessions
                (signature, access_token_signature, grant_types, active,
                 request_id, client_id, requested_scope, granted_scope,
                 form, session, requested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                &session.signature,
                &session.access_token_signature,
                grant_types,
                session.active,
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

    fn get_refresh_token_session(&self, signature: &str) -> Result<RefreshTokenSession> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT signature, access_token_signature, grant_types, active,
                    request_id, client_id, requested_scope, granted_scope,
                    form, session, requested_at
             FROM refresh_token_sessions WHERE signature = ?1",
            params![signature],
            |row| {
                Ok(RefreshTokenSession {
                    signature: row.get(0)?,
                    access_token_signature: row.get(1)?,
                    grant_types: json_column(row, 2)?,
                    active: row.get(3)?,
                    request: request_from_row(row, 4)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(ArtifactKind::RefreshTokenSession, signature))
    }

    fn delete_refresh_token_session(&self, signature: &str) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM refresh_token_sessions WHERE signature = ?1",
            params![signature],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found(ArtifactKind::RefreshTokenSession, signature));
        }
        Ok(())
    }

    fn revoke_refresh_token_family(&self, request_id: &str) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let refresh = tx.execute(
            "DELETE FROM refresh_token_sessions WHERE request_id = ?1",
            params![request_id],
        )?;
        let access = tx.execute(
            "DELETE FROM access_token_sessions WHERE request_id = ?1",
            params![request_id],
        )?;
        tx.commit()?;

        tracing::debug!(
            "Revoked request {}: {} refresh and {} access token sessions",
            request_id,
            refresh,
            access
        );
        Ok(refresh + access)
    }

    fn flush_inactive_refresh_tokens(
        &self,
        ctx: &FlushContext,
        not_after: DateTime<Utc>,
        limit: usize,
        batch_size: usize,
    ) -> Result<usize> {
        let sweep = Sweep {
            label: "refresh tokens",
            table: "refresh_token_sessions",
            key: "signature",
            candidates: "SELECT s.signature FROM refresh_token_sessions s
                 LEFT JOIN clients c ON c.id = s.client_id
                 WHERE s.requested_at < MIN(?1, ?2 - COALESCE(c.refresh_token_lifespan_secs, ?3))
                 ORDER BY s.requested_at, s.signature
                 LIMIT ?4",
            params: token_flush_params(ctx, self.policy(), LifespanKind::RefreshToken, not_after),
        };
        let deleted = self.sweep(ctx, &sweep, limit, batch_size, 0)?;

        tracing::info!("Flushed {} refresh token sessions", deleted);
        Ok(deleted)
    }
}
