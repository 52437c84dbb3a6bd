//! Trust grants

use crate::codec::{json_column, timestamp_column};
use crate::sweep::Sweep;
use crate::{Result, SqliteStore, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;
use warden_domain::expiry::effective_cutoff;
use warden_domain::traits::TrustGrantStore;
use warden_domain::{ArtifactKind, FlushContext, PublicKey, TrustGrant};

fn grant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrustGrant> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    Ok(TrustGrant {
        id,
        issuer: row.get(1)?,
        subject: row.get(2)?,
        allow_any_subject: row.get(3)?,
        scope: json_column(row, 4)?,
        public_key: PublicKey {
            set: row.get(5)?,
            key_id: row.get(6)?,
        },
        created_at: timestamp_column(row, 7)?,
        expires_at: timestamp_column(row, 8)?,
    })
}

impl TrustGrantStore for SqliteStore {
    fn create_grant(&self, grant: &TrustGrant) -> Result<()> {
        let scope = serde_json::to_string(&grant.scope)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO trust_grants
                (id, issuer, subject, allow_any_subject, scope, key_set, key_id,
                 created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                grant.id.to_string(),
                &grant.issuer,
                &grant.subject,
                grant.allow_any_subject,
                scope,
                &grant.public_key.set,
                &grant.public_key.key_id,
                grant.created_at.timestamp(),
                grant.expires_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    fn get_concrete_grant(&self, id: Uuid) -> Result<TrustGrant> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, issuer, subject, allow_any_subject, scope, key_set, key_id,
                    created_at, expires_at
             FROM trust_grants WHERE id = ?1",
            params![id.to_string()],
            grant_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(ArtifactKind::TrustGrant, id.to_string()))
    }

    fn delete_grant(&self, id: Uuid) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM trust_grants WHERE id = ?1",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found(ArtifactKind::TrustGrant, id.to_string()));
        }
        Ok(())
    }

    fn flush_inactive_grants(
        &self,
        ctx: &FlushContext,
        not_after: DateTime<Utc>,
        limit: usize,
        batch_size: usize,
    ) -> Result<usize> {
        // Absolute expiry: `now` stands in for the lifespan cutoff
        let lesser = effective_cutoff(not_after, ctx.now());
        let sweep = Sweep {
            label: "trust grants",
            table: "trust_grants",
            key: "id",
            candidates: "SELECT id FROM trust_grants
                 WHERE expires_at < ?1
                 ORDER BY expires_at, id
                 LIMIT ?2",
            params: vec![Value::Integer(lesser)],
        };
        let deleted = self.sweep(ctx, &sweep, limit, batch_size, 0)?;

        tracing::info!("Flushed {} trust grants expired before {}", deleted, lesser);
        Ok(deleted)
    }
}
