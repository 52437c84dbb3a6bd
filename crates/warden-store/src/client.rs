//! Client records

use crate::{Result, SqliteStore, StoreError};
use rusqlite::{params, OptionalExtension};
use std::time::Duration;
use warden_domain::lifespan::as_secs;
use warden_domain::traits::ClientStore;
use warden_domain::{ArtifactKind, Client, ClientLifespans};

fn lifespan_from_secs(secs: Option<i64>) -> Option<Duration> {
    secs.map(|s| Duration::from_secs(u64::try_from(s).unwrap_or(0)))
}

impl ClientStore for SqliteStore {
    fn create_client(&self, client: &Client) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO clients (id, access_token_lifespan_secs, refresh_token_lifespan_secs)
             VALUES (?1, ?2, ?3)",
            params![
                &client.id,
                client.lifespans.access_token.map(as_secs),
                client.lifespans.refresh_token.map(as_secs),
            ],
        )?;
        Ok(())
    }

    fn get_client(&self, id: &str) -> Result<Client> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, access_token_lifespan_secs, refresh_token_lifespan_secs
             FROM clients WHERE id = ?1",
            params![id],
            |row| {
                Ok(Client {
                    id: row.get(0)?,
                    lifespans: ClientLifespans {
                        access_token: lifespan_from_secs(row.get(1)?),
                        refresh_token: lifespan_from_secs(row.get(2)?),
                    },
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(ArtifactKind::Client, id))
    }
}
