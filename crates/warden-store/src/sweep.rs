//! Batched deletion shared by every flush
//!
//! A sweep selects candidate keys in a deterministic order and deletes them
//! in batches. Each batch is one `IMMEDIATE` transaction: select up to
//! `batch_size` keys, delete them, commit. The connection lock is released
//! between batches so application traffic interleaves with a long flush.

use crate::{Result, SqliteStore, StoreError};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, TransactionBehavior};
use warden_domain::FlushContext;

/// Upper bound on keys per `DELETE`, below SQLite's bound-variable limit
pub(crate) const MAX_BATCH_SIZE: usize = 10_000;

/// One candidate query within a flush
pub(crate) struct Sweep {
    /// Name used in logs
    pub(crate) label: &'static str,

    /// Table rows are deleted from
    pub(crate) table: &'static str,

    /// Primary key column
    pub(crate) key: &'static str,

    /// `SELECT <key> ... ORDER BY ... LIMIT ?n`, where `?n` is the parameter
    /// following `params`
    pub(crate) candidates: &'static str,

    /// Parameters bound before the limit
    pub(crate) params: Vec<Value>,
}

impl SqliteStore {
    /// Delete at most `limit` candidates of `sweep`, `batch_size` per transaction
    ///
    /// `committed_before` is added to the count carried by errors, so a flush
    /// made of several sweeps reports its total progress.
    pub(crate) fn sweep(
        &self,
        ctx: &FlushContext,
        sweep: &Sweep,
        limit: usize,
        batch_size: usize,
        committed_before: usize,
    ) -> Result<usize> {
        if limit == 0 {
            return Ok(0);
        }
        let batch_size = batch_size.clamp(1, limit.min(MAX_BATCH_SIZE));

        let mut deleted = 0;
        while deleted < limit {
            if ctx.is_cancelled() {
                tracing::info!("{} flush cancelled after {} deletions", sweep.label, deleted);
                return Err(StoreError::Cancelled {
                    committed: committed_before + deleted,
                });
            }

            let want = batch_size.min(limit - deleted);
            let removed = self
                .delete_batch(sweep, want)
                .map_err(|e| StoreError::Flush {
                    committed: committed_before + deleted,
                    source: Box::new(e),
                })?;
            deleted += removed;

            tracing::debug!(
                "{} batch committed: {} deleted ({} so far)",
                sweep.label,
                removed,
                deleted
            );

            if removed < want {
                break;
            }
        }

        Ok(deleted)
    }

    /// Select and delete one batch inside a single transaction
    fn delete_batch(&self, sweep: &Sweep, want: usize) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let keys: Vec<String> = {
            let mut stmt = tx.prepare_cached(sweep.candidates)?;
            let limit = Value::Integer(i64::try_from(want).unwrap_or(i64::MAX));
            let params = sweep.params.iter().cloned().chain(std::iter::once(limit));
            let rows = stmt.query_map(params_from_iter(params), |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        if keys.is_empty() {
            tx.commit()?;
            return Ok(0);
        }

        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            sweep.table, sweep.key, placeholders
        );
        let removed = tx.execute(&sql, params_from_iter(keys.iter()))?;
        tx.commit()?;

        Ok(removed)
    }
}
