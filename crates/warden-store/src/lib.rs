//! Warden Storage Layer
//!
//! Implements the store traits of `warden-domain` on SQLite.
//!
//! # Architecture
//!
//! - One [`SqliteStore`] owns the connection and implements every store trait
//! - Timestamps are unix seconds; list and map columns are JSON text
//! - Flushes select candidate keys and delete them batch by batch, one
//!   transaction per batch; the connection lock is released between batches
//!
//! # Examples
//!
//! ```no_run
//! use warden_domain::LifespanPolicy;
//! use warden_store::SqliteStore;
//!
//! let store = SqliteStore::open_dsn("sqlite://warden.db", LifespanPolicy::default()).unwrap();
//! // Store is now ready for artifact operations
//! ```

#![warn(missing_docs)]

mod access;
mod client;
mod codec;
mod dsn;
mod error;
mod flow;
mod grant;
mod refresh;
mod sweep;

pub use dsn::Dsn;
pub use error::StoreError;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use warden_domain::traits::ArtifactStore;
use warden_domain::LifespanPolicy;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// SQLite-backed implementation of every artifact store
///
/// Cloning is cheap: clones share the connection and the lifespan policy.
///
/// # Thread Safety
///
/// The connection sits behind a mutex. Single operations hold it for one
/// statement or transaction; flushes hold it for one batch at a time.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    policy: Arc<LifespanPolicy>,
}

impl SqliteStore {
    /// Open (or create) a database file
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use warden_domain::LifespanPolicy;
    /// use warden_store::SqliteStore;
    ///
    /// let store = SqliteStore::open("warden.db", LifespanPolicy::default()).unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, policy: LifespanPolicy) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, policy)
    }

    /// Create a private in-memory database (useful for testing)
    pub fn in_memory(policy: LifespanPolicy) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, policy)
    }

    /// Open the database a connection string points at
    pub fn open_dsn(dsn: &str, policy: LifespanPolicy) -> Result<Self> {
        match dsn.parse::<Dsn>()? {
            Dsn::Memory => Self::in_memory(policy),
            Dsn::File(path) => Self::open(path, policy),
        }
    }

    /// Wrap an existing connection, applying the schema
    pub fn from_connection(conn: Connection, policy: LifespanPolicy) -> Result<Self> {
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            policy: Arc::new(policy),
        })
    }

    /// Initialize the database schema
    fn initialize_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        // WAL for file-backed databases; in-memory ones silently keep "memory"
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    /// The lifespan defaults this store was built with
    pub fn policy(&self) -> &LifespanPolicy {
        &self.policy
    }

    /// Lock the connection
    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ArtifactStore for SqliteStore {
    type Error = StoreError;
}
