//! Warden Janitor
//!
//! Orchestrates the removal of expired authorization-server state.
//!
//! # Overview
//!
//! A janitor pass runs up to four steps, always in this order:
//!
//! | Step | Artifacts | Lifespan |
//! |------|-----------|----------|
//! | `login_consent` | login requests, then consent requests | consent request max age |
//! | `access_tokens` | access-token sessions | access token (client override first) |
//! | `refresh_tokens` | refresh-token sessions | refresh token (client override first) |
//! | `trust_grants` | JWT-bearer trust grants | absolute `expires_at` |
//!
//! Every step shares one `now` snapshot and one `not_after` bound. An artifact
//! is deleted only when it is older than both the bound and its lifespan
//! cutoff. A failing step does not prevent later steps; cancellation skips
//! the remaining ones.
//!
//! # Usage
//!
//! ## One-time Pass
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use warden_janitor::{Janitor, JanitorConfig};
//! use warden_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = JanitorConfig::default();
//! let store = SqliteStore::open("warden.db", config.lifespan_policy())?;
//! let mut janitor = Janitor::new(config)?;
//!
//! let report = janitor.sweep(&store, CancellationToken::new());
//! for step in &report.steps {
//!     println!("{}: {}", step.step, step.deleted);
//! }
//! report.into_result()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Worker
//!
//! See [`JanitorWorker`].
//!
//! # Configuration
//!
//! ```toml
//! limit = 100000
//! batch_size = 100
//! keep_if_younger = "0s"
//! access_token_lifespan = "1h"
//! refresh_token_lifespan = "1h"
//! consent_request_max_age = "30m"
//! interval = "10m"
//!
//! [steps]
//! tokens = true
//! requests = true
//! grants = false
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod flusher;
pub mod harness;
mod janitor;
mod metrics;
mod report;
mod worker;

pub use config::{JanitorConfig, StepSelection};
pub use error::JanitorError;
pub use flusher::BatchedFlusher;
pub use janitor::{Janitor, JanitorState};
pub use metrics::JanitorMetrics;
pub use report::{PassReport, Step, StepFailure, StepOutcome, StepReport};
pub use worker::JanitorWorker;
