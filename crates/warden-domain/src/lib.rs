//! Warden Domain Layer
//!
//! This crate contains the domain model for the expired-state janitor of an
//! OAuth 2.0 / OpenID Connect authorization server. It defines the artifacts the
//! janitor collects, the expiry predicate, lifespan resolution, and the trait
//! interfaces that storage drivers implement.
//!
//! ## Key Concepts
//!
//! - **Artifacts**: login requests, consent requests, access-token sessions,
//!   refresh-token sessions and JWT-bearer trust grants
//! - **notAfter**: caller-supplied deletion cutoff
//! - **Lifespan cutoff**: `now - lifespan` for an artifact class
//! - **Lesser**: `min(notAfter, lifespan cutoff)`, the effective cutoff
//!
//! ## Architecture
//!
//! - Pure types and logic only, no I/O
//! - Storage implementations live in `warden-store`
//! - Every timestamp is compared at whole-second resolution

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod clock;
pub mod context;
pub mod expiry;
pub mod flow;
pub mod grant;
pub mod lifespan;
pub mod token;
pub mod traits;

// Re-exports for convenience
pub use client::{Client, ClientLifespans};
pub use clock::{Clock, MockClock, SystemClock};
pub use context::FlushContext;
pub use flow::{ConsentRequest, LoginOutcome, LoginRequest};
pub use grant::{PublicKey, TrustGrant};
pub use lifespan::{LifespanKind, LifespanOverlay, LifespanPolicy};
pub use token::{AccessTokenSession, RefreshTokenSession, TokenRequest};
pub use traits::{ArtifactKind, ErrorKind, StoreFailure};
