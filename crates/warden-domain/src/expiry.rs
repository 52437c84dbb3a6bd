//! Expiry predicate
//!
//! The storage layer deletes rows where `requested_at < min(notAfter, cutoff)`.
//! These functions mirror that comparison exactly so callers (and the test
//! harness) can compute the expected outcome for any artifact ahead of time.
//!
//! All comparisons are made on integer seconds since the Unix epoch. An
//! artifact whose timestamp equals the effective cutoff is retained.

use chrono::{DateTime, Utc};

/// Sentinel `notAfter` meaning "no caller bound"
pub const UNBOUNDED: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Whether `not_after` is the epoch-zero sentinel
pub fn is_unbounded(not_after: DateTime<Utc>) -> bool {
    not_after.timestamp() == 0
}

/// Effective cutoff in unix seconds: `min(notAfter, lifespan cutoff)`
///
/// An epoch-zero `not_after` leaves the lifespan cutoff alone in charge.
pub fn effective_cutoff(not_after: DateTime<Utc>, lifespan_cutoff: DateTime<Utc>) -> i64 {
    if is_unbounded(not_after) {
        return lifespan_cutoff.timestamp();
    }
    not_after.timestamp().min(lifespan_cutoff.timestamp())
}

/// Should an artifact requested at `requested_at` be deleted?
pub fn is_expired(
    not_after: DateTime<Utc>,
    lifespan_cutoff: DateTime<Utc>,
    requested_at: DateTime<Utc>,
) -> bool {
    effective_cutoff(not_after, lifespan_cutoff) > requested_at.timestamp()
}

/// Should a trust grant expiring at `expires_at` be deleted?
///
/// Grants carry absolute expiry, so `now` plays the part of the lifespan
/// cutoff: an unexpired grant is never deleted, whatever `not_after` says.
pub fn is_grant_expired(
    not_after: DateTime<Utc>,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> bool {
    is_expired(not_after, now, expires_at)
}
