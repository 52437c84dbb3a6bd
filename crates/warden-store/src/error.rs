//! Error types for storage operations

use thiserror::Error;
use warden_domain::{ArtifactKind, ErrorKind, StoreFailure};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Artifact not found
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of artifact looked up
        kind: ArtifactKind,
        /// Identifier looked up
        id: String,
    },

    /// JSON column could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection string not understood
    #[error("Invalid DSN: {0}")]
    InvalidDsn(String),

    /// A thread panicked while holding the connection
    #[error("Connection lock poisoned")]
    Poisoned,

    /// A flush batch failed and was rolled back
    #[error("Flush aborted after {committed} deletions: {source}")]
    Flush {
        /// Deletions committed by earlier batches
        committed: usize,
        /// What failed
        #[source]
        source: Box<StoreError>,
    },

    /// A flush observed cancellation at a batch boundary
    #[error("Flush cancelled after {committed} deletions")]
    Cancelled {
        /// Deletions committed before cancellation
        committed: usize,
    },
}

impl StoreError {
    pub(crate) fn not_found(kind: ArtifactKind, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Is this a NotFound error?
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl StoreFailure for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Cancelled { .. } => ErrorKind::Cancelled,
            _ => ErrorKind::Storage,
        }
    }

    fn committed(&self) -> usize {
        match self {
            StoreError::Flush { committed, .. } | StoreError::Cancelled { committed } => {
                *committed
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            StoreError::not_found(ArtifactKind::TrustGrant, "x").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(StoreError::Cancelled { committed: 3 }.kind(), ErrorKind::Cancelled);
        assert_eq!(StoreError::Poisoned.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_committed_is_reported() {
        let err = StoreError::Flush {
            committed: 7,
            source: Box::new(StoreError::Poisoned),
        };
        assert_eq!(err.committed(), 7);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(StoreError::Cancelled { committed: 2 }.committed(), 2);
        assert_eq!(StoreError::Poisoned.committed(), 0);
    }

    #[test]
    fn test_not_found_message() {
        let err = StoreError::not_found(ArtifactKind::LoginRequest, "abc");
        assert_eq!(err.to_string(), "login request not found: abc");
        assert!(err.is_not_found());
    }
}
