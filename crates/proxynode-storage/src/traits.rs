//! Storage trait definitions

use std::collections::HashMap;

use proxynode_core::{Classify, CorrelationContext, ErrorClassification};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session store unavailable: {message}")]
    Unavailable {
        message: String,
        session_id: Option<String>,
    },

    #[error(
        "Version conflict on {key}: expected version {expected}, found {}",
        actual.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
    )]
    VersionConflict {
        key: String,
        expected: u64,
        actual: Option<u64>,
        session_id: Option<String>,
    },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// Backend unreachable or too slow. Captures the current correlation id.
    pub fn unavailable(message: impl Into<String>) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            session_id: CorrelationContext::get(),
        }
    }

    /// Conditional write lost. Captures the current correlation id.
    pub fn version_conflict(key: impl Into<String>, expected: u64, actual: Option<u64>) -> Self {
        StorageError::VersionConflict {
            key: key.into(),
            expected,
            actual,
            session_id: CorrelationContext::get(),
        }
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, StorageError::VersionConflict { .. })
    }
}

impl Classify for StorageError {
    fn classification(&self) -> Option<ErrorClassification> {
        match self {
            StorageError::Unavailable { .. } => Some(ErrorClassification::StorageUnavailable),
            StorageError::VersionConflict { .. } => {
                Some(ErrorClassification::StorageVersionConflict)
            }
            StorageError::AlreadyExists(_)
            | StorageError::NotFound(_)
            | StorageError::InvalidData(_) => None,
        }
    }

    fn session_id(&self) -> Option<&str> {
        match self {
            StorageError::Unavailable { session_id, .. }
            | StorageError::VersionConflict { session_id, .. } => session_id.as_deref(),
            _ => None,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Native representation of a record in the backend: field name to string.
pub type RecordFields = HashMap<String, String>;

/// Result of a conditional replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored version matched and the record was replaced
    Replaced,
    /// Another writer got there first
    VersionMismatch { current: u64 },
    /// Nothing stored under the key
    Missing,
}

/// Key-value backend holding session records as flat string maps.
///
/// Implementations talk to a shared store over the network and must be safe
/// to call from many tasks at once. Connectivity failures are reported as
/// [`StorageError::Unavailable`]; a missing key is never an error.
#[async_trait::async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Fetch the fields stored under `key`
    async fn get(&self, key: &str) -> StorageResult<Option<RecordFields>>;

    /// Store `fields` only if `key` is absent. Returns `false` if it was present.
    async fn insert_if_absent(&self, key: &str, fields: RecordFields) -> StorageResult<bool>;

    /// Atomically replace the record under `key` if its `version` field
    /// equals `expected_version`.
    async fn replace_if_version(
        &self,
        key: &str,
        expected_version: u64,
        fields: RecordFields,
    ) -> StorageResult<CasOutcome>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::unavailable("connection refused");
        assert_eq!(
            err.to_string(),
            "Session store unavailable: connection refused"
        );

        let err = StorageError::version_conflict("session-1", 3, Some(4));
        assert_eq!(
            err.to_string(),
            "Version conflict on session-1: expected version 3, found 4"
        );

        let err = StorageError::version_conflict("session-1", 3, None);
        assert!(err.to_string().ends_with("found none"));
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            StorageError::unavailable("down").classification(),
            Some(ErrorClassification::StorageUnavailable)
        );
        assert_eq!(
            StorageError::version_conflict("k", 1, Some(2)).classification(),
            Some(ErrorClassification::StorageVersionConflict)
        );
        assert_eq!(StorageError::NotFound("k".into()).classification(), None);
        assert_eq!(StorageError::AlreadyExists("k".into()).classification(), None);
        assert!(StorageError::version_conflict("k", 1, Some(2)).is_retryable());
        assert!(!StorageError::InvalidData("bad".into()).is_retryable());
    }

    #[tokio::test]
    async fn test_errors_capture_correlation_id_when_built() {
        let err = CorrelationContext::scope("session-77", async {
            StorageError::version_conflict("session-77", 1, Some(2))
        })
        .await;

        // Context is gone, the error still knows
        assert!(CorrelationContext::get().is_none());
        assert_eq!(err.session_id(), Some("session-77"));

        assert_eq!(StorageError::unavailable("down").session_id(), None);
    }
}
