//! In-memory key-value backend
//!
//! Implements the same conditional-write contract a networked store offers.
//! Used for single-node deployments and tests.

use crate::record::{stored_version, EXPIRATION_FIELD};
use crate::traits::{CasOutcome, KeyValueBackend, RecordFields, StorageResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory backend; clones share the same map
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<RwLock<HashMap<String, RecordFields>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physically stored keys, expired or not
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.is_empty()
    }

    /// Physically remove records whose expiration is at or before `now_millis`.
    ///
    /// Records with an unreadable expiration are left alone. Returns the
    /// number of records removed.
    pub async fn purge_expired(&self, now_millis: i64) -> usize {
        let mut state = self.state.write().await;
        let before = state.len();
        state.retain(|_, fields| {
            fields
                .get(EXPIRATION_FIELD)
                .and_then(|e| e.parse::<i64>().ok())
                .is_none_or(|expiration| now_millis < expiration)
        });
        let removed = before - state.len();
        if removed > 0 {
            tracing::debug!("Purged {} expired session records", removed);
        }
        removed
    }
}

#[async_trait::async_trait]
impl KeyValueBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<RecordFields>> {
        let state = self.state.read().await;
        Ok(state.get(key).cloned())
    }

    async fn insert_if_absent(&self, key: &str, fields: RecordFields) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        if state.contains_key(key) {
            return Ok(false);
        }
        state.insert(key.to_string(), fields);
        Ok(true)
    }

    async fn replace_if_version(
        &self,
        key: &str,
        expected_version: u64,
        fields: RecordFields,
    ) -> StorageResult<CasOutcome> {
        let mut state = self.state.write().await;
        let Some(current) = state.get_mut(key) else {
            return Ok(CasOutcome::Missing);
        };

        let current_version = stored_version(current)?;
        if current_version != expected_version {
            return Ok(CasOutcome::VersionMismatch {
                current: current_version,
            });
        }

        *current = fields;
        Ok(CasOutcome::Replaced)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SessionRecord;

    #[tokio::test]
    async fn test_insert_if_absent() {
        let backend = InMemoryBackend::new();
        let fields = SessionRecord::new("a", 100).to_fields();

        assert!(backend.insert_if_absent("key1", fields.clone()).await.unwrap());
        assert!(!backend.insert_if_absent("key1", fields.clone()).await.unwrap());
        assert_eq!(backend.get("key1").await.unwrap(), Some(fields));
    }

    #[tokio::test]
    async fn test_replace_if_version() {
        let backend = InMemoryBackend::new();
        backend
            .insert_if_absent("key1", SessionRecord::new("a", 100).to_fields())
            .await
            .unwrap();

        let next = SessionRecord::with_version("b", 100, 2).to_fields();
        assert_eq!(
            backend.replace_if_version("key1", 1, next.clone()).await.unwrap(),
            CasOutcome::Replaced
        );

        let stale = SessionRecord::with_version("c", 100, 2).to_fields();
        assert_eq!(
            backend.replace_if_version("key1", 1, stale).await.unwrap(),
            CasOutcome::VersionMismatch { current: 2 }
        );
        assert_eq!(backend.get("key1").await.unwrap(), Some(next));

        assert_eq!(
            backend
                .replace_if_version("missing", 1, SessionRecord::new("d", 1).to_fields())
                .await
                .unwrap(),
            CasOutcome::Missing
        );
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = InMemoryBackend::new();
        backend
            .insert_if_absent("key1", SessionRecord::new("a", 100).to_fields())
            .await
            .unwrap();

        backend.delete("key1").await.unwrap();
        backend.delete("key1").await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let backend = InMemoryBackend::new();
        backend
            .insert_if_absent("old", SessionRecord::new("a", 100).to_fields())
            .await
            .unwrap();
        backend
            .insert_if_absent("fresh", SessionRecord::new("b", 10_000).to_fields())
            .await
            .unwrap();

        assert_eq!(backend.purge_expired(100).await, 1);
        assert_eq!(backend.len().await, 1);
        assert!(backend.get("fresh").await.unwrap().is_some());
        assert!(backend.get("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let backend = InMemoryBackend::new();
        let other = backend.clone();
        backend
            .insert_if_absent("key1", SessionRecord::new("a", 100).to_fields())
            .await
            .unwrap();
        assert!(other.get("key1").await.unwrap().is_some());
    }
}
