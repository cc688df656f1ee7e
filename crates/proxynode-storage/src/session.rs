//! Versioned session record store
//!
//! Typed access to session records kept in a [`KeyValueBackend`]. Updates
//! are compare-and-write on the record version: an update naming a version
//! that has already been superseded is rejected instead of overwriting the
//! newer state. Nothing is cached locally, every call goes to the backend.

use crate::config::SessionStoreConfig;
use crate::record::{now_millis, SessionRecord};
use crate::traits::{CasOutcome, KeyValueBackend, StorageError, StorageResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Upper bound for a single sleep between `update_with` attempts
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Session record store
pub struct SessionRecordStore {
    backend: Arc<dyn KeyValueBackend>,
    config: SessionStoreConfig,
}

impl SessionRecordStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, config: SessionStoreConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &SessionStoreConfig {
        &self.config
    }

    fn validate_key(key: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidData(
                "Session key cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (1-based), doubling from
    /// `retry_backoff` and capped at [`MAX_RETRY_BACKOFF`]
    fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.config
            .retry_backoff
            .saturating_mul(factor)
            .min(MAX_RETRY_BACKOFF)
    }

    /// Run one backend call under the configured timeout
    async fn call<T, F>(&self, operation: &str, future: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::unavailable(format!(
                "{} timed out after {}ms",
                operation,
                self.config.operation_timeout.as_millis()
            ))),
        }
    }

    /// Create a record under `key` and return its initial version.
    ///
    /// Fails with [`StorageError::AlreadyExists`] while a live record holds
    /// the key. A logically expired occupant is replaced.
    #[instrument(skip(self, value))]
    pub async fn create(
        &self,
        key: &str,
        value: impl Into<String>,
        expiration: i64,
    ) -> StorageResult<u64> {
        Self::validate_key(key)?;
        let record = SessionRecord::new(value, expiration);

        if self
            .call("create", self.backend.insert_if_absent(key, record.to_fields()))
            .await?
        {
            debug!("Created session record");
            return Ok(record.version);
        }

        let occupant = match self.call("create", self.backend.get(key)).await? {
            Some(fields) => SessionRecord::from_fields(&fields)?,
            None => {
                // Deleted between the two calls
                return if self
                    .call("create", self.backend.insert_if_absent(key, record.to_fields()))
                    .await?
                {
                    Ok(record.version)
                } else {
                    Err(StorageError::AlreadyExists(key.to_string()))
                };
            }
        };

        if !occupant.is_expired_at(now_millis()) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }

        match self
            .call(
                "create",
                self.backend
                    .replace_if_version(key, occupant.version, record.to_fields()),
            )
            .await?
        {
            CasOutcome::Replaced => {
                debug!(
                    stale_version = occupant.version,
                    "Replaced expired session record"
                );
                Ok(record.version)
            }
            CasOutcome::VersionMismatch { .. } | CasOutcome::Missing => {
                Err(StorageError::AlreadyExists(key.to_string()))
            }
        }
    }

    /// Read the record under `key`.
    ///
    /// Returns `None` when the key is absent or the record's expiration has
    /// passed, whether or not the backend has evicted it yet.
    #[instrument(skip(self))]
    pub async fn read(&self, key: &str) -> StorageResult<Option<SessionRecord>> {
        Self::validate_key(key)?;

        let Some(fields) = self.call("read", self.backend.get(key)).await? else {
            return Ok(None);
        };

        let record = SessionRecord::from_fields(&fields)?;
        if record.is_expired_at(now_millis()) {
            debug!(expiration = record.expiration, "Session record expired");
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Replace the record if its stored version is still `expected_version`.
    ///
    /// Returns `expected_version + 1` on success. A stale version fails with
    /// [`StorageError::VersionConflict`] and leaves the stored record as it
    /// was; the caller is expected to re-read and try again. Never retries
    /// by itself, see [`update_with`](Self::update_with) for that.
    #[instrument(skip(self, new_value))]
    pub async fn update(
        &self,
        key: &str,
        new_value: impl Into<String>,
        expected_version: u64,
        new_expiration: i64,
    ) -> StorageResult<u64> {
        let current = self
            .read(key)
            .await?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        if current.version != expected_version {
            return Err(StorageError::version_conflict(
                key,
                expected_version,
                Some(current.version),
            ));
        }

        let next_version = expected_version.checked_add(1).ok_or_else(|| {
            StorageError::InvalidData(format!("Version of {} cannot be incremented", key))
        })?;
        let next = SessionRecord::with_version(new_value, new_expiration, next_version);

        match self
            .call(
                "update",
                self.backend
                    .replace_if_version(key, expected_version, next.to_fields()),
            )
            .await?
        {
            CasOutcome::Replaced => {
                debug!(version = next_version, "Updated session record");
                Ok(next_version)
            }
            CasOutcome::VersionMismatch { current } => Err(StorageError::version_conflict(
                key,
                expected_version,
                Some(current),
            )),
            CasOutcome::Missing => Err(StorageError::NotFound(key.to_string())),
        }
    }

    /// Read-modify-write loop over [`update`](Self::update).
    ///
    /// `modify` receives the current record and returns the new value and
    /// expiration. On a version conflict the record is re-read and `modify`
    /// runs again, up to `max_update_attempts` times in total, sleeping
    /// `retry_backoff * 2^(attempt - 1)` between attempts, never more than
    /// [`MAX_RETRY_BACKOFF`]. The last conflict is returned once attempts
    /// run out.
    #[instrument(skip(self, modify))]
    pub async fn update_with<F>(&self, key: &str, mut modify: F) -> StorageResult<u64>
    where
        F: FnMut(&SessionRecord) -> (String, i64) + Send,
    {
        let max_attempts = self.config.max_update_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let current = self
                .read(key)
                .await?
                .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
            let (value, expiration) = modify(&current);

            match self.update(key, value, current.version, expiration).await {
                Err(e) if e.is_version_conflict() && attempt < max_attempts => {
                    let backoff = self.retry_delay(attempt);
                    warn!(
                        "Version conflict on attempt {}/{}, retrying in {}ms",
                        attempt,
                        max_attempts,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                }
                result => return result,
            }
        }
    }

    /// Delete the record under `key`. Deleting an absent key succeeds.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        Self::validate_key(key)?;
        self.call("delete", self.backend.delete(key)).await?;
        debug!("Deleted session record");
        Ok(())
    }
}
