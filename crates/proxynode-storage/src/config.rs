//! Session store configuration

use proxynode_core::config::{MAX_UPDATE_ATTEMPTS, SessionStoreSettings};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Upper bound for each backend call; elapsing counts as unavailable
    pub operation_timeout: Duration,

    /// Attempts made by [`update_with`] before a conflict is surfaced
    ///
    /// [`update_with`]: crate::SessionRecordStore::update_with
    pub max_update_attempts: u32,

    /// Delay before the first retry; doubled on every further attempt
    pub retry_backoff: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(2),
            max_update_attempts: 3,
            retry_backoff: Duration::from_millis(10),
        }
    }
}

impl From<&SessionStoreSettings> for SessionStoreConfig {
    fn from(settings: &SessionStoreSettings) -> Self {
        Self {
            operation_timeout: Duration::from_millis(settings.operation_timeout_ms),
            max_update_attempts: settings
                .max_update_attempts
                .clamp(1, MAX_UPDATE_ATTEMPTS),
            ..Self::default()
        }
    }
}
