//! Failure classification shared by the storage and egress layers
//!
//! Every failure that crosses a component boundary is tagged with the origin
//! of the failure so callers and the audit log can react without inspecting
//! the underlying cause.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClassification {
    /// The remote service rejected the request as invalid (4xx)
    ClientError,
    /// The remote service failed or returned an unusable response
    RemoteServerError,
    /// Transport failure before any response was received
    NetworkError,
    /// A conditional update lost against a concurrent writer
    StorageVersionConflict,
    /// The key-value backend could not be reached in time
    StorageUnavailable,
}

impl ErrorClassification {
    /// Wire name, e.g. `REMOTE_SERVER_ERROR`
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClassification::ClientError => "CLIENT_ERROR",
            ErrorClassification::RemoteServerError => "REMOTE_SERVER_ERROR",
            ErrorClassification::NetworkError => "NETWORK_ERROR",
            ErrorClassification::StorageVersionConflict => "STORAGE_VERSION_CONFLICT",
            ErrorClassification::StorageUnavailable => "STORAGE_UNAVAILABLE",
        }
    }

    /// Whether repeating the operation unchanged may succeed.
    ///
    /// A client error needs the input fixed first; everything else is
    /// transient from the caller's point of view.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorClassification::ClientError)
    }

    /// Classify an HTTP status code received from a remote service.
    ///
    /// Only the client-error range maps to `ClientError`; any other
    /// non-success range is the server's fault.
    pub fn from_status(status: u16) -> Self {
        match status {
            400..=499 => ErrorClassification::ClientError,
            _ => ErrorClassification::RemoteServerError,
        }
    }
}

impl fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by component errors that can be attributed and classified.
pub trait Classify {
    /// The failure origin, or `None` for a local contract violation
    /// (bad input, bad configuration, corrupt data).
    fn classification(&self) -> Option<ErrorClassification>;

    /// Session id that was active when the failure was built
    fn session_id(&self) -> Option<&str>;

    fn is_retryable(&self) -> bool {
        self.classification()
            .map(|c| c.is_retryable())
            .unwrap_or(false)
    }
}
