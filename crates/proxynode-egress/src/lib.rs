//! ProxyNode Egress Connectors
//!
//! This crate provides clients for the services the proxy node calls out to:
//! - Verify Service Provider (authentication request generation)

pub mod client;
pub mod vsp;

use proxynode_core::{Classify, ErrorClassification};
use thiserror::Error;

/// Cause of a failed outbound request
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum EgressError {
    /// An outbound call failed; carries the session id active at the time
    #[error("Exception of type [{classification}] whilst contacting uri: {uri}")]
    Request {
        classification: ErrorClassification,
        uri: String,
        session_id: Option<String>,
        #[source]
        cause: RequestFailure,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl EgressError {
    /// Target URI of a failed outbound call
    pub fn uri(&self) -> Option<&str> {
        match self {
            EgressError::Request { uri, .. } => Some(uri),
            _ => None,
        }
    }
}

impl Classify for EgressError {
    fn classification(&self) -> Option<ErrorClassification> {
        match self {
            EgressError::Request { classification, .. } => Some(*classification),
            EgressError::InvalidRequest(_) | EgressError::ConfigError(_) => None,
        }
    }

    fn session_id(&self) -> Option<&str> {
        match self {
            EgressError::Request { session_id, .. } => session_id.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EgressError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_request_error_display_and_source() {
        let err = EgressError::Request {
            classification: ErrorClassification::RemoteServerError,
            uri: "http://vsp.local/generate-request".to_string(),
            session_id: Some("session-1".to_string()),
            cause: RequestFailure::Status {
                status: 500,
                body: "boom".to_string(),
            },
        };

        assert_eq!(
            err.to_string(),
            "Exception of type [REMOTE_SERVER_ERROR] whilst contacting uri: http://vsp.local/generate-request"
        );
        assert_eq!(err.source().unwrap().to_string(), "HTTP status 500: boom");
        assert_eq!(err.uri(), Some("http://vsp.local/generate-request"));
        assert_eq!(err.session_id(), Some("session-1"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_local_errors_are_unclassified() {
        let err = EgressError::InvalidRequest("empty session id".to_string());
        assert_eq!(err.classification(), None);
        assert_eq!(err.uri(), None);
        assert!(!err.is_retryable());

        let err = EgressError::ConfigError("bad url".to_string());
        assert!(err.to_string().contains("Invalid configuration"));
    }
}
