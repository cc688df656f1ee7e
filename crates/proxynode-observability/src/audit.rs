//! Audit events for classified failures
//!
//! One event per failure with the classification and the session id the
//! failure captured when it was built, so nothing is re-derived from ambient
//! state after the correlation scope has ended.

use proxynode_core::Classify;
use std::fmt::Display;
use tracing::{error, warn};

/// Placeholder logged when a failure carries no session id
const NO_SESSION: &str = "-";

/// Emit the audit event for `failure`.
///
/// Retryable failures are logged at `warn`, everything else at `error`.
/// Unclassified failures (local contract violations) are tagged `LOCAL`.
pub fn record_failure<E>(failure: &E)
where
    E: Classify + Display,
{
    let session_id = failure.session_id().unwrap_or(NO_SESSION);

    match failure.classification() {
        Some(classification) if classification.is_retryable() => warn!(
            classification = %classification,
            session_id = %session_id,
            retryable = true,
            "{}",
            failure
        ),
        Some(classification) => error!(
            classification = %classification,
            session_id = %session_id,
            retryable = false,
            "{}",
            failure
        ),
        None => error!(
            classification = "LOCAL",
            session_id = %session_id,
            retryable = false,
            "{}",
            failure
        ),
    }
}
