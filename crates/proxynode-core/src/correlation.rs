//! Task-scoped correlation context
//!
//! Carries the session id of the authentication exchange currently being
//! served so that log lines and errors can be attributed without threading
//! the id through every call. The slot lives in tokio task-local storage:
//! concurrently running tasks never observe each other's session id, and the
//! value disappears when the owning scope ends, even if it is dropped
//! mid-flight.

use std::cell::RefCell;
use std::future::Future;

use tracing::Instrument;

use crate::{Error, Result};

tokio::task_local! {
    static SESSION_ID: RefCell<Option<String>>;
}

/// Accessor for the current task's correlation slot.
///
/// # Example
/// ```no_run
/// # use proxynode_core::CorrelationContext;
/// # async fn example() {
/// CorrelationContext::scope("session-42", async {
///     assert_eq!(CorrelationContext::get().as_deref(), Some("session-42"));
/// })
/// .await;
/// assert!(CorrelationContext::get().is_none());
/// # }
/// ```
pub struct CorrelationContext;

impl CorrelationContext {
    /// Run `future` with `session_id` as the current correlation id.
    ///
    /// The future is instrumented with a `session` span carrying the id.
    /// An enclosing scope's id is shadowed for the duration and restored
    /// afterwards.
    pub async fn scope<F>(session_id: impl Into<String>, future: F) -> F::Output
    where
        F: Future,
    {
        let session_id = session_id.into();
        let span = tracing::info_span!("session", session_id = %session_id);
        SESSION_ID
            .scope(RefCell::new(Some(session_id)), future.instrument(span))
            .await
    }

    /// Synchronous counterpart of [`CorrelationContext::scope`].
    pub fn scope_sync<F, R>(session_id: impl Into<String>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let session_id = session_id.into();
        let span = tracing::info_span!("session", session_id = %session_id);
        let _entered = span.enter();
        SESSION_ID.sync_scope(RefCell::new(Some(session_id)), f)
    }

    /// Run `future` with an empty slot that can be filled with [`set`].
    ///
    /// [`set`]: CorrelationContext::set
    pub async fn slot<F>(future: F) -> F::Output
    where
        F: Future,
    {
        SESSION_ID.scope(RefCell::new(None), future).await
    }

    /// Set the correlation id for the rest of the enclosing slot.
    ///
    /// The returned guard restores the previous value when dropped, so the
    /// id is cleared on every exit path of the scope holding the guard.
    /// Fails when the current task has no slot.
    pub fn set(session_id: impl Into<String>) -> Result<CorrelationGuard> {
        let session_id = session_id.into();
        SESSION_ID
            .try_with(|slot| slot.replace(Some(session_id)))
            .map(|previous| CorrelationGuard { previous })
            .map_err(|_| {
                Error::Internal("No correlation slot is open for the current task".to_string())
            })
    }

    /// Current correlation id, if any.
    pub fn get() -> Option<String> {
        SESSION_ID
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten()
    }

    /// Clear the current correlation id. A no-op outside a slot.
    pub fn clear() {
        let _ = SESSION_ID.try_with(|slot| slot.replace(None));
    }
}

/// Restores the previous correlation id on drop.
///
/// Must be dropped on the task that created it.
#[must_use = "dropping the guard immediately clears the correlation id"]
#[derive(Debug)]
pub struct CorrelationGuard {
    previous: Option<String>,
}

impl Drop for CorrelationGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = SESSION_ID.try_with(|slot| slot.replace(previous));
    }
}
