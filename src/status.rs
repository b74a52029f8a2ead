//! Resolve-once status objects for asynchronous device phases.
//!
//! An [`ActivityStatus`] is a single-writer, multi-reader future representing
//! the completion (success or failure) of one asynchronous phase of a device,
//! built on `tokio::sync::watch` for multi-subscriber notifications. It is the
//! only synchronization primitive flyers and their callers share: no shared
//! mutable flags, no blocking calls inside the device operations themselves.
//!
//! # Features
//!
//! - Resolve exactly once; a second resolution is rejected as a defect
//! - Broadcast semantics: resolution wakes all current and future waiters
//! - Optional caller-supplied deadline on `wait`
//! - Non-blocking polls via `is_done` / `outcome`
//!
//! # Example
//!
//! ```rust,ignore
//! let status = ActivityStatus::new();
//!
//! let waiter = status.clone();
//! tokio::spawn(async move {
//!     match waiter.wait(None).await {
//!         Ok(Outcome::Success) => println!("phase finished"),
//!         Ok(Outcome::Failure(err)) => println!("phase failed: {err}"),
//!         Err(e) => println!("wait error: {e}"),
//!     }
//! });
//!
//! // Resolution from the worker side (notifies all subscribers)
//! status.resolve_success()?;
//! ```

use crate::error::{FlyResult, FlyerError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// The stored resolution of a phase.
///
/// `Failure` carries the activity's original error, `Arc`-wrapped so the
/// outcome stays cheap to clone across every subscriber.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// The phase finished normally.
    Success,
    /// The phase failed; carries the original activity error.
    Failure(Arc<anyhow::Error>),
}

impl Outcome {
    /// Returns true for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// The stored activity error, if this outcome is a failure.
    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(err) => Some(err),
        }
    }

    /// Converts the outcome into a result, mapping failures to
    /// [`FlyerError::Activity`].
    pub fn into_result(self) -> FlyResult<()> {
        match self {
            Outcome::Success => Ok(()),
            Outcome::Failure(err) => Err(FlyerError::Activity(err)),
        }
    }
}

/// A resolve-once, broadcast-on-resolution future for one device phase.
///
/// Cloning produces another handle to the same status; resolution through any
/// handle is observed by all of them. The watch channel that backs the status
/// doubles as the synchronizes-with edge the flyer contract needs: buffer
/// writes made by a worker before it resolves a status are visible to any
/// reader that observed the resolution.
#[derive(Clone, Debug)]
pub struct ActivityStatus {
    slot: Arc<watch::Sender<Option<Outcome>>>,
}

impl Default for ActivityStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityStatus {
    /// Creates an unresolved status.
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot: Arc::new(slot) }
    }

    /// Marks the phase as finished successfully.
    ///
    /// Fails with [`FlyerError::AlreadyResolved`] if the status was resolved
    /// before, by either resolution method.
    pub fn resolve_success(&self) -> FlyResult<()> {
        self.resolve(Outcome::Success)
    }

    /// Marks the phase as failed, storing the original error.
    ///
    /// Same double-resolution guard as [`ActivityStatus::resolve_success`].
    pub fn resolve_failure(&self, err: Arc<anyhow::Error>) -> FlyResult<()> {
        self.resolve(Outcome::Failure(err))
    }

    fn resolve(&self, outcome: Outcome) -> FlyResult<()> {
        let mut first = false;
        self.slot.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(outcome);
                first = true;
                true
            } else {
                false
            }
        });
        if first {
            Ok(())
        } else {
            Err(FlyerError::AlreadyResolved)
        }
    }

    /// Non-blocking poll: has the phase been resolved yet?
    pub fn is_done(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Non-blocking peek at the stored outcome, if resolved.
    pub fn outcome(&self) -> Option<Outcome> {
        self.slot.borrow().clone()
    }

    /// Suspends the caller until the status is resolved, or until `timeout`
    /// elapses.
    ///
    /// Waiting on an already-resolved status returns immediately with the
    /// stored outcome. A `None` timeout waits indefinitely; the flyer itself
    /// never imposes a deadline, so bounding the wait is the caller's call.
    pub async fn wait(&self, timeout: Option<Duration>) -> FlyResult<Outcome> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.resolved())
                .await
                .map_err(|_| FlyerError::WaitTimeout(limit)),
            None => Ok(self.resolved().await),
        }
    }

    async fn resolved(&self) -> Outcome {
        let mut rx = self.slot.subscribe();
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            // The sender is owned by `self`, so the channel stays open for
            // the duration of this wait.
            let _ = rx.changed().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_status_is_unresolved() {
        let status = ActivityStatus::new();
        assert!(!status.is_done());
        assert!(status.outcome().is_none());
    }

    #[test]
    fn test_double_resolution_is_rejected() {
        let status = ActivityStatus::new();
        status.resolve_success().unwrap();
        assert!(matches!(
            status.resolve_success(),
            Err(FlyerError::AlreadyResolved)
        ));
        assert!(matches!(
            status.resolve_failure(Arc::new(anyhow::anyhow!("late"))),
            Err(FlyerError::AlreadyResolved)
        ));
    }

    #[test]
    fn test_clones_observe_the_same_resolution() {
        let status = ActivityStatus::new();
        let other = status.clone();
        status.resolve_success().unwrap();
        assert!(other.is_done());
        assert!(other.outcome().is_some_and(|o| o.is_success()));
    }

    #[tokio::test]
    async fn test_wait_on_resolved_status_returns_immediately() {
        let status = ActivityStatus::new();
        status
            .resolve_failure(Arc::new(anyhow::anyhow!("shutter stuck")))
            .unwrap();

        let outcome = status.wait(None).await.unwrap();
        assert!(!outcome.is_success());
        assert!(outcome
            .error()
            .is_some_and(|e| e.to_string().contains("shutter stuck")));
    }

    #[tokio::test]
    async fn test_resolution_wakes_multiple_waiters() {
        let status = ActivityStatus::new();
        let mut waiters = Vec::new();
        for _ in 0..4 {
            let s = status.clone();
            waiters.push(tokio::spawn(async move { s.wait(None).await }));
        }

        status.resolve_success().unwrap();
        for handle in waiters {
            let outcome = handle.await.unwrap().unwrap();
            assert!(outcome.is_success());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_when_unresolved() {
        let status = ActivityStatus::new();
        let result = status.wait(Some(Duration::from_millis(50))).await;
        assert!(matches!(result, Err(FlyerError::WaitTimeout(_))));

        // Resolution after the timeout still succeeds for other waiters.
        status.resolve_success().unwrap();
        assert!(status.wait(None).await.unwrap().is_success());
    }

    #[test]
    fn test_outcome_into_result() {
        assert!(Outcome::Success.into_result().is_ok());
        let failed = Outcome::Failure(Arc::new(anyhow::anyhow!("beam lost")));
        assert!(matches!(
            failed.into_result(),
            Err(FlyerError::Activity(_))
        ));
    }
}
