//! Custom error types for the flyer library.
//!
//! This module defines the primary error type, `FlyerError`, for the whole
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the failure modes of the flyer lifecycle, from
//! caller-side precondition violations to errors raised inside the injected
//! activity function.
//!
//! ## Error Hierarchy
//!
//! `FlyerError` is an enum that consolidates the error kinds of the contract:
//!
//! - **`ConcurrentFly`**: a `kickoff()` was issued while a previous fly cycle
//!   is still in flight. Cycles are rejected, never queued, so at most one
//!   worker mutates a flyer's buffer at a time.
//! - **`NoActiveFly`**: `complete()` was called with no live cycle, either
//!   because `kickoff()` was never issued or because the cycle was already
//!   collected.
//! - **`AlreadyResolved`**: a status object was resolved twice. This is a
//!   programming error (an internal invariant breach), not a runtime
//!   condition, and should be treated as non-recoverable.
//! - **`WaitTimeout`**: a caller-supplied deadline elapsed while waiting on a
//!   status. Deadlines are entirely the caller's responsibility; the flyer
//!   itself never imposes one.
//! - **`Activity`**: wraps whatever error the injected activity function
//!   returned. The worker task is the fault boundary: activity failures are
//!   captured into the status objects and surface through `wait()`, never by
//!   unwinding across the host process.
//!
//! By using `?` with the [`FlyResult`] alias, call sites propagate these
//! errors the same way the rest of the crate does.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the library error type.
pub type FlyResult<T> = std::result::Result<T, FlyerError>;

/// Failure modes of the flyer lifecycle contract.
#[derive(Error, Debug, Clone)]
pub enum FlyerError {
    /// `kickoff()` while a fly cycle is already in flight.
    #[error("a fly cycle is already in progress")]
    ConcurrentFly,

    /// `complete()` with no live (kicked-off, uncollected) cycle.
    #[error("no fly cycle in progress")]
    NoActiveFly,

    /// Double resolution of an [`crate::status::ActivityStatus`].
    #[error("status already resolved")]
    AlreadyResolved,

    /// Caller-supplied deadline elapsed while waiting on a status.
    #[error("timed out after {0:?} waiting for status resolution")]
    WaitTimeout(Duration),

    /// The injected activity function failed; carries the original error.
    #[error("flyer activity failed: {0}")]
    Activity(Arc<anyhow::Error>),
}

impl FlyerError {
    /// Wraps an activity error for storage in a shared, cloneable outcome.
    pub fn activity(err: anyhow::Error) -> Self {
        FlyerError::Activity(Arc::new(err))
    }
}
