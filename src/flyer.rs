//! The flyer lifecycle engine.
//!
//! A flyer is a device that, once started, performs a time-bounded background
//! activity (hardware acquisition, typically) independently of the caller and
//! later hands off the collected records through a fixed four-operation
//! protocol: `kickoff`, `complete`, `collect`, `describe`.
//!
//! # Architecture
//!
//! The engine is capability-based rather than an inheritance chain: one
//! [`Flyer`] parameterized by an injected [`FlyerActivity`] replaces a base
//! device subclassed per variant. The activity runs on its own Tokio task and
//! talks back exclusively through a [`FlyContext`], so blocking-style work is
//! fine there; the caller's operations never suspend.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --kickoff()--> Flying --worker resolves complete--> (finished)
//!   ^                                                          |
//!   +----------------------- collect() ----------------------- +
//! ```
//!
//! The caller and the worker share exactly two [`ActivityStatus`] objects and
//! the record buffer. The kickoff status resolves as soon as the activity is
//! underway, never later than the complete status. Activity errors are
//! captured into the statuses; the worker task is the fault boundary and a
//! failing activity cannot crash the host process.

use crate::document::{new_uid, now_secs, DataKey, Record};
use crate::error::{FlyResult, FlyerError};
use crate::status::ActivityStatus;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

type RecordBuffer = Arc<Mutex<VecDeque<Record>>>;

/// Handle through which an activity reports back to its flyer.
///
/// The context owns clones of the cycle's buffer and kickoff status; it is
/// the only channel between the worker task and the flyer's observable state.
#[derive(Clone)]
pub struct FlyContext {
    start_time: f64,
    buffer: RecordBuffer,
    kickoff_status: ActivityStatus,
}

impl FlyContext {
    /// Cycle start time, seconds since Unix epoch.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Seconds elapsed since `kickoff` stamped the cycle start.
    pub fn elapsed(&self) -> f64 {
        now_secs() - self.start_time
    }

    /// Signals that the activity is underway by resolving the kickoff status.
    ///
    /// Call this before any long-running work so callers waiting on
    /// `kickoff()` unblock as soon as acquisition has begun, not when it has
    /// finished. Idempotent: the worker resolves the status itself on both
    /// exit paths if the activity never got here.
    pub fn mark_started(&self) {
        if self.kickoff_status.resolve_success().is_ok() {
            debug!("activity marked started");
        }
    }

    /// Appends one record to the cycle buffer (FIFO order).
    pub fn push(&self, record: Record) {
        self.buffer.lock().push_back(record);
    }
}

/// The injected background activity of a flyer variant.
///
/// Implementations run on the worker task, append [`Record`]s through the
/// context as they are produced, and declare the schema of what they emit.
/// Returning `Err` marks the cycle failed; the error is captured into the
/// cycle's statuses and surfaces through `complete().wait()`.
#[async_trait]
pub trait FlyerActivity: Send + Sync {
    /// Runs one fly cycle's worth of acquisition.
    async fn fly(&self, ctx: FlyContext) -> Result<()>;

    /// Static schema for the fields every emitted record carries.
    fn data_keys(&self) -> HashMap<String, DataKey>;
}

/// The interface an orchestrating run engine drives, in this fixed order:
/// `kickoff` then `complete` then `collect`, with `describe` callable at any
/// point. Object-safe so engines can hold heterogeneous flyers.
pub trait Flyable: Send {
    /// Device name, used to key schemas and record streams downstream.
    fn name(&self) -> &str;

    /// Starts a fly cycle; see [`Flyer::kickoff`].
    fn kickoff(&mut self) -> FlyResult<ActivityStatus>;

    /// Returns the current cycle's completion status; see [`Flyer::complete`].
    fn complete(&self) -> FlyResult<ActivityStatus>;

    /// Drains this cycle's records; see [`Flyer::collect`].
    fn collect(&mut self) -> Box<dyn Iterator<Item = Record> + Send>;

    /// Static schema for collected records; see [`Flyer::describe`].
    fn describe(&self) -> HashMap<String, DataKey>;
}

/// Per-cycle state owned by one flyer.
struct FlyerState {
    start_time: f64,
    buffer: RecordBuffer,
    kickoff_status: Option<ActivityStatus>,
    complete_status: Option<ActivityStatus>,
    /// Clone of the complete status retained for the concurrent-kickoff
    /// guard. Unlike `complete_status` it survives an early `collect`, so a
    /// still-running worker keeps blocking the next cycle.
    in_flight: Option<ActivityStatus>,
}

impl FlyerState {
    fn new() -> Self {
        Self {
            start_time: 0.0,
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            kickoff_status: None,
            complete_status: None,
            in_flight: None,
        }
    }
}

/// A flyer device: one injected activity plus the lifecycle state machine.
pub struct Flyer {
    name: String,
    activity: Arc<dyn FlyerActivity>,
    state: FlyerState,
}

impl Flyer {
    /// Creates an idle flyer around the given activity.
    pub fn new(name: impl Into<String>, activity: Arc<dyn FlyerActivity>) -> Self {
        Self {
            name: name.into(),
            activity,
            state: FlyerState::new(),
        }
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True while a kicked-off cycle's worker has not yet resolved completion.
    pub fn is_flying(&self) -> bool {
        self.state
            .in_flight
            .as_ref()
            .is_some_and(|status| !status.is_done())
    }

    /// The current cycle's kickoff status, if a cycle is live.
    pub fn kickoff_status(&self) -> Option<ActivityStatus> {
        self.state.kickoff_status.clone()
    }

    /// Number of records the current cycle has appended so far.
    ///
    /// Partial results are visible here while the activity is still running;
    /// they only become collectable once the complete status resolves.
    pub fn pending_records(&self) -> usize {
        self.state.buffer.lock().len()
    }

    /// Starts a fly cycle.
    ///
    /// Stamps the cycle start time, clears the buffer, creates fresh kickoff
    /// and complete statuses and launches exactly one worker task running the
    /// activity. Returns the kickoff status immediately; it resolves once the
    /// activity is underway (not when it is done), so this call never blocks
    /// on the activity itself.
    ///
    /// Fails with [`FlyerError::ConcurrentFly`] while a previous cycle is
    /// still in flight; cycles are rejected, never queued. A finished but
    /// uncollected cycle is discarded with a warning.
    pub fn kickoff(&mut self) -> FlyResult<ActivityStatus> {
        if self.is_flying() {
            return Err(FlyerError::ConcurrentFly);
        }
        let stale = self.state.buffer.lock().len();
        if stale > 0 {
            warn!(
                flyer = %self.name,
                records = stale,
                "discarding uncollected records from previous cycle"
            );
        }

        let cycle = new_uid();
        info!(flyer = %self.name, %cycle, "kickoff()");

        self.state.start_time = now_secs();
        self.state.buffer.lock().clear();
        let kickoff_status = ActivityStatus::new();
        let complete_status = ActivityStatus::new();
        self.state.kickoff_status = Some(kickoff_status.clone());
        self.state.complete_status = Some(complete_status.clone());
        self.state.in_flight = Some(complete_status.clone());

        let ctx = FlyContext {
            start_time: self.state.start_time,
            buffer: Arc::clone(&self.state.buffer),
            kickoff_status: kickoff_status.clone(),
        };
        let activity = Arc::clone(&self.activity);
        let kickoff = kickoff_status.clone();
        let flyer = self.name.clone();

        tokio::spawn(async move {
            debug!(%flyer, %cycle, "flyer activity()");
            match activity.fly(ctx).await {
                Ok(()) => {
                    // Activities that never called mark_started still resolve
                    // the kickoff before completion is declared.
                    if !kickoff.is_done() {
                        if let Err(err) = kickoff.resolve_success() {
                            error!(%flyer, %cycle, %err, "kickoff status resolution raced");
                        }
                    }
                    match complete_status.resolve_success() {
                        Ok(()) => info!(%flyer, %cycle, "activity() complete"),
                        Err(err) => error!(%flyer, %cycle, %err, "complete status resolved twice"),
                    }
                }
                Err(cause) => {
                    warn!(%flyer, %cycle, error = %cause, "activity() failed");
                    let cause = Arc::new(cause);
                    // Nobody may wait forever on an activity that never
                    // started: both statuses carry the same error.
                    if !kickoff.is_done() {
                        if let Err(err) = kickoff.resolve_failure(Arc::clone(&cause)) {
                            error!(%flyer, %cycle, %err, "kickoff status resolution raced");
                        }
                    }
                    if let Err(err) = complete_status.resolve_failure(cause) {
                        error!(%flyer, %cycle, %err, "complete status resolved twice");
                    }
                }
            }
        });

        Ok(kickoff_status)
    }

    /// Returns the current cycle's completion status.
    ///
    /// Idempotent: repeated calls return the same status object and trigger
    /// no work. Fails with [`FlyerError::NoActiveFly`] if nothing was kicked
    /// off, or if the cycle was already collected.
    pub fn complete(&self) -> FlyResult<ActivityStatus> {
        info!(flyer = %self.name, "complete()");
        self.state
            .complete_status
            .clone()
            .ok_or(FlyerError::NoActiveFly)
    }

    /// Drains and returns this cycle's records in FIFO append order.
    ///
    /// Single-pass per cycle: a second call yields nothing until the next
    /// kickoff. Clears the complete-status reference, so a later `complete()`
    /// without a fresh `kickoff()` fails with [`FlyerError::NoActiveFly`].
    /// Collecting is expected to follow completion; draining mid-flight is
    /// logged and returns whatever has been appended so far.
    pub fn collect(&mut self) -> std::collections::vec_deque::IntoIter<Record> {
        info!(flyer = %self.name, "collect()");
        if self.is_flying() {
            warn!(flyer = %self.name, "collect() before completion; records may be partial");
        }
        self.state.complete_status = None;
        self.state.kickoff_status = None;
        let drained = std::mem::take(&mut *self.state.buffer.lock());
        debug!(flyer = %self.name, records = drained.len(), "buffer drained");
        drained.into_iter()
    }

    /// Static schema for the records this flyer collects.
    ///
    /// Pure delegation to the activity variant; callable at any time.
    pub fn describe(&self) -> HashMap<String, DataKey> {
        debug!(flyer = %self.name, "describe()");
        self.activity.data_keys()
    }
}

impl Flyable for Flyer {
    fn name(&self) -> &str {
        Flyer::name(self)
    }

    fn kickoff(&mut self) -> FlyResult<ActivityStatus> {
        Flyer::kickoff(self)
    }

    fn complete(&self) -> FlyResult<ActivityStatus> {
        Flyer::complete(self)
    }

    fn collect(&mut self) -> Box<dyn Iterator<Item = Record> + Send> {
        Box::new(Flyer::collect(self))
    }

    fn describe(&self) -> HashMap<String, DataKey> {
        Flyer::describe(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Notify;

    /// Appends `count` records synchronously, then returns.
    struct BurstActivity {
        count: usize,
    }

    #[async_trait]
    impl FlyerActivity for BurstActivity {
        async fn fly(&self, ctx: FlyContext) -> Result<()> {
            ctx.mark_started();
            for step in 0..self.count {
                let t = now_secs();
                ctx.push(Record::at(t).with_datum("x", step as f64));
            }
            Ok(())
        }

        fn data_keys(&self) -> HashMap<String, DataKey> {
            HashMap::from([("x".to_string(), DataKey::scalar("step index", ""))])
        }
    }

    /// Holds the cycle open until released, to exercise the in-flight guard.
    struct GatedActivity {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl FlyerActivity for GatedActivity {
        async fn fly(&self, ctx: FlyContext) -> Result<()> {
            ctx.mark_started();
            self.gate.notified().await;
            Ok(())
        }

        fn data_keys(&self) -> HashMap<String, DataKey> {
            HashMap::new()
        }
    }

    /// Fails before ever marking itself started.
    struct BrokenActivity;

    #[async_trait]
    impl FlyerActivity for BrokenActivity {
        async fn fly(&self, _ctx: FlyContext) -> Result<()> {
            anyhow::bail!("detector offline")
        }

        fn data_keys(&self) -> HashMap<String, DataKey> {
            HashMap::new()
        }
    }

    #[tokio::test]
    async fn test_complete_without_kickoff_fails() {
        let flyer = Flyer::new("f0", Arc::new(BurstActivity { count: 1 }));
        assert!(matches!(flyer.complete(), Err(FlyerError::NoActiveFly)));
    }

    #[tokio::test]
    async fn test_kickoff_while_flying_is_rejected() {
        let gate = Arc::new(Notify::new());
        let mut flyer = Flyer::new("f0", Arc::new(GatedActivity { gate: Arc::clone(&gate) }));

        let kicked = flyer.kickoff().unwrap();
        kicked.wait(None).await.unwrap();
        assert!(flyer.is_flying());
        assert!(flyer.kickoff_status().is_some_and(|s| s.is_done()));
        assert!(matches!(flyer.kickoff(), Err(FlyerError::ConcurrentFly)));

        gate.notify_one();
        flyer.complete().unwrap().wait(None).await.unwrap();

        // Cycle finished: a fresh kickoff is allowed again.
        let kicked = flyer.kickoff().unwrap();
        gate.notify_one();
        assert!(kicked.wait(None).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let mut flyer = Flyer::new("f0", Arc::new(BurstActivity { count: 2 }));
        flyer.kickoff().unwrap();

        let first = flyer.complete().unwrap();
        let second = flyer.complete().unwrap();
        let a = first.wait(None).await.unwrap();
        let b = second.wait(None).await.unwrap();
        assert_eq!(a.is_success(), b.is_success());
    }

    #[tokio::test]
    async fn test_collect_drains_fifo_single_pass() {
        let mut flyer = Flyer::new("f0", Arc::new(BurstActivity { count: 5 }));
        flyer.kickoff().unwrap();
        flyer.complete().unwrap().wait(None).await.unwrap();

        let values: Vec<f64> = flyer
            .collect()
            .map(|r| r.data["x"])
            .collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        // Drain is single-pass: nothing left until the next kickoff.
        assert_eq!(flyer.collect().count(), 0);
    }

    #[tokio::test]
    async fn test_complete_after_collect_fails() {
        let mut flyer = Flyer::new("f0", Arc::new(BurstActivity { count: 1 }));
        flyer.kickoff().unwrap();
        flyer.complete().unwrap().wait(None).await.unwrap();
        let _ = flyer.collect().count();

        assert!(matches!(flyer.complete(), Err(FlyerError::NoActiveFly)));
    }

    #[tokio::test]
    async fn test_failing_activity_resolves_both_statuses() {
        let mut flyer = Flyer::new("f0", Arc::new(BrokenActivity));
        let kicked = flyer.kickoff().unwrap();
        let complete = flyer.complete().unwrap();

        let kick_outcome = kicked.wait(None).await.unwrap();
        let complete_outcome = complete.wait(None).await.unwrap();
        assert!(!kick_outcome.is_success());
        assert!(!complete_outcome.is_success());

        // Both carry the same original error.
        let a = kick_outcome.error().map(ToString::to_string);
        let b = complete_outcome.error().map(ToString::to_string);
        assert_eq!(a, b);
        assert!(a.is_some_and(|msg| msg.contains("detector offline")));

        assert_eq!(flyer.collect().count(), 0);
    }

    #[tokio::test]
    async fn test_describe_matches_record_fields() {
        let mut flyer = Flyer::new("f0", Arc::new(BurstActivity { count: 3 }));
        let schema = flyer.describe();
        flyer.kickoff().unwrap();
        flyer.complete().unwrap().wait(None).await.unwrap();

        for record in flyer.collect() {
            let mut fields: Vec<_> = record.fields().collect();
            let mut described: Vec<_> = schema.keys().map(String::as_str).collect();
            fields.sort_unstable();
            described.sort_unstable();
            assert_eq!(fields, described);
        }
    }

    #[tokio::test]
    async fn test_kickoff_after_uncollected_cycle_discards_records() {
        let mut flyer = Flyer::new("f0", Arc::new(BurstActivity { count: 3 }));
        flyer.kickoff().unwrap();
        flyer.complete().unwrap().wait(None).await.unwrap();
        assert_eq!(flyer.pending_records(), 3);

        // Finished but uncollected: a new kickoff starts a clean cycle.
        flyer.kickoff().unwrap();
        flyer.complete().unwrap().wait(None).await.unwrap();
        assert_eq!(flyer.collect().count(), 3);
    }
}
