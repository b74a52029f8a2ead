//! A synthetic activity that samples elapsed time at a fixed period.

use crate::document::{now_secs, DataKey, Record};
use crate::flyer::{FlyContext, FlyerActivity};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Emits one record per step, each carrying the seconds elapsed since
/// kickoff, then sleeping for the configured period.
///
/// This is the reference flyer variant used by the demo and the lifecycle
/// tests: with 3 steps at 500 ms it produces three records over ~1.5 s with
/// strictly increasing elapsed-time values, while the kickoff status resolves
/// before the first sleep.
pub struct IntervalActivity {
    field: String,
    steps: usize,
    period: Duration,
}

impl IntervalActivity {
    /// A `steps`-sample activity with the default field name `x`.
    pub fn new(steps: usize, period: Duration) -> Self {
        Self {
            field: "x".to_string(),
            steps,
            period,
        }
    }

    /// Renames the emitted field.
    pub fn with_field(mut self, field: &str) -> Self {
        self.field = field.to_string();
        self
    }

    /// Configured number of samples per cycle.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Configured sampling period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl FlyerActivity for IntervalActivity {
    async fn fly(&self, ctx: FlyContext) -> Result<()> {
        // Acquisition is underway as soon as we enter the sampling loop.
        ctx.mark_started();

        for step in 0..self.steps {
            let t = now_secs();
            let elapsed = t - ctx.start_time();
            ctx.push(Record::at(t).with_datum_at(&self.field, elapsed, t));
            debug!(step, elapsed, "recorded elapsed-time sample");
            tokio::time::sleep(self.period).await;
        }

        Ok(())
    }

    fn data_keys(&self) -> HashMap<String, DataKey> {
        HashMap::from([(
            self.field.clone(),
            DataKey::scalar("elapsed time, s", "s").with_shape(vec![1]),
        )])
    }
}
