//! Minimal fly-plan helpers for driving [`Flyable`] devices.
//!
//! The full run engine (plan queueing, documents, persistence) lives outside
//! this crate; these helpers only demonstrate the call order that engine is
//! contractually expected to follow per device: `kickoff`, wait for the
//! kickoff status, `complete`, wait for the complete status, then `collect`.
//! Multiple flyers fly concurrently: every device is kicked off before any
//! completion is awaited.

use crate::document::Record;
use crate::error::FlyResult;
use crate::flyer::Flyable;
use std::time::Duration;
use tracing::info;

/// Flies a single device through one full cycle and returns its records.
///
/// `timeout` bounds each status wait independently; `None` waits without a
/// deadline. A failed activity surfaces here as
/// [`crate::error::FlyerError::Activity`].
pub async fn fly_cycle(
    flyer: &mut (impl Flyable + ?Sized),
    timeout: Option<Duration>,
) -> FlyResult<Vec<Record>> {
    let kicked = flyer.kickoff()?;
    kicked.wait(timeout).await?.into_result()?;

    let complete = flyer.complete()?;
    complete.wait(timeout).await?.into_result()?;

    let records: Vec<Record> = flyer.collect().collect();
    info!(flyer = flyer.name(), records = records.len(), "fly cycle done");
    Ok(records)
}

/// Flies several devices concurrently through one cycle each.
///
/// All devices are kicked off up front; completions are then awaited in
/// order, so the total wall time is governed by the slowest device rather
/// than the sum. Returns `(name, records)` per device in input order.
pub async fn fly_all(
    flyers: &mut [&mut dyn Flyable],
    timeout: Option<Duration>,
) -> FlyResult<Vec<(String, Vec<Record>)>> {
    let mut kickoffs = Vec::with_capacity(flyers.len());
    for flyer in flyers.iter_mut() {
        kickoffs.push(flyer.kickoff()?);
    }
    for status in &kickoffs {
        status.wait(timeout).await?.into_result()?;
    }

    let mut completions = Vec::with_capacity(flyers.len());
    for flyer in flyers.iter_mut() {
        completions.push(flyer.complete()?);
    }
    for status in &completions {
        status.wait(timeout).await?.into_result()?;
    }

    let mut collected = Vec::with_capacity(flyers.len());
    for flyer in flyers.iter_mut() {
        let records: Vec<Record> = flyer.collect().collect();
        info!(flyer = flyer.name(), records = records.len(), "fly cycle done");
        collected.push((flyer.name().to_string(), records));
    }
    Ok(collected)
}
