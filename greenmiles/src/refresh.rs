//! Background refresh of air samples.
//!
//! The refresher runs on its own thread and drops each result into a
//! [Latest] slot; the frame loop takes whatever is newest, once per frame.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use crate::{
    atmosphere::{AirQuery, AirSample, AirSampler},
    context::Context,
    Error,
};

/// A single-slot mailbox: a new value replaces any unread one.
#[derive(Debug)]
pub struct Latest<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Latest {
            slot: Mutex::new(None),
        }
    }
}

impl<T> Latest<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, returning true if it replaced an unread one.
    pub fn publish(&self, value: T) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(value)
            .is_some()
    }

    pub fn take(&self) -> Option<T> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

pub type AirUpdate = Result<AirSample, Error>;

/// Sample immediately, then every `period`, until `ctx` is cancelled.
///
/// Failures are published too; the view shows them inline.
pub fn poll_air(
    ctx: &Context,
    sampler: &mut impl AirSampler,
    query: AirQuery,
    period: Duration,
    latest: &Latest<AirUpdate>,
) {
    tracing::info!(
        "refreshing air at {:.4}, {:.4} every {:?}",
        query.lat,
        query.lon,
        period
    );
    while !ctx.is_cancelled() {
        let update = sampler.sample(&query);
        match &update {
            Ok(s) => tracing::debug!("air sample: pm2.5 {:?}, co2 {:?}", s.pm25, s.co2_ppm),
            Err(e) => tracing::warn!("air sample failed: {}", e),
        }
        if latest.publish(update) {
            tracing::trace!("previous sample was never shown");
        }
        if ctx.wait_timeout(period) {
            break;
        }
    }
    tracing::info!("air refresher stopped");
}
