//! Shared sensor state: the single snapshot slot between the sampling task
//! (sole writer) and any number of HTTP request handlers (readers).
//!
//! ```text
//! ┌──────────────┐ publish()  ┌───────────────────┐ read(timeout) ┌────────────┐
//! │ Sampler task │──────────▶│  Mutex<Snapshot>  │──────────────▶│ HTTP reqs  │
//! │  (1 writer)  │  (waits)   │  copy in/copy out │  (bounded)    │ (N readers)│
//! └──────────────┘            └───────────────────┘               └────────────┘
//! ```
//!
//! The slot is an `embassy-sync` async mutex. Both sides only copy a
//! `Copy` struct while holding it, so the critical section is O(1) and no
//! I/O ever happens under the lock. Readers race the lock against an
//! `async-io-mini` timer and give up with [`Unavailable`]; the writer waits
//! without a bound. Callers receive an injected `Arc<SharedSensorState>`.

use core::time::Duration;

use chrono::{DateTime, Utc};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use log::warn;

use crate::aqi::{self, AqiCategory};
use crate::error::Unavailable;

/// Converted physical values from one sampling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    /// µg/m³
    pub pm1_0: f32,
    /// µg/m³
    pub pm2_5: f32,
    /// µg/m³
    pub pm4_0: f32,
    /// µg/m³
    pub pm10: f32,
    /// °C
    pub temperature: f32,
    /// %RH
    pub humidity: f32,
    pub voc_index: f32,
    pub nox_index: f32,
}

impl Reading {
    pub const ZERO: Self = Self {
        pm1_0: 0.0,
        pm2_5: 0.0,
        pm4_0: 0.0,
        pm10: 0.0,
        temperature: 0.0,
        humidity: 0.0,
        voc_index: 0.0,
        nox_index: 0.0,
    };
}

/// Latest published state.
///
/// `valid == true` means every field came from one completed sampling
/// cycle. Before the first cycle the snapshot is invalid and zeroed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub reading: Reading,
    pub aqi: u16,
    pub valid: bool,
    /// Capture time of `reading`.
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    /// The start-up state: nothing measured yet.
    pub const INVALID: Self = Self {
        reading: Reading::ZERO,
        aqi: 0,
        valid: false,
        timestamp: DateTime::<Utc>::UNIX_EPOCH,
    };

    /// A valid snapshot captured at `timestamp`.
    pub fn captured(reading: Reading, aqi: u16, timestamp: DateTime<Utc>) -> Self {
        Self {
            reading,
            aqi,
            valid: true,
            timestamp,
        }
    }

    pub fn category(&self) -> AqiCategory {
        aqi::category(self.aqi)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Owned single-slot store for the current [`Snapshot`].
pub struct SharedSensorState {
    slot: Mutex<CriticalSectionRawMutex, Snapshot>,
}

impl Default for SharedSensorState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedSensorState {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Snapshot::INVALID),
        }
    }

    /// Replace the current snapshot. Sampling task only.
    ///
    /// Waits for the lock without a bound: readers hold it for a single
    /// struct copy. A timestamp older than the one already published (wall
    /// clock stepped back by SNTP) is raised to the previous value so
    /// readers never see time go backwards.
    pub async fn publish(&self, mut snapshot: Snapshot) {
        let mut current = self.slot.lock().await;
        if current.valid && snapshot.timestamp < current.timestamp {
            warn!(
                "State: clock went backwards ({} < {}), holding timestamp",
                snapshot.timestamp, current.timestamp
            );
            snapshot.timestamp = current.timestamp;
        }
        *current = snapshot;
    }

    /// Copy out the current snapshot, or fail with [`Unavailable`] if the
    /// lock is not obtained within `timeout`.
    pub async fn read(&self, timeout: Duration) -> Result<Snapshot, Unavailable> {
        let copy = async { Ok(*self.slot.lock().await) };
        let expire = async {
            async_io_mini::Timer::after(timeout).await;
            Err(Unavailable)
        };
        // `or` polls the lock first, so an uncontended read never waits on
        // the timer even with a zero timeout.
        futures_lite::future::or(copy, expire).await
    }

    /// Blocking [`publish`](Self::publish) for callers outside an executor.
    pub fn publish_blocking(&self, snapshot: Snapshot) {
        futures_lite::future::block_on(self.publish(snapshot));
    }

    /// Blocking [`read`](Self::read) for the HTTP server's handler threads.
    pub fn read_blocking(&self, timeout: Duration) -> Result<Snapshot, Unavailable> {
        futures_lite::future::block_on(self.read(timeout))
    }

    /// Non-waiting read; `None` if the writer currently holds the slot.
    pub fn try_read(&self) -> Option<Snapshot> {
        self.slot.try_lock().ok().map(|s| *s)
    }

    /// Hold the slot to simulate a writer stalled mid-publish.
    #[cfg(test)]
    pub(crate) fn hold(
        &self,
    ) -> embassy_sync::mutex::MutexGuard<'_, CriticalSectionRawMutex, Snapshot> {
        self.slot.try_lock().ok().expect("slot already held")
    }
}
