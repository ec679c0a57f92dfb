//! Simulated SEN5x for host runs and tests.
//!
//! Register values and failure modes are injected through static atomics,
//! the same way the firmware's other simulated inputs are driven, so a test
//! can steer the sampler while it runs on another thread.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use super::RawValues;
use crate::app::ports::SensorTransport;
use crate::error::SensorError;

static SIM_PM2_5: AtomicU16 = AtomicU16::new(80);
static SIM_PM10: AtomicU16 = AtomicU16::new(120);
static SIM_NOX: AtomicU16 = AtomicU16::new(10);
static SIM_FAIL_START: AtomicBool = AtomicBool::new(false);
static SIM_FAIL_READS: AtomicU32 = AtomicU32::new(0);
static SIM_NOT_READY: AtomicU32 = AtomicU32::new(0);

/// Set the raw PM2.5, PM10 and NOx registers served by the simulator.
pub fn sim_set_raw(pm2_5: u16, pm10: u16, nox_index: u16) {
    SIM_PM2_5.store(pm2_5, Ordering::Relaxed);
    SIM_PM10.store(pm10, Ordering::Relaxed);
    SIM_NOX.store(nox_index, Ordering::Relaxed);
}

/// Make the next `start_measurement` fail (or succeed again).
pub fn sim_fail_start(fail: bool) {
    SIM_FAIL_START.store(fail, Ordering::Relaxed);
}

/// Fail the next `n` value reads.
pub fn sim_fail_reads(n: u32) {
    SIM_FAIL_READS.store(n, Ordering::Relaxed);
}

/// Report "not ready" for the next `n` data-ready polls.
pub fn sim_not_ready(n: u32) {
    SIM_NOT_READY.store(n, Ordering::Relaxed);
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
        .is_ok()
}

/// Simulated sensor. Temperature and humidity drift slowly with the
/// sample count so consecutive snapshots are distinguishable.
#[derive(Debug, Default)]
pub struct SimSensor {
    started: bool,
    samples: u32,
}

impl SimSensor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SensorTransport for SimSensor {
    fn start_measurement(&mut self) -> Result<(), SensorError> {
        if SIM_FAIL_START.load(Ordering::Relaxed) {
            return Err(SensorError::StartFailed);
        }
        self.started = true;
        log::info!("SEN5x(sim): measurement started");
        Ok(())
    }

    fn data_ready(&mut self) -> Result<bool, SensorError> {
        if !self.started {
            return Err(SensorError::DataReadyFailed);
        }
        Ok(!take_one(&SIM_NOT_READY))
    }

    fn read_values(&mut self) -> Result<RawValues, SensorError> {
        if take_one(&SIM_FAIL_READS) {
            return Err(SensorError::ReadFailed);
        }
        self.samples = self.samples.wrapping_add(1);
        let drift = (self.samples % 20) as i16;
        let pm2_5 = SIM_PM2_5.load(Ordering::Relaxed);
        let pm10 = SIM_PM10.load(Ordering::Relaxed);
        Ok(RawValues {
            pm1_0: pm2_5.saturating_sub(pm2_5 / 4),
            pm2_5,
            pm4_0: pm2_5.saturating_add((pm10.saturating_sub(pm2_5)) / 2),
            pm10,
            humidity: 4_500 + drift * 10,
            temperature: 4_400 + drift * 20,
            voc_index: 1_000,
            nox_index: SIM_NOX.load(Ordering::Relaxed) as i16,
        })
    }
}
