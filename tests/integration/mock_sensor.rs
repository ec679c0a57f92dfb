//! Mock adapters for integration tests.
//!
//! `ScriptedSensor` plays back a fixed sequence of cycle outcomes,
//! `SteppingClock` advances one second per reading, and `RecordingSink`
//! keeps every emitted event for assertions.

use std::cell::Cell;
use std::collections::VecDeque;

use aqimon::app::events::MonitorEvent;
use aqimon::app::ports::{ClockPort, EventSink, SensorTransport};
use aqimon::error::SensorError;
use aqimon::sensors::RawValues;
use chrono::{DateTime, TimeZone, Utc};

// ── Scripted transport ────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum Step {
    NotReady,
    ReadyCheckFails,
    ReadFails,
    Values(RawValues),
}

pub struct ScriptedSensor {
    pub start_ok: bool,
    steps: VecDeque<Step>,
    pending: Option<Step>,
    pub reads: u32,
}

#[allow(dead_code)]
impl ScriptedSensor {
    pub fn new(steps: &[Step]) -> Self {
        Self {
            start_ok: true,
            steps: steps.iter().copied().collect(),
            pending: None,
            reads: 0,
        }
    }

    pub fn failing_start() -> Self {
        Self {
            start_ok: false,
            ..Self::new(&[])
        }
    }
}

impl SensorTransport for ScriptedSensor {
    fn start_measurement(&mut self) -> Result<(), SensorError> {
        if self.start_ok {
            Ok(())
        } else {
            Err(SensorError::StartFailed)
        }
    }

    fn data_ready(&mut self) -> Result<bool, SensorError> {
        match self.steps.pop_front() {
            None | Some(Step::NotReady) => Ok(false),
            Some(Step::ReadyCheckFails) => Err(SensorError::DataReadyFailed),
            Some(step) => {
                self.pending = Some(step);
                Ok(true)
            }
        }
    }

    fn read_values(&mut self) -> Result<RawValues, SensorError> {
        self.reads += 1;
        match self.pending.take() {
            Some(Step::Values(raw)) => Ok(raw),
            _ => Err(SensorError::ReadFailed),
        }
    }
}

/// Raw block with only the AQI-relevant registers set.
pub fn raw(pm2_5: u16, pm10: u16, nox_index: i16) -> RawValues {
    RawValues {
        pm2_5,
        pm10,
        nox_index,
        ..RawValues::default()
    }
}

// ── Clock ─────────────────────────────────────────────────────

pub fn epoch_2024() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Starts at 2024-01-01T00:00:00Z; each `now_utc` call advances 1 s.
pub struct SteppingClock {
    next: Cell<i64>,
}

#[allow(dead_code)]
impl SteppingClock {
    pub fn new() -> Self {
        Self {
            next: Cell::new(epoch_2024().timestamp()),
        }
    }
}

impl ClockPort for SteppingClock {
    fn now_utc(&self) -> DateTime<Utc> {
        let t = self.next.get();
        self.next.set(t + 1);
        Utc.timestamp_opt(t, 0).unwrap()
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<MonitorEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&MonitorEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &MonitorEvent) {
        self.events.push(event.clone());
    }
}
