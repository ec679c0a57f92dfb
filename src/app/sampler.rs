//! Sampling task: the single producer of [`Snapshot`]s.
//!
//! ```text
//!  INIT ──ok──▶ MEASURING ──┬─ READY      → convert, assess, publish
//!   │              ▲        ├─ NOT_READY  → log, wait
//!   │              └────────┴─ READ_ERROR → keep last snapshot, wait
//!   └──err──▶ FAILED (terminal)
//! ```
//!
//! All hardware access goes through [`SensorTransport`] and the wall clock
//! through [`ClockPort`], so the whole state machine runs on the host
//! against mocks. [`Sampler::run`] is the timer-driven loop; the waits are
//! `async-io-mini` timers, so the executor thread yields between cycles.

use core::convert::Infallible;
use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use log::{error, info};

use crate::aqi;
use crate::config::MonitorConfig;
use crate::error::SensorError;
use crate::state::{SharedSensorState, Snapshot};

use super::events::{MonitorEvent, SampleData};
use super::ports::{ClockPort, EventSink, SensorTransport};

/// Emit a [`MonitorEvent::Stats`] every this many cycles.
const STATS_EVERY_CYCLES: u64 = 300;

// ───────────────────────────────────────────────────────────────
// Phase, outcome, stats
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerPhase {
    Init,
    Measuring,
    /// Terminal: the sensor never started.
    Failed,
}

/// Result of one `MEASURING` cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// New snapshot built (and, from [`Sampler::cycle`], published).
    Ready(Snapshot),
    NotReady,
    ReadError(SensorError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub cycles: u64,
    /// Cycles that produced a snapshot.
    pub ready: u64,
    pub not_ready: u64,
    pub read_errors: u64,
}

/// Fatal sampler error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerError {
    /// The transport rejected start-measurement. Recovery needs a
    /// hardware reset, so the task stops.
    Init(SensorError),
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "sensor initialisation failed: {e}"),
        }
    }
}

impl core::error::Error for SamplerError {}

// ───────────────────────────────────────────────────────────────
// Sampler
// ───────────────────────────────────────────────────────────────

pub struct Sampler<T, C> {
    transport: T,
    clock: C,
    state: Arc<SharedSensorState>,
    phase: SamplerPhase,
    stats: SamplerStats,
    poll_interval: Duration,
    warmup: Duration,
}

impl<T: SensorTransport, C: ClockPort> Sampler<T, C> {
    pub fn new(transport: T, clock: C, state: Arc<SharedSensorState>, config: &MonitorConfig) -> Self {
        Self {
            transport,
            clock,
            state,
            phase: SamplerPhase::Init,
            stats: SamplerStats::default(),
            poll_interval: Duration::from_millis(u64::from(config.poll_interval_ms)),
            warmup: Duration::from_millis(u64::from(config.warmup_ms)),
        }
    }

    pub fn phase(&self) -> SamplerPhase {
        self.phase
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    fn enter(&mut self, to: SamplerPhase, sink: &mut impl EventSink) {
        let from = self.phase;
        self.phase = to;
        sink.emit(&MonitorEvent::PhaseChanged { from, to });
    }

    // ── INIT ──────────────────────────────────────────────────

    /// Start the sensor. `Init → Measuring` on success, `Init → Failed`
    /// (terminal) otherwise.
    pub fn init(&mut self, sink: &mut impl EventSink) -> Result<(), SamplerError> {
        debug_assert_eq!(self.phase, SamplerPhase::Init);
        info!("Sampler: starting sensor");
        match self.transport.start_measurement() {
            Ok(()) => {
                self.enter(SamplerPhase::Measuring, sink);
                Ok(())
            }
            Err(e) => {
                error!("Sampler: sensor start failed ({}), sampling stopped", e);
                sink.emit(&MonitorEvent::InitFailed(e));
                self.enter(SamplerPhase::Failed, sink);
                Err(SamplerError::Init(e))
            }
        }
    }

    // ── MEASURING ─────────────────────────────────────────────

    /// Poll the sensor once and, when data is ready, build a snapshot.
    /// Does not publish.
    pub fn poll(&mut self, sink: &mut impl EventSink) -> CycleOutcome {
        self.stats.cycles += 1;

        let outcome = match self.transport.data_ready() {
            Err(e) => CycleOutcome::ReadError(e),
            Ok(false) => CycleOutcome::NotReady,
            Ok(true) => match self.transport.read_values() {
                Err(e) => CycleOutcome::ReadError(e),
                Ok(raw) => {
                    let reading = raw.to_reading();
                    let assessment = aqi::assess(reading.pm2_5, reading.pm10, reading.nox_index);
                    sink.emit(&MonitorEvent::Sampled(SampleData {
                        reading,
                        assessment,
                    }));
                    CycleOutcome::Ready(Snapshot::captured(
                        reading,
                        assessment.aqi,
                        self.clock.now_utc(),
                    ))
                }
            },
        };

        match outcome {
            CycleOutcome::Ready(_) => self.stats.ready += 1,
            CycleOutcome::NotReady => {
                self.stats.not_ready += 1;
                sink.emit(&MonitorEvent::NotReady);
            }
            CycleOutcome::ReadError(e) => {
                self.stats.read_errors += 1;
                sink.emit(&MonitorEvent::ReadFailed(e));
            }
        }

        if self.stats.cycles % STATS_EVERY_CYCLES == 0 {
            sink.emit(&MonitorEvent::Stats(self.stats));
        }
        outcome
    }

    /// One full cycle: [`poll`](Self::poll), then publish a ready snapshot.
    /// Failed cycles leave the previously published snapshot untouched.
    pub async fn cycle(&mut self, sink: &mut impl EventSink) -> CycleOutcome {
        let outcome = self.poll(sink);
        if let CycleOutcome::Ready(snapshot) = outcome {
            self.state.publish(snapshot).await;
        }
        outcome
    }

    /// Run for the life of the process. Returns only on init failure.
    pub async fn run(&mut self, sink: &mut impl EventSink) -> Result<Infallible, SamplerError> {
        self.run_with(sink, || {}).await
    }

    /// [`run`](Self::run) with a hook invoked once per cycle (watchdog feed).
    pub async fn run_with(
        &mut self,
        sink: &mut impl EventSink,
        mut heartbeat: impl FnMut(),
    ) -> Result<Infallible, SamplerError> {
        self.init(sink)?;
        async_io_mini::Timer::after(self.warmup).await;
        info!(
            "Sampler: measuring every {} ms",
            self.poll_interval.as_millis()
        );

        loop {
            self.cycle(sink).await;
            heartbeat();
            async_io_mini::Timer::after(self.poll_interval).await;
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Task spawn
// ───────────────────────────────────────────────────────────────

/// Spawn the sampler on a dedicated thread pinned to the APP core.
///
/// The thread drives an `edge-executor` with the sampler future and
/// subscribes itself to the task watchdog. It exits only if the sensor
/// fails to start.
pub fn spawn<T, C, S>(
    mut sampler: Sampler<T, C>,
    mut sink: S,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    T: SensorTransport + Send + 'static,
    C: ClockPort + Send + 'static,
    S: EventSink + Send + 'static,
{
    use crate::drivers::task_pin::{Core, spawn_on_core};
    use crate::drivers::watchdog::Watchdog;

    spawn_on_core(Core::App, 5, 8, "sampler\0", move || {
        let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
        let task = executor.spawn(async move {
            let watchdog = Watchdog::new();
            let result = sampler.run_with(&mut sink, || watchdog.feed()).await;
            watchdog.unsubscribe();
            result
        });
        if let Err(e) = futures_lite::future::block_on(executor.run(task)) {
            error!("Sampler: task exiting: {}", e);
        }
    })
}
