//! Outbound monitor events.
//!
//! The [`Sampler`](super::sampler::Sampler) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them (serial log, network forwarding, ...).

use crate::aqi::Assessment;
use crate::error::SensorError;
use crate::state::Reading;

use super::sampler::{SamplerPhase, SamplerStats};

/// Structured events emitted by the sampling task.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// The sampler changed phase (`Init` → `Measuring`, `Init` → `Failed`).
    PhaseChanged { from: SamplerPhase, to: SamplerPhase },

    /// A cycle read the sensor and built a new snapshot.
    Sampled(SampleData),

    /// The sensor had no new data this cycle.
    NotReady,

    /// A ready-check or value read failed; the previous snapshot stands.
    ReadFailed(SensorError),

    /// The sensor could not be started; sampling has stopped.
    InitFailed(SensorError),

    /// Periodic counters.
    Stats(SamplerStats),
}

/// One published sample, for logging or transmission.
#[derive(Debug, Clone, Copy)]
pub struct SampleData {
    pub reading: Reading,
    pub assessment: Assessment,
}
