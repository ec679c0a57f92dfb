//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Sampler / query handler (domain)
//! ```
//!
//! Driven adapters (sensor transport, wall clock, event sinks, config
//! storage) implement these traits. The [`Sampler`](super::sampler::Sampler)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use chrono::{DateTime, Utc};

use crate::config::MonitorConfig;
use crate::error::SensorError;
use crate::sensors::RawValues;

// ───────────────────────────────────────────────────────────────
// Sensor transport (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Command-level access to the particulate/gas sensor.
///
/// Calls may block for the sensor's command execution time; they are only
/// ever made from the sampling task.
pub trait SensorTransport {
    /// Put the sensor into continuous measurement mode.
    fn start_measurement(&mut self) -> Result<(), SensorError>;

    /// Whether a new measured-values block is available.
    fn data_ready(&mut self) -> Result<bool, SensorError>;

    /// Read the latest measured-values block.
    fn read_values(&mut self) -> Result<RawValues, SensorError>;
}

impl<T: SensorTransport + ?Sized> SensorTransport for &mut T {
    fn start_measurement(&mut self) -> Result<(), SensorError> {
        (**self).start_measurement()
    }

    fn data_ready(&mut self) -> Result<bool, SensorError> {
        (**self).data_ready()
    }

    fn read_values(&mut self) -> Result<RawValues, SensorError> {
        (**self).read_values()
    }
}

// ───────────────────────────────────────────────────────────────
// Wall clock
// ───────────────────────────────────────────────────────────────

/// UTC wall-clock source used to stamp snapshots.
pub trait ClockPort {
    fn now_utc(&self) -> DateTime<Utc>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The sampler emits structured [`MonitorEvent`](super::events::MonitorEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::MonitorEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the monitor configuration.
///
/// Implementations MUST validate before persisting; out-of-range values are
/// rejected with [`ConfigError::ValidationFailed`], never silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`MonitorConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<MonitorConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &MonitorConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}
