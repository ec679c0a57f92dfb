//! Unified error types for the AQI monitor firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! bootstrap and sampling-task error handling uniform. All variants are
//! `Copy` so they can be passed through the sampler and logged without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The sensor transport failed.
    Sensor(SensorError),
    /// The shared snapshot could not be locked within its bound.
    Unavailable(Unavailable),
    /// A communication subsystem failed.
    Comms(CommsError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Unavailable(e) => write!(f, "state: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The I2C bus reported an error (NACK, arbitration loss, timeout).
    I2c,
    /// A response word failed its CRC-8 check.
    Crc,
    /// The start-measurement command was rejected.
    StartFailed,
    /// The data-ready flag could not be read.
    DataReadyFailed,
    /// The measured-values block could not be read.
    ReadFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c => write!(f, "I2C transfer failed"),
            Self::Crc => write!(f, "CRC mismatch"),
            Self::StartFailed => write!(f, "start measurement failed"),
            Self::DataReadyFailed => write!(f, "data-ready check failed"),
            Self::ReadFailed => write!(f, "measured values read failed"),
        }
    }
}

impl core::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Shared-state errors
// ---------------------------------------------------------------------------

/// Exclusive access to the snapshot slot was not obtained within the
/// caller's timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unavailable;

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "snapshot lock timed out")
    }
}

impl core::error::Error for Unavailable {}

impl From<Unavailable> for Error {
    fn from(e: Unavailable) -> Self {
        Self::Unavailable(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiConnectFailed,
    HttpServerFailed,
    SntpStartFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::HttpServerFailed => write!(f, "HTTP server failed to start"),
            Self::SntpStartFailed => write!(f, "SNTP client failed to start"),
        }
    }
}

impl core::error::Error for CommsError {}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

impl From<crate::app::ports::ConfigError> for Error {
    fn from(e: crate::app::ports::ConfigError) -> Self {
        use crate::app::ports::ConfigError;
        Self::Config(match e {
            ConfigError::NotFound => "not found",
            ConfigError::Corrupted => "corrupted",
            ConfigError::ValidationFailed(msg) => msg,
            ConfigError::IoError => "storage I/O error",
        })
    }
}
