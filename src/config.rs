//! System configuration parameters
//!
//! All tunable parameters for the AQI monitor.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    // --- Identity ---
    /// Reported `device_id`; derived from the factory MAC when `None`.
    pub device_id: Option<heapless::String<32>>,

    // --- Sampling ---
    /// Delay between sampling cycles (milliseconds)
    pub poll_interval_ms: u32,
    /// Settling delay after start-measurement before the first poll (milliseconds)
    pub warmup_ms: u32,

    // --- Query handler ---
    /// Upper bound on waiting for the snapshot lock per request (milliseconds)
    pub read_timeout_ms: u32,
    /// HTTP listen port
    pub http_port: u16,
    /// HTTP server task stack size (bytes)
    pub http_stack_size: usize,

    // --- Time ---
    /// SNTP server hostname
    pub sntp_server: heapless::String<64>,
    /// How long boot waits for the first SNTP sync (seconds)
    pub sntp_sync_timeout_secs: u16,

    // --- Sensor bus ---
    /// SEN5x 7-bit I2C address
    pub i2c_address: u8,
    /// I2C bus clock (Hz)
    pub i2c_baudrate_hz: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let mut sntp_server = heapless::String::new();
        // Literal is shorter than the capacity.
        let _ = sntp_server.push_str("pool.ntp.org");
        Self {
            device_id: None,

            // Sampling
            poll_interval_ms: 1000, // 1 Hz
            warmup_ms: 1000,

            // Query handler
            read_timeout_ms: 100,
            http_port: 80,
            http_stack_size: 8192,

            // Time
            sntp_server,
            sntp_sync_timeout_secs: 10,

            // Sensor bus
            i2c_address: crate::sensors::sen5x::DEFAULT_ADDRESS,
            i2c_baudrate_hz: 100_000,
        }
    }
}

impl MonitorConfig {
    /// Range-check every field. Called before persisting and after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(id) = &self.device_id {
            if id.is_empty() || !id.bytes().all(|b| b.is_ascii_graphic()) {
                return Err(ConfigError::ValidationFailed(
                    "device_id must be non-empty printable ASCII without spaces",
                ));
            }
        }
        if !(200..=60_000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 200–60000",
            ));
        }
        if self.warmup_ms > 60_000 {
            return Err(ConfigError::ValidationFailed("warmup_ms must be 0–60000"));
        }
        if !(10..=5_000).contains(&self.read_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "read_timeout_ms must be 10–5000",
            ));
        }
        if self.http_port == 0 {
            return Err(ConfigError::ValidationFailed("http_port must be non-zero"));
        }
        if !(4096..=32_768).contains(&self.http_stack_size) {
            return Err(ConfigError::ValidationFailed(
                "http_stack_size must be 4096–32768",
            ));
        }
        if self.sntp_server.is_empty() {
            return Err(ConfigError::ValidationFailed("sntp_server must be set"));
        }
        if !(0x08..=0x77).contains(&self.i2c_address) {
            return Err(ConfigError::ValidationFailed(
                "i2c_address must be a 7-bit non-reserved address",
            ));
        }
        if !(10_000..=400_000).contains(&self.i2c_baudrate_hz) {
            return Err(ConfigError::ValidationFailed(
                "i2c_baudrate_hz must be 10000–400000",
            ));
        }
        Ok(())
    }
}
