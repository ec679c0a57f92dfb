//! Sensor subsystem: SEN5x driver, host simulator, and raw → physical
//! unit conversion.
//!
//! The sampler talks to whichever transport it is given through the
//! [`SensorTransport`](crate::app::ports::SensorTransport) port; this module
//! owns the register layout and the fixed scale factors.

pub mod sen5x;
pub mod sim;

use log::debug;

use crate::state::Reading;

/// Scale factors from the SEN5x datasheet (register value ÷ factor).
pub mod scale {
    pub const PM: f32 = 10.0;
    pub const HUMIDITY: f32 = 100.0;
    pub const TEMPERATURE: f32 = 200.0;
    pub const VOC_INDEX: f32 = 10.0;
    pub const NOX_INDEX: f32 = 10.0;
}

/// "Value unknown" marker for unsigned registers.
pub const UNKNOWN_U16: u16 = 0xFFFF;
/// "Value unknown" marker for signed registers (e.g. NOx during warm-up).
pub const UNKNOWN_I16: i16 = 0x7FFF;

/// One raw measured-values block, in register order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawValues {
    pub pm1_0: u16,
    pub pm2_5: u16,
    pub pm4_0: u16,
    pub pm10: u16,
    pub humidity: i16,
    pub temperature: i16,
    pub voc_index: i16,
    pub nox_index: i16,
}

fn unsigned(raw: u16, factor: f32) -> f32 {
    if raw == UNKNOWN_U16 {
        0.0
    } else {
        f32::from(raw) / factor
    }
}

fn signed(raw: i16, factor: f32) -> f32 {
    if raw == UNKNOWN_I16 {
        0.0
    } else {
        f32::from(raw) / factor
    }
}

impl RawValues {
    /// Apply the fixed scale factors. Registers carrying the "unknown"
    /// marker convert to 0.0.
    pub fn to_reading(&self) -> Reading {
        if self.nox_index == UNKNOWN_I16 || self.voc_index == UNKNOWN_I16 {
            debug!("SEN5x: gas index not yet available");
        }
        Reading {
            pm1_0: unsigned(self.pm1_0, scale::PM),
            pm2_5: unsigned(self.pm2_5, scale::PM),
            pm4_0: unsigned(self.pm4_0, scale::PM),
            pm10: unsigned(self.pm10, scale::PM),
            temperature: signed(self.temperature, scale::TEMPERATURE),
            humidity: signed(self.humidity, scale::HUMIDITY),
            voc_index: signed(self.voc_index, scale::VOC_INDEX),
            nox_index: signed(self.nox_index, scale::NOX_INDEX),
        }
    }
}
