//! AQI engine: concentration → 0–500 index via piecewise-linear
//! breakpoint tables, composite index, and category banding.
//!
//! Pure functions over process-wide constant tables; no shared state.
//!
//! ```text
//!  index = (I_hi − I_lo) / (C_hi − C_lo) · (C − C_lo) + I_lo
//! ```
//!
//! The composite AQI follows the governing-pollutant rule: it is the
//! maximum of the per-pollutant sub-indices, never an average.

pub mod tables;

use core::fmt;

use serde::Serialize;

/// Upper end of the AQI scale. Returned as the saturating fallback when a
/// concentration lies above the table ceiling.
pub const AQI_MAX: u16 = 500;

// ---------------------------------------------------------------------------
// Breakpoints
// ---------------------------------------------------------------------------

/// One linear segment of a concentration → index mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub conc_lo: f32,
    pub conc_hi: f32,
    pub index_lo: u16,
    pub index_hi: u16,
}

impl Breakpoint {
    fn contains(&self, concentration: f32) -> bool {
        self.conc_lo <= concentration && concentration <= self.conc_hi
    }

    fn interpolate(&self, concentration: f32) -> u16 {
        let slope = f32::from(self.index_hi - self.index_lo) / (self.conc_hi - self.conc_lo);
        let index = slope * (concentration - self.conc_lo) + f32::from(self.index_lo);
        // f32::round rounds half away from zero.
        index.round().clamp(0.0, f32::from(AQI_MAX)) as u16
    }
}

/// Pollutants with a published breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    Pm2_5,
    Pm10,
    /// Oxidizing-gas proxy (SEN5x NOx index mapped onto the NO2 table).
    No2,
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pm2_5 => write!(f, "PM2.5"),
            Self::Pm10 => write!(f, "PM10"),
            Self::No2 => write!(f, "NO2"),
        }
    }
}

/// Ordered, non-overlapping breakpoint segments for one pollutant.
#[derive(Debug, Clone, Copy)]
pub struct BreakpointTable {
    pub pollutant: Pollutant,
    pub segments: &'static [Breakpoint],
}

impl BreakpointTable {
    /// Highest concentration covered by the table.
    pub fn ceiling(&self) -> f32 {
        self.segments.last().map_or(0.0, |b| b.conc_hi)
    }
}

// ---------------------------------------------------------------------------
// Index computation
// ---------------------------------------------------------------------------

/// Convert one concentration into its 0–500 sub-index.
///
/// Scans `table` in order and interpolates within the first segment that
/// contains the concentration. Anything no segment contains saturates at
/// [`AQI_MAX`]: values above the ceiling, and values falling in the gap
/// between two published segments (e.g. PM10 54.5).
///
/// Callers must clamp negative concentrations to zero first; a negative
/// input matches no segment and also saturates.
pub fn compute_index(concentration: f32, table: &BreakpointTable) -> u16 {
    table
        .segments
        .iter()
        .find(|b| b.contains(concentration))
        .map_or(AQI_MAX, |b| b.interpolate(concentration))
}

/// Governing-pollutant rule: the overall AQI is the worst sub-index.
pub fn composite_index(pm2_5_idx: u16, pm10_idx: u16, gas_idx: u16) -> u16 {
    pm2_5_idx.max(pm10_idx).max(gas_idx)
}

/// Sub-indices for one reading plus the composite and which pollutant set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub pm2_5: u16,
    pub pm10: u16,
    pub gas: u16,
    pub aqi: u16,
    pub governing: Pollutant,
}

/// Compute all three sub-indices and the composite for one reading.
///
/// Negative inputs (sensor noise around zero) are clamped before lookup.
pub fn assess(pm2_5: f32, pm10: f32, nox_index: f32) -> Assessment {
    let pm2_5 = compute_index(pm2_5.max(0.0), &tables::PM2_5);
    let pm10 = compute_index(pm10.max(0.0), &tables::PM10);
    let gas = compute_index(nox_index.max(0.0), &tables::NO2);
    let aqi = composite_index(pm2_5, pm10, gas);

    // Ties go to the particulate reading, PM2.5 first.
    let governing = if aqi == pm2_5 {
        Pollutant::Pm2_5
    } else if aqi == pm10 {
        Pollutant::Pm10
    } else {
        Pollutant::No2
    };

    Assessment {
        pm2_5,
        pm10,
        gas,
        aqi,
        governing,
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// EPA health-concern band for a composite AQI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Wire name used in the `aqi_category` JSON field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::UnhealthySensitive => "unhealthy_sensitive",
            Self::Unhealthy => "unhealthy",
            Self::VeryUnhealthy => "very_unhealthy",
            Self::Hazardous => "hazardous",
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }

    /// Display colour as `#RRGGBB`.
    pub const fn color_hex(self) -> &'static str {
        match self {
            Self::Good => "#22C55E",
            Self::Moderate => "#EAB308",
            Self::UnhealthySensitive => "#F97316",
            Self::Unhealthy => "#EF4444",
            Self::VeryUnhealthy => "#A855F7",
            Self::Hazardous => "#7C2D12",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Band an AQI value. Total over `u16`; anything above 300 is hazardous.
pub const fn category(aqi: u16) -> AqiCategory {
    match aqi {
        0..=50 => AqiCategory::Good,
        51..=100 => AqiCategory::Moderate,
        101..=150 => AqiCategory::UnhealthySensitive,
        151..=200 => AqiCategory::Unhealthy,
        201..=300 => AqiCategory::VeryUnhealthy,
        _ => AqiCategory::Hazardous,
    }
}

#[cfg(test)]
mod tests {
    use super::tables::{NO2, PM10, PM2_5};
    use super::*;

    #[test]
    fn pm25_reference_points() {
        assert_eq!(compute_index(0.0, &PM2_5), 0);
        assert_eq!(compute_index(12.0, &PM2_5), 50);
        assert_eq!(compute_index(12.1, &PM2_5), 51);
        assert_eq!(compute_index(35.4, &PM2_5), 100);
        assert_eq!(compute_index(35.5, &PM2_5), 101);
        assert_eq!(compute_index(500.4, &PM2_5), 500);
        assert_eq!(compute_index(600.0, &PM2_5), 500);
    }

    #[test]
    fn pm25_interpolates_and_rounds_half_up() {
        // 6.0 → 25.0 exactly.
        assert_eq!(compute_index(6.0, &PM2_5), 25);
        // 35.0 → 99.158...
        assert_eq!(compute_index(35.0, &PM2_5), 99);
        // 55.4 → 150
        assert_eq!(compute_index(55.4, &PM2_5), 150);
    }

    #[test]
    fn pm10_reference_points() {
        assert_eq!(compute_index(0.0, &PM10), 0);
        assert_eq!(compute_index(54.0, &PM10), 50);
        assert_eq!(compute_index(55.0, &PM10), 51);
        assert_eq!(compute_index(604.0, &PM10), 500);
        assert_eq!(compute_index(700.0, &PM10), 500);
    }

    #[test]
    fn fractional_readings_interpolate_on_raw_value() {
        // 49/99 · 45.7 + 51 = 73.62
        assert_eq!(compute_index(100.7, &PM10), 74);
        // 50/53 · 10.5 = 9.91
        assert_eq!(compute_index(10.5, &NO2), 10);
        // 49/46 · 0.5 + 51 = 51.53
        assert_eq!(compute_index(54.5, &NO2), 52);
    }

    #[test]
    fn values_between_published_segments_saturate() {
        assert_eq!(compute_index(54.5, &PM10), AQI_MAX);
        assert_eq!(compute_index(12.05, &PM2_5), AQI_MAX);
        assert_eq!(compute_index(53.9, &NO2), AQI_MAX);
    }

    #[test]
    fn above_ceiling_saturates() {
        assert_eq!(compute_index(f32::MAX, &PM2_5), AQI_MAX);
        assert_eq!(compute_index(2049.5, &NO2), AQI_MAX);
        assert_eq!(compute_index(5000.0, &NO2), AQI_MAX);
    }

    #[test]
    fn composite_is_max_and_order_independent() {
        assert_eq!(composite_index(10, 20, 30), 30);
        assert_eq!(composite_index(30, 20, 10), 30);
        assert_eq!(composite_index(20, 30, 10), 30);
        assert_eq!(composite_index(0, 0, 0), 0);
    }

    #[test]
    fn assess_clamps_negative_noise() {
        let a = assess(-0.3, -1.0, -0.1);
        assert_eq!(a.aqi, 0);
        assert_eq!(a.governing, Pollutant::Pm2_5);
    }

    #[test]
    fn assess_reports_governing_pollutant() {
        let a = assess(35.0, 54.0, 0.0);
        assert_eq!(a.pm2_5, 99);
        assert_eq!(a.pm10, 50);
        assert_eq!(a.gas, 0);
        assert_eq!(a.aqi, 99);
        assert_eq!(a.governing, Pollutant::Pm2_5);

        let a = assess(5.0, 200.0, 0.0);
        assert_eq!(a.governing, Pollutant::Pm10);

        let a = assess(0.0, 0.0, 400.0);
        assert_eq!(a.governing, Pollutant::No2);
        assert_eq!(a.aqi, a.gas);
    }

    #[test]
    fn category_boundaries_are_exact() {
        assert_eq!(category(0), AqiCategory::Good);
        assert_eq!(category(50), AqiCategory::Good);
        assert_eq!(category(51), AqiCategory::Moderate);
        assert_eq!(category(100), AqiCategory::Moderate);
        assert_eq!(category(101), AqiCategory::UnhealthySensitive);
        assert_eq!(category(150), AqiCategory::UnhealthySensitive);
        assert_eq!(category(151), AqiCategory::Unhealthy);
        assert_eq!(category(200), AqiCategory::Unhealthy);
        assert_eq!(category(201), AqiCategory::VeryUnhealthy);
        assert_eq!(category(300), AqiCategory::VeryUnhealthy);
        assert_eq!(category(301), AqiCategory::Hazardous);
        assert_eq!(category(500), AqiCategory::Hazardous);
        assert_eq!(category(u16::MAX), AqiCategory::Hazardous);
    }

    #[test]
    fn category_wire_names() {
        assert_eq!(category(50).as_str(), "good");
        assert_eq!(category(51).as_str(), "moderate");
        assert_eq!(category(120).as_str(), "unhealthy_sensitive");
        assert_eq!(category(500).as_str(), "hazardous");
        assert_eq!(
            serde_json::to_string(&AqiCategory::VeryUnhealthy).unwrap(),
            "\"very_unhealthy\""
        );
    }

    #[test]
    fn category_metadata() {
        assert_eq!(AqiCategory::UnhealthySensitive.label(), "Unhealthy for Sensitive Groups");
        assert_eq!(AqiCategory::Good.color_hex(), "#22C55E");
        assert_eq!(AqiCategory::Hazardous.color_hex(), "#7C2D12");
    }
}
