//! Published EPA breakpoint tables.
//!
//! Concentration pairs are the exact lo/hi values from the EPA AQI
//! technical assistance document; do not recompute or "close" the gaps
//! between segments.

use super::{Breakpoint, BreakpointTable, Pollutant};

const fn bp(conc_lo: f32, conc_hi: f32, index_lo: u16, index_hi: u16) -> Breakpoint {
    Breakpoint {
        conc_lo,
        conc_hi,
        index_lo,
        index_hi,
    }
}

/// PM2.5, 24-hour, µg/m³.
pub const PM2_5: BreakpointTable = BreakpointTable {
    pollutant: Pollutant::Pm2_5,
    segments: &[
        bp(0.0, 12.0, 0, 50),
        bp(12.1, 35.4, 51, 100),
        bp(35.5, 55.4, 101, 150),
        bp(55.5, 150.4, 151, 200),
        bp(150.5, 250.4, 201, 300),
        bp(250.5, 350.4, 301, 400),
        bp(350.5, 500.4, 401, 500),
    ],
};

/// PM10, 24-hour, µg/m³.
pub const PM10: BreakpointTable = BreakpointTable {
    pollutant: Pollutant::Pm10,
    segments: &[
        bp(0.0, 54.0, 0, 50),
        bp(55.0, 154.0, 51, 100),
        bp(155.0, 254.0, 101, 150),
        bp(255.0, 354.0, 151, 200),
        bp(355.0, 424.0, 201, 300),
        bp(425.0, 504.0, 301, 400),
        bp(505.0, 604.0, 401, 500),
    ],
};

/// NO2, 1-hour, ppb. Used as the oxidizing-gas proxy for the SEN5x NOx index.
pub const NO2: BreakpointTable = BreakpointTable {
    pollutant: Pollutant::No2,
    segments: &[
        bp(0.0, 53.0, 0, 50),
        bp(54.0, 100.0, 51, 100),
        bp(101.0, 360.0, 101, 150),
        bp(361.0, 649.0, 151, 200),
        bp(650.0, 1249.0, 201, 300),
        bp(1250.0, 1649.0, 301, 400),
        bp(1650.0, 2049.0, 401, 500),
    ],
};
