//! Fuzz target: SEN5x response decoding.
//!
//! Feeds arbitrary bytes as a measured-values response and checks that the
//! decoder never panics, accepts only CRC-valid frames, and that whatever
//! it accepts converts to a finite reading and an in-range AQI.
//!
//! cargo fuzz run fuzz_sen5x_decode

#![no_main]

use aqimon::aqi::{self, AQI_MAX};
use aqimon::sensors::sen5x::{MEASURED_WORDS, crc8, decode_words, raw_from_words};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut words = [0u16; MEASURED_WORDS];
    let Ok(()) = decode_words(data, &mut words) else {
        return;
    };

    assert_eq!(data.len(), MEASURED_WORDS * 3);
    for chunk in data.chunks_exact(3) {
        assert_eq!(crc8(&chunk[..2]), chunk[2], "accepted a bad CRC");
    }

    let reading = raw_from_words(&words).to_reading();
    for v in [
        reading.pm1_0,
        reading.pm2_5,
        reading.pm4_0,
        reading.pm10,
        reading.temperature,
        reading.humidity,
        reading.voc_index,
        reading.nox_index,
    ] {
        assert!(v.is_finite());
    }

    let a = aqi::assess(reading.pm2_5, reading.pm10, reading.nox_index);
    assert!(a.aqi <= AQI_MAX);
    assert!(a.aqi >= a.pm2_5 && a.aqi >= a.pm10 && a.aqi >= a.gas);
});
