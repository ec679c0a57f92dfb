//! One writer, many readers: no torn snapshots, no time travel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use aqimon::state::{Reading, SharedSensorState, Snapshot};
use chrono::TimeDelta;

use crate::mock_sensor::epoch_2024;

const READERS: usize = 8;
const GENERATIONS: u32 = 2_000;
const MIN_READS: u32 = 200;

/// Every field derives from `g`, so a mix of two generations is detectable.
fn generation(g: u32) -> Snapshot {
    let v = g as f32;
    let reading = Reading {
        pm1_0: v,
        pm2_5: v + 0.5,
        pm4_0: v + 1.0,
        pm10: v + 1.5,
        temperature: -v,
        humidity: v * 2.0,
        voc_index: v + 3.0,
        nox_index: v + 4.0,
    };
    Snapshot::captured(
        reading,
        (g % 501) as u16,
        epoch_2024() + TimeDelta::seconds(i64::from(g)),
    )
}

#[test]
fn readers_never_observe_torn_snapshots() {
    let state = Arc::new(SharedSensorState::new());
    let done = Arc::new(AtomicBool::new(false));
    let timeouts = Arc::new(AtomicU32::new(0));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let state = Arc::clone(&state);
            let done = Arc::clone(&done);
            let timeouts = Arc::clone(&timeouts);
            thread::spawn(move || {
                let mut last_ts = None;
                let mut seen = 0u32;
                while !done.load(Ordering::Acquire) || seen < MIN_READS {
                    let snap = match state.read_blocking(Duration::from_millis(500)) {
                        Ok(s) => s,
                        Err(_) => {
                            timeouts.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                    };
                    if !snap.valid {
                        thread::yield_now();
                        continue;
                    }
                    let g = snap.reading.pm1_0 as u32;
                    assert_eq!(snap, generation(g), "torn snapshot");
                    if let Some(prev) = last_ts {
                        assert!(snap.timestamp >= prev, "timestamp went backwards");
                    }
                    last_ts = Some(snap.timestamp);
                    seen += 1;
                }
                seen
            })
        })
        .collect();

    for g in 0..GENERATIONS {
        state.publish_blocking(generation(g));
        if g % 64 == 0 {
            thread::yield_now();
        }
    }
    done.store(true, Ordering::Release);

    let total: u32 = readers.into_iter().map(|r| r.join().unwrap()).sum();
    assert!(total >= MIN_READS * READERS as u32);
    assert_eq!(timeouts.load(Ordering::Relaxed), 0);
    assert_eq!(
        state.read_blocking(Duration::from_millis(100)).unwrap(),
        generation(GENERATIONS - 1)
    );
}

#[test]
fn regressing_clock_is_clamped_on_publish() {
    let state = SharedSensorState::new();
    state.publish_blocking(generation(10));
    state.publish_blocking(generation(5));
    let snap = state.try_read().unwrap();
    assert_eq!(snap.reading, generation(5).reading);
    assert_eq!(snap.timestamp, generation(10).timestamp);
}
