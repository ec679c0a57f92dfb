//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing sampler events to the ESP-IDF
//! logger (UART / USB-CDC on the device, stderr on the host).

use log::{debug, error, info, warn};

use crate::app::events::MonitorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`MonitorEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &MonitorEvent) {
        match event {
            MonitorEvent::Sampled(s) => {
                let r = &s.reading;
                let a = &s.assessment;
                info!(
                    "SAMPLE | PM1={:.1} PM2.5={:.1} PM4={:.1} PM10={:.1}\u{00b5}g/m\u{00b3} | \
                     T={:.1}\u{00b0}C RH={:.1}% | VOC={:.0} NOx={:.0} | \
                     AQI={} ({}, pm2.5={} pm10={} gas={}, {})",
                    r.pm1_0,
                    r.pm2_5,
                    r.pm4_0,
                    r.pm10,
                    r.temperature,
                    r.humidity,
                    r.voc_index,
                    r.nox_index,
                    a.aqi,
                    crate::aqi::category(a.aqi).label(),
                    a.pm2_5,
                    a.pm10,
                    a.gas,
                    a.governing,
                );
            }
            MonitorEvent::PhaseChanged { from, to } => {
                info!("PHASE | {:?} -> {:?}", from, to);
            }
            MonitorEvent::NotReady => {
                debug!("Sampler: data not ready");
            }
            MonitorEvent::ReadFailed(e) => {
                warn!("Sampler: read failed ({}), keeping last snapshot", e);
            }
            MonitorEvent::InitFailed(e) => {
                error!("Sampler: init failed ({})", e);
            }
            MonitorEvent::Stats(s) => {
                info!(
                    "STATS | cycles={} ready={} not_ready={} read_errors={}",
                    s.cycles, s.ready, s.not_ready, s.read_errors
                );
            }
        }
    }
}
