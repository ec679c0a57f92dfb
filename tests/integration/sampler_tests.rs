//! Sampler → shared state → query handler, end to end.

use std::sync::Arc;
use std::time::{Duration, Instant};

use aqimon::app::events::MonitorEvent;
use aqimon::app::sampler::{self, CycleOutcome, Sampler, SamplerError, SamplerPhase};
use aqimon::aqi::{self, tables};
use aqimon::config::MonitorConfig;
use aqimon::error::SensorError;
use aqimon::http::{Method, QueryHandler};
use aqimon::sensors::sim::{self, SimSensor};
use aqimon::state::SharedSensorState;
use futures_lite::future::block_on;

use crate::mock_sensor::{RecordingSink, ScriptedSensor, SteppingClock, Step, epoch_2024, raw};

fn rig(
    sensor: ScriptedSensor,
) -> (
    Sampler<ScriptedSensor, SteppingClock>,
    Arc<SharedSensorState>,
    QueryHandler,
) {
    let state = Arc::new(SharedSensorState::new());
    let sampler = Sampler::new(
        sensor,
        SteppingClock::new(),
        Arc::clone(&state),
        &MonitorConfig::default(),
    );
    let handler = QueryHandler::new(Arc::clone(&state), "aqi-test01", Duration::from_millis(100));
    (sampler, state, handler)
}

#[test]
fn raw_registers_to_published_composite() {
    let (mut s, state, _) = rig(ScriptedSensor::new(&[Step::Values(raw(350, 540, 0))]));
    let mut sink = RecordingSink::default();
    s.init(&mut sink).unwrap();
    block_on(s.cycle(&mut sink));

    let aqi25 = aqi::compute_index(35.0, &tables::PM2_5);
    let aqi10 = aqi::compute_index(54.0, &tables::PM10);
    let aqi_gas = aqi::compute_index(0.0, &tables::NO2);
    let expected = aqi::composite_index(aqi25, aqi10, aqi_gas);

    let snap = state.try_read().unwrap();
    assert!(snap.valid);
    assert_eq!(snap.aqi, expected);
    assert_eq!((aqi25, aqi10, aqi_gas, expected), (99, 50, 0, 99));
    assert_eq!(snap.timestamp, epoch_2024());
}

#[test]
fn first_sample_is_served_over_http() {
    let (mut s, _, handler) = rig(ScriptedSensor::new(&[Step::Values(raw(350, 540, 0))]));
    let mut sink = RecordingSink::default();

    let before = handler.route(Method::Get, "/aqi");
    assert_eq!(before.status, 503);
    assert!(before.body.contains("SENSOR_NOT_READY"));

    s.init(&mut sink).unwrap();
    block_on(s.cycle(&mut sink));

    let after = handler.route(Method::Get, "/aqi");
    assert_eq!(after.status, 200);
    let json: serde_json::Value = serde_json::from_str(&after.body).unwrap();
    assert_eq!(json["device_id"], "aqi-test01");
    assert_eq!(json["timestamp"], "2024-01-01T00:00:00Z");
    assert_eq!(json["pm2_5"], 35.0);
    assert_eq!(json["pm10"], 54.0);
    assert_eq!(json["aqi"], 99);
    assert_eq!(json["aqi_category"], "moderate");
}

#[test]
fn start_failure_stops_sampling_and_keeps_not_ready() {
    let (mut s, state, handler) = rig(ScriptedSensor::failing_start());
    let mut sink = RecordingSink::default();

    let result = block_on(s.run(&mut sink));
    assert!(matches!(result, Err(SamplerError::Init(SensorError::StartFailed))));
    assert_eq!(s.phase(), SamplerPhase::Failed);
    assert!(!state.try_read().unwrap().valid);
    assert_eq!(handler.route(Method::Get, "/aqi").status, 503);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            MonitorEvent::PhaseChanged {
                from: SamplerPhase::Init,
                to: SamplerPhase::Failed
            }
        )),
        1
    );
}

#[test]
fn transient_failures_never_replace_good_data() {
    let (mut s, state, handler) = rig(ScriptedSensor::new(&[
        Step::Values(raw(121, 100, 0)),
        Step::ReadyCheckFails,
        Step::NotReady,
        Step::ReadFails,
        Step::Values(raw(354, 100, 0)),
    ]));
    let mut sink = RecordingSink::default();
    s.init(&mut sink).unwrap();

    block_on(s.cycle(&mut sink));
    let first = state.try_read().unwrap();
    assert_eq!(first.aqi, 51);

    for _ in 0..3 {
        let outcome = block_on(s.cycle(&mut sink));
        assert!(!matches!(outcome, CycleOutcome::Ready(_)));
        assert_eq!(state.try_read().unwrap(), first);
        assert_eq!(handler.route(Method::Get, "/aqi").status, 200);
    }

    block_on(s.cycle(&mut sink));
    let last = state.try_read().unwrap();
    assert_eq!(last.aqi, 100);
    assert!(last.timestamp > first.timestamp);
    assert_eq!(s.stats().read_errors, 2);
    assert_eq!(s.stats().not_ready, 1);
}

#[test]
fn spawned_sampler_publishes_from_simulator() {
    sim::sim_set_raw(350, 540, 0);
    let state = Arc::new(SharedSensorState::new());
    let config = MonitorConfig {
        poll_interval_ms: 200,
        warmup_ms: 0,
        ..MonitorConfig::default()
    };
    let sampler = Sampler::new(
        SimSensor::new(),
        aqimon::adapters::time::SystemClock::new(),
        Arc::clone(&state),
        &config,
    );
    let _task = sampler::spawn(sampler, aqimon::adapters::log_sink::LogEventSink::new()).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let snap = loop {
        let snap = state.read_blocking(Duration::from_millis(100)).unwrap();
        if snap.valid {
            break snap;
        }
        assert!(Instant::now() < deadline, "sampler never published");
        std::thread::sleep(Duration::from_millis(20));
    };
    assert_eq!(snap.reading.pm2_5, 35.0);
    assert_eq!(snap.aqi, 99);
}
