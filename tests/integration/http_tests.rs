//! Query handler against a live shared state.

use std::sync::Arc;
use std::time::Duration;

use aqimon::http::{BANNER, Method, QueryHandler};
use aqimon::state::{Reading, SharedSensorState, Snapshot};

use crate::mock_sensor::epoch_2024;

fn handler_with(snapshot: Option<Snapshot>) -> QueryHandler {
    let state = Arc::new(SharedSensorState::new());
    if let Some(s) = snapshot {
        state.publish_blocking(s);
    }
    QueryHandler::new(state, "esp32-aqi-001", Duration::from_millis(100))
}

#[test]
fn not_ready_before_any_cycle() {
    let r = handler_with(None).route(Method::Get, "/aqi");
    assert_eq!(r.status, 503);
    assert_eq!(r.header("Content-Type"), Some("application/json"));
    let json: serde_json::Value = serde_json::from_str(&r.body).unwrap();
    assert_eq!(json["code"], "SENSOR_NOT_READY");
    assert_eq!(json["error"], "Sensor not ready");
}

#[test]
fn exact_wire_body() {
    let reading = Reading {
        pm1_0: 8.2,
        pm2_5: 12.0,
        pm4_0: 13.6,
        pm10: 15.0,
        temperature: 22.5,
        humidity: 41.0,
        voc_index: 98.0,
        nox_index: 1.0,
    };
    let h = handler_with(Some(Snapshot::captured(reading, 50, epoch_2024())));
    let r = h.route(Method::Get, "/aqi");
    assert_eq!(r.status, 200);
    assert_eq!(r.header("Access-Control-Allow-Origin"), Some("*"));
    assert_eq!(
        r.body,
        "{\"device_id\":\"esp32-aqi-001\",\"timestamp\":\"2024-01-01T00:00:00Z\",\
         \"pm1_0\":8.2,\"pm2_5\":12.0,\"pm4_0\":13.6,\"pm10\":15.0,\
         \"voc_index\":98.0,\"nox_index\":1.0,\
         \"temperature\":22.5,\"humidity\":41.0,\
         \"aqi\":50,\"aqi_category\":\"good\"}"
    );
}

#[test]
fn category_follows_aqi_boundaries() {
    for (aqi, expected) in [
        (50, "good"),
        (51, "moderate"),
        (101, "unhealthy_sensitive"),
        (151, "unhealthy"),
        (201, "very_unhealthy"),
        (500, "hazardous"),
    ] {
        let h = handler_with(Some(Snapshot::captured(Reading::ZERO, aqi, epoch_2024())));
        let json: serde_json::Value =
            serde_json::from_str(&h.route(Method::Get, "/aqi").body).unwrap();
        assert_eq!(json["aqi_category"], expected, "aqi {aqi}");
    }
}

#[test]
fn cors_preflight_and_fallbacks() {
    let h = handler_with(None);

    let pre = h.route(Method::Options, "/aqi");
    assert_eq!(pre.status, 204);
    assert_eq!(pre.header("Access-Control-Allow-Methods"), Some("GET, OPTIONS"));

    let root = h.route(Method::Get, "/");
    assert_eq!((root.status, root.body.as_str()), (200, BANNER));

    let missing = h.route(Method::parse("POST"), "/aqi");
    assert_eq!((missing.status, missing.body.as_str()), (404, "Not found"));
}
