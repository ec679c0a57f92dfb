//! Query handler: request → response, no sockets.
//!
//! The ESP-IDF server adapter (`adapters::http_server`) forwards every
//! request here via [`QueryHandler::route`] and writes the returned
//! [`HttpResponse`] back. Keeping the handler pure lets the host tests
//! assert exact status codes, headers and bodies.
//!
//! Routes:
//!
//! | Method    | Path   | Response                                   |
//! |-----------|--------|--------------------------------------------|
//! | `GET`     | `/`    | 200 text banner                            |
//! | `GET`     | `/aqi` | 200 JSON snapshot, or 503 JSON error       |
//! | `OPTIONS` | `/aqi` | 204 with CORS preflight headers            |
//! | other     | other  | 404 `Not found`                            |

use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use log::{debug, error, warn};
use serde::{Serialize, Serializer};

use crate::aqi::AqiCategory;
use crate::state::{SharedSensorState, Snapshot};

pub const ROOT_PATH: &str = "/";
pub const AQI_PATH: &str = "/aqi";
pub const BANNER: &str = "ESP32 AQI Monitor - GET /aqi for data";

const JSON: &str = "application/json";
const TEXT: &str = "text/plain";

const CORS_ORIGIN: (&str, &str) = ("Access-Control-Allow-Origin", "*");
const CORS_METHODS: (&str, &str) = ("Access-Control-Allow-Methods", "GET, OPTIONS");
const CORS_HEADERS: (&str, &str) = ("Access-Control-Allow-Headers", "Content-Type");

// ───────────────────────────────────────────────────────────────
// Request / response
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Options,
    Other,
}

impl Method {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("GET") {
            Self::Get
        } else if s.eq_ignore_ascii_case("OPTIONS") {
            Self::Options
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// `None` for bodiless responses.
    pub content_type: Option<&'static str>,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: String,
}

impl HttpResponse {
    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: Some(TEXT),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: Some(JSON),
            headers: Vec::new(),
            body,
        }
    }

    /// Look up a header by case-insensitive name (`Content-Type` included).
    pub fn header(&self, name: &str) -> Option<&'static str> {
        if name.eq_ignore_ascii_case("Content-Type") {
            return self.content_type;
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

/// Why `GET /aqi` could not return data. Both map to 503.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// The snapshot lock was not obtained within the read timeout.
    LockTimeout,
    /// No sampling cycle has completed yet.
    NotReady,
}

impl ApiError {
    pub const fn code(self) -> &'static str {
        match self {
            Self::LockTimeout => "SENSOR_LOCK_TIMEOUT",
            Self::NotReady => "SENSOR_NOT_READY",
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::LockTimeout => "Sensor data unavailable",
            Self::NotReady => "Sensor not ready",
        }
    }

    pub const fn status(self) -> u16 {
        503
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

impl core::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorPayload {
    error: &'static str,
    code: &'static str,
}

// ───────────────────────────────────────────────────────────────
// Wire payload
// ───────────────────────────────────────────────────────────────

/// `GET /aqi` body. Field order is the wire order.
#[derive(Debug, Serialize)]
pub struct AqiPayload<'a> {
    pub device_id: &'a str,
    pub timestamp: String,
    #[serde(serialize_with = "one_decimal")]
    pub pm1_0: f32,
    #[serde(serialize_with = "one_decimal")]
    pub pm2_5: f32,
    #[serde(serialize_with = "one_decimal")]
    pub pm4_0: f32,
    #[serde(serialize_with = "one_decimal")]
    pub pm10: f32,
    #[serde(serialize_with = "one_decimal")]
    pub voc_index: f32,
    #[serde(serialize_with = "one_decimal")]
    pub nox_index: f32,
    #[serde(serialize_with = "one_decimal")]
    pub temperature: f32,
    #[serde(serialize_with = "one_decimal")]
    pub humidity: f32,
    pub aqi: u16,
    pub aqi_category: AqiCategory,
}

impl<'a> AqiPayload<'a> {
    pub fn new(device_id: &'a str, snapshot: &Snapshot) -> Self {
        let r = &snapshot.reading;
        Self {
            device_id,
            timestamp: snapshot.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            pm1_0: r.pm1_0,
            pm2_5: r.pm2_5,
            pm4_0: r.pm4_0,
            pm10: r.pm10,
            voc_index: r.voc_index,
            nox_index: r.nox_index,
            temperature: r.temperature,
            humidity: r.humidity,
            aqi: snapshot.aqi,
            aqi_category: snapshot.category(),
        }
    }
}

/// Round to one decimal place the way `printf("%.1f")` does: on the exact
/// binary value, with exact ties going to even (23.25 → 23.2).
fn round1(v: f32) -> f64 {
    let v = f64::from(v);
    format!("{v:.1}").parse().unwrap_or(v)
}

fn one_decimal<S: Serializer>(v: &f32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round1(*v))
}

// ───────────────────────────────────────────────────────────────
// Handler
// ───────────────────────────────────────────────────────────────

/// Shared by every HTTP worker; cheap to clone.
#[derive(Clone)]
pub struct QueryHandler {
    state: Arc<SharedSensorState>,
    device_id: Arc<str>,
    read_timeout: Duration,
}

impl QueryHandler {
    pub fn new(state: Arc<SharedSensorState>, device_id: &str, read_timeout: Duration) -> Self {
        Self {
            state,
            device_id: Arc::from(device_id),
            read_timeout,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Dispatch on method and path. Any query string is ignored.
    pub fn route(&self, method: Method, uri: &str) -> HttpResponse {
        let path = uri.split_once('?').map_or(uri, |(p, _)| p);
        debug!("HTTP: {:?} {}", method, path);
        match (method, path) {
            (Method::Get, ROOT_PATH) => self.root(),
            (Method::Get, AQI_PATH) => self.aqi(),
            (Method::Options, AQI_PATH) => self.aqi_options(),
            _ => HttpResponse::text(404, "Not found"),
        }
    }

    pub fn root(&self) -> HttpResponse {
        HttpResponse::text(200, BANNER)
    }

    /// `GET /aqi`. Waits at most `read_timeout` for the snapshot lock.
    pub fn aqi(&self) -> HttpResponse {
        match self.snapshot() {
            Ok(snapshot) => self.render(&snapshot),
            Err(e) => {
                warn!("HTTP: /aqi unavailable: {}", e);
                Self::error(e)
            }
        }
    }

    /// `OPTIONS /aqi` CORS preflight.
    pub fn aqi_options(&self) -> HttpResponse {
        HttpResponse {
            status: 204,
            content_type: None,
            headers: vec![CORS_ORIGIN, CORS_METHODS, CORS_HEADERS],
            body: String::new(),
        }
    }

    /// A valid snapshot, or why there is none.
    pub fn snapshot(&self) -> Result<Snapshot, ApiError> {
        let snapshot = self
            .state
            .read_blocking(self.read_timeout)
            .map_err(|_| ApiError::LockTimeout)?;
        if !snapshot.valid {
            return Err(ApiError::NotReady);
        }
        Ok(snapshot)
    }

    fn render(&self, snapshot: &Snapshot) -> HttpResponse {
        match serde_json::to_string(&AqiPayload::new(&self.device_id, snapshot)) {
            Ok(body) => {
                let mut resp = HttpResponse::json(200, body);
                resp.headers.push(CORS_ORIGIN);
                resp
            }
            Err(e) => {
                error!("HTTP: payload serialization failed: {}", e);
                HttpResponse::text(500, "Internal error")
            }
        }
    }

    fn error(e: ApiError) -> HttpResponse {
        let payload = ErrorPayload {
            error: e.message(),
            code: e.code(),
        };
        // Two static strings cannot fail to serialize.
        let body = serde_json::to_string(&payload).unwrap_or_default();
        HttpResponse::json(e.status(), body)
    }
}
