//! AQI Monitor firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  Sen5x (I2C)   SystemClock+SNTP   LogEventSink   NvsAdapter  │
//! │  (Transport)   (ClockPort)        (EventSink)    (Config)    │
//! │  WifiAdapter   HttpServer → QueryHandler                     │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  Sampler (APP core) ──publish──▶ SharedSensorState           │
//! │                                   ▲ read(timeout)            │
//! │  httpd workers (PRO core) ────────┘                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::delay::Delay;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use aqimon::adapters::device_id;
use aqimon::adapters::http_server::HttpServer;
use aqimon::adapters::log_sink::LogEventSink;
use aqimon::adapters::nvs::NvsAdapter;
use aqimon::adapters::time::{SntpSync, SystemClock};
use aqimon::adapters::wifi::{ConnectivityPort, LinkEvent, WifiAdapter};
use aqimon::app::sampler::{self, Sampler};
use aqimon::error::{CommsError, Error};
use aqimon::http::QueryHandler;
use aqimon::sensors::sen5x::Sen5x;
use aqimon::state::SharedSensorState;

/// Main-task link supervision period.
const LINK_POLL: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AQI Monitor v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Config + identity ──────────────────────────────────
    let nvs = NvsAdapter::new().map_err(Error::from)?;
    let config = nvs.load_or_default();
    let dev_id = device_id::resolve(&config, &device_id::read_mac());
    info!("Device ID: {}", dev_id);

    // ── 3. WiFi (blocks until the first address) ──────────────
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs_partition))?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sysloop)?);
    let creds = nvs
        .wifi_credentials()
        .ok_or(Error::Config("no WiFi credentials"))?;
    wifi.set_credentials(&creds.ssid, &creds.password)
        .map_err(|e| Error::Comms(CommsError::from(e)))?;
    let ip = wifi
        .connect_blocking()
        .map_err(|e| Error::Comms(CommsError::from(e)))?;
    info!("WiFi: up at {}", ip);

    // ── 4. Wall clock ─────────────────────────────────────────
    let _sntp = SntpSync::start(&config.sntp_server, config.sntp_sync_timeout_secs)
        .map_err(Error::from)?;

    // ── 5. Shared state + query handler ───────────────────────
    let state = Arc::new(SharedSensorState::new());
    let handler = QueryHandler::new(
        Arc::clone(&state),
        &dev_id,
        Duration::from_millis(config.read_timeout_ms.into()),
    );
    let _server = HttpServer::start(handler, config.http_port, config.http_stack_size)
        .map_err(Error::from)?;

    // ── 6. Sensor + sampling task ─────────────────────────────
    // SDA = GPIO21, SCL = GPIO22 (ESP32 DevKit defaults).
    let i2c_conf = I2cConfig::new().baudrate(Hertz(config.i2c_baudrate_hz));
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &i2c_conf,
    )?;
    let mut sen5x = Sen5x::with_address(i2c, Delay::new_default(), config.i2c_address);
    // A warm restart can leave the sensor measuring from the previous boot.
    if let Err(e) = sen5x.device_reset() {
        warn!("SEN5x: reset failed ({}), continuing", e);
    }
    match sen5x.serial_number() {
        Ok(serial) => info!("SEN5x: serial {}", serial),
        Err(e) => warn!("SEN5x: serial number read failed ({})", e),
    }

    let sampler = Sampler::new(sen5x, SystemClock::new(), Arc::clone(&state), &config);
    let _sampling = sampler::spawn(sampler, LogEventSink::new())?;

    info!("AQI HTTP server ready at http://{}:{}/aqi", ip, config.http_port);

    // ── 7. Link supervision ───────────────────────────────────
    loop {
        match wifi.poll() {
            Some(LinkEvent::Connected(ip)) => info!("WiFi: reconnected at {}", ip),
            Some(LinkEvent::Disconnected) => error!("WiFi: link lost, retrying with backoff"),
            None => {}
        }
        std::thread::sleep(LINK_POLL);
    }
}
