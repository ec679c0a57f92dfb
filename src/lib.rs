//! AQI monitor firmware library.
//!
//! Everything except the binary's bootstrap lives here so the host test
//! suite can drive it. ESP-IDF specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod aqi;
pub mod config;
pub mod drivers;
pub mod error;
pub mod http;
pub mod sensors;
pub mod state;

#[cfg(target_os = "espidf")]
mod esp_link_shims;
