//! Adapters: concrete implementations of the port traits and the
//! ESP-IDF services around them.
//!
//! | Adapter       | Implements / provides | Connects to                 |
//! |---------------|-----------------------|-----------------------------|
//! | `device_id`   | `aqi-xxyyzz` identity | eFuse factory MAC           |
//! | `http_server` | request dispatch      | ESP-IDF httpd               |
//! | `log_sink`    | EventSink             | Serial log output           |
//! | `nvs`         | ConfigPort            | NVS / in-memory store       |
//! | `time`        | ClockPort, SNTP sync  | System clock, ESP-IDF SNTP  |
//! | `wifi`        | ConnectivityPort      | ESP-IDF WiFi STA            |

pub mod device_id;
pub mod http_server;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
