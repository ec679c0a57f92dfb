//! WiFi station-mode adapter: the network-link provider.
//!
//! [`ConnectivityPort::poll`] drives the link and yields a [`LinkEvent`]
//! on every transition: `Connected(ip)` once an address is assigned,
//! `Disconnected` when the link drops.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi<EspWifi>`.
//! - **all other targets**: simulated link with injectable failures.
//!
//! ## Reconnection policy
//!
//! After a failed attempt or a dropped link the adapter waits an
//! exponential backoff (2 s → 4 s → 8 s … capped at 60 s) before retrying.
//! A successful connect resets the backoff.

use core::fmt;
use core::net::Ipv4Addr;
use std::time::{Duration, Instant};

use log::{error, info, warn};

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connected(Ipv4Addr),
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    AlreadyConnected,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(
                f,
                "password invalid (must be 8-64 bytes for WPA2, or empty for open)"
            ),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::AlreadyConnected => write!(f, "already connected to AP"),
        }
    }
}

impl core::error::Error for ConnectivityError {}

impl From<ConnectivityError> for crate::error::CommsError {
    fn from(_: ConnectivityError) -> Self {
        Self::WifiConnectFailed
    }
}

pub trait ConnectivityPort {
    /// One connection attempt. Emits nothing; the next `poll` reports it.
    fn connect(&mut self) -> Result<(), ConnectivityError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Advance the link state machine; returns a transition if one happened.
    fn poll(&mut self) -> Option<LinkEvent>;
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
    fn ip(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32 },
}

pub const INITIAL_BACKOFF_SECS: u32 = 2;
pub const MAX_BACKOFF_SECS: u32 = 60;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_secs: u32,
    next_attempt: Option<Instant>,
    ip: Option<Ipv4Addr>,
    /// A successful `connect()` not yet reported by `poll()`.
    unreported: bool,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimLink,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimLink {
    fail_connects: u32,
    up: bool,
    attempts: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    ) -> Self {
        Self::with_platform(wifi)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self::with_platform(SimLink::default())
    }

    #[cfg(target_os = "espidf")]
    fn with_platform(
        wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    ) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: INITIAL_BACKOFF_SECS,
            next_attempt: None,
            ip: None,
            unreported: false,
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn with_platform(sim: SimLink) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: INITIAL_BACKOFF_SECS,
            next_attempt: None,
            ip: None,
            unreported: false,
            sim,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs.into())
    }

    /// Connect, retrying with backoff until the link is up. Boot only.
    pub fn connect_blocking(&mut self) -> Result<Ipv4Addr, ConnectivityError> {
        if let Err(e) = self.connect() {
            if e == ConnectivityError::NoCredentials {
                return Err(e);
            }
        }
        loop {
            if let Some(LinkEvent::Connected(ip)) = self.poll() {
                return Ok(ip);
            }
            std::thread::sleep(Duration::from_millis(250));
        }
    }

    /// [`ConnectivityPort::poll`] against an explicit clock.
    pub fn poll_at(&mut self, now: Instant) -> Option<LinkEvent> {
        match self.state {
            WifiState::Connected => {
                if self.unreported {
                    self.unreported = false;
                    return self.ip.map(LinkEvent::Connected);
                }
                if self.platform_is_connected() {
                    return None;
                }
                warn!("WiFi: connection lost, entering reconnect");
                self.ip = None;
                self.state = WifiState::Reconnecting { attempt: 0 };
                self.next_attempt = Some(now + self.backoff());
                Some(LinkEvent::Disconnected)
            }
            WifiState::Reconnecting { attempt } => {
                if self.next_attempt.is_some_and(|t| now < t) {
                    return None;
                }
                info!(
                    "WiFi: reconnect attempt {} (backoff {}s)",
                    attempt + 1,
                    self.backoff_secs
                );
                match self.platform_connect() {
                    Ok(ip) => {
                        self.on_connected(ip);
                        self.unreported = false;
                        Some(LinkEvent::Connected(ip))
                    }
                    Err(e) => {
                        warn!("WiFi: reconnect failed: {}", e);
                        self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
                        self.next_attempt = Some(now + self.backoff());
                        self.state = WifiState::Reconnecting {
                            attempt: attempt + 1,
                        };
                        None
                    }
                }
            }
            WifiState::Disconnected => None,
        }
    }

    fn on_connected(&mut self, ip: Ipv4Addr) {
        self.state = WifiState::Connected;
        self.ip = Some(ip);
        self.backoff_secs = INITIAL_BACKOFF_SECS;
        self.next_attempt = None;
        info!("WiFi: connected to '{}', IP {}", self.ssid, ip);
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<Ipv4Addr, ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let conf = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: if self.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });

        let failed = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi: driver error {}", e);
            ConnectivityError::ConnectionFailed
        };
        self.wifi.set_configuration(&conf).map_err(failed)?;
        if !self.wifi.is_started().map_err(failed)? {
            self.wifi.start().map_err(failed)?;
        }
        self.wifi.connect().map_err(failed)?;
        self.wifi.wait_netif_up().map_err(failed)?;
        let info = self.wifi.wifi().sta_netif().get_ip_info().map_err(failed)?;
        Ok(info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<Ipv4Addr, ConnectivityError> {
        self.sim.attempts += 1;
        if self.sim.fail_connects > 0 {
            self.sim.fail_connects -= 1;
            warn!("WiFi(sim): simulated failure (attempt {})", self.sim.attempts);
            return Err(ConnectivityError::ConnectionFailed);
        }
        self.sim.up = true;
        Ok(Ipv4Addr::new(192, 168, 4, 2))
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        let _ = self.wifi.disconnect();
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        self.sim.up = false;
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim.up
    }

    // ── Simulation controls ───────────────────────────────────

    /// Fail the next `n` connection attempts.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_connects(&mut self, n: u32) {
        self.sim.fail_connects = n;
    }

    /// Drop the link as if the AP went away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim.up = false;
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if self.state == WifiState::Connected {
            return Err(ConnectivityError::AlreadyConnected);
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        match self.platform_connect() {
            Ok(ip) => {
                self.on_connected(ip);
                self.unreported = true;
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Reconnecting { attempt: 0 };
                self.next_attempt = Some(Instant::now() + self.backoff());
                Err(e)
            }
        }
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        self.ip = None;
        self.unreported = false;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.platform_is_connected()
    }

    fn poll(&mut self) -> Option<LinkEvent> {
        self.poll_at(Instant::now())
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    fn ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> WifiAdapter {
        let mut a = WifiAdapter::new();
        a.set_credentials("HomeWiFi", "mysecret8").unwrap();
        a
    }

    #[test]
    fn rejects_bad_credentials() {
        let mut a = WifiAdapter::new();
        assert_eq!(a.set_credentials("", "password123"), Err(ConnectivityError::InvalidSsid));
        assert_eq!(
            a.set_credentials("MyNet", "short"),
            Err(ConnectivityError::InvalidPassword)
        );
        assert!(a.set_credentials("OpenCafe", "").is_ok());
    }

    #[test]
    fn connect_without_credentials_fails() {
        let mut a = WifiAdapter::new();
        assert_eq!(a.connect(), Err(ConnectivityError::NoCredentials));
    }

    #[test]
    fn connect_reports_address_once() {
        let mut a = adapter();
        a.connect().unwrap();
        assert!(a.is_connected());
        let now = Instant::now();
        assert_eq!(
            a.poll_at(now),
            Some(LinkEvent::Connected(Ipv4Addr::new(192, 168, 4, 2)))
        );
        assert_eq!(a.poll_at(now), None);
        assert_eq!(a.connect(), Err(ConnectivityError::AlreadyConnected));
    }

    #[test]
    fn drop_then_reconnect_after_backoff() {
        let mut a = adapter();
        a.connect().unwrap();
        let t0 = Instant::now();
        a.poll_at(t0);

        a.sim_drop_link();
        assert_eq!(a.poll_at(t0), Some(LinkEvent::Disconnected));
        assert_eq!(a.ip(), None);

        // Still inside the 2 s backoff.
        assert_eq!(a.poll_at(t0 + Duration::from_secs(1)), None);
        assert!(matches!(
            a.poll_at(t0 + Duration::from_secs(2)),
            Some(LinkEvent::Connected(_))
        ));
        assert_eq!(a.state(), WifiState::Connected);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut a = adapter();
        a.sim_fail_connects(u32::MAX);
        assert_eq!(a.connect(), Err(ConnectivityError::ConnectionFailed));

        let mut now = Instant::now();
        let mut seen = Vec::new();
        for _ in 0..7 {
            now += a.backoff();
            assert_eq!(a.poll_at(now), None);
            seen.push(a.backoff().as_secs());
        }
        assert_eq!(seen, vec![4, 8, 16, 32, 60, 60, 60]);
    }

    #[test]
    fn success_resets_backoff() {
        let mut a = adapter();
        a.sim_fail_connects(2);
        let _ = a.connect();
        let mut now = Instant::now() + a.backoff();
        assert_eq!(a.poll_at(now), None);
        now += a.backoff();
        assert!(matches!(a.poll_at(now), Some(LinkEvent::Connected(_))));
        assert_eq!(a.backoff(), Duration::from_secs(INITIAL_BACKOFF_SECS.into()));
    }

    #[test]
    fn connect_blocking_returns_address() {
        let mut a = adapter();
        assert_eq!(a.connect_blocking(), Ok(Ipv4Addr::new(192, 168, 4, 2)));
    }
}
