//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for [`MonitorConfig`] and holds the WiFi
//! station credentials.
//!
//! - Config is one postcard blob under `aqimon/moncfg`, validated on both
//!   save and load. A missing, corrupt or out-of-range blob yields the
//!   defaults with a warning.
//! - Credentials live in the `wifi` namespace (`ssid`, `pass`). When
//!   absent, the build-time `AQIMON_WIFI_SSID` / `AQIMON_WIFI_PASS` apply.
//! - The host backend is an in-memory map with the same semantics.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::MonitorConfig;
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "aqimon";
const CONFIG_KEY: &str = "moncfg";
const WIFI_NAMESPACE: &str = "wifi";
const SSID_KEY: &str = "ssid";
const PASS_KEY: &str = "pass";

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 512;

/// Station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Initialise NVS flash.
    ///
    /// On a full partition or a version mismatch the partition is erased
    /// and re-initialised. Calling this after `EspDefaultNvsPartition::take()`
    /// is harmless.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called from the main task before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NVS: initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NVS: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// [`ConfigPort::load`], falling back to defaults on any storage error.
    pub fn load_or_default(&self) -> MonitorConfig {
        self.load().unwrap_or_else(|e| {
            warn!("NVS: stored config unusable ({}), using defaults", e);
            MonitorConfig::default()
        })
    }

    /// Stored credentials, else the build-time ones. `None` if neither
    /// names an SSID.
    pub fn wifi_credentials(&self) -> Option<WifiCredentials> {
        let mut ssid_buf = [0u8; 32];
        let mut pass_buf = [0u8; 64];
        let stored = self
            .read_blob(WIFI_NAMESPACE, SSID_KEY, &mut ssid_buf)
            .and_then(|n| core::str::from_utf8(&ssid_buf[..n]).ok());
        let (ssid, password) = match stored {
            Some(ssid) => {
                let password = self
                    .read_blob(WIFI_NAMESPACE, PASS_KEY, &mut pass_buf)
                    .and_then(|n| core::str::from_utf8(&pass_buf[..n]).ok())
                    .unwrap_or("");
                (ssid, password)
            }
            None => (
                option_env!("AQIMON_WIFI_SSID").unwrap_or(""),
                option_env!("AQIMON_WIFI_PASS").unwrap_or(""),
            ),
        };
        if ssid.is_empty() {
            return None;
        }
        Some(WifiCredentials {
            ssid: heapless::String::try_from(ssid).ok()?,
            password: heapless::String::try_from(password).ok()?,
        })
    }

    /// Persist station credentials.
    pub fn store_wifi_credentials(&self, creds: &WifiCredentials) -> Result<(), ConfigError> {
        self.write_blob(WIFI_NAMESPACE, SSID_KEY, creds.ssid.as_bytes())?;
        self.write_blob(WIFI_NAMESPACE, PASS_KEY, creds.password.as_bytes())?;
        info!("NVS: WiFi credentials stored (SSID='{}')", creds.ssid);
        Ok(())
    }

    // ── Backend ───────────────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Option<usize> {
        let store = self.store.borrow();
        let data = store.get(&Self::composite_key(namespace, key))?;
        if data.len() > buf.len() {
            return None;
        }
        buf[..data.len()].copy_from_slice(data);
        Some(data.len())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    /// NUL-terminated copy of a namespace or key (NVS limit: 15 chars).
    #[cfg(target_os = "espidf")]
    fn c_name(s: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let len = s.len().min(15);
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        buf
    }

    /// Open a namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = Self::c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Option<usize> {
        let key = Self::c_name(key);
        Self::with_nvs_handle(namespace, false, |handle| {
            let mut size = buf.len();
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(size)
        })
        .ok()
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let c_key = Self::c_name(key);
        Self::with_nvs_handle(namespace, true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    c_key.as_ptr() as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|e| {
            warn!("NVS: write {}/{} failed ({})", namespace, key, e);
            ConfigError::IoError
        })
    }

    /// Whether a config blob exists (distinguishes first boot from corruption).
    #[cfg(target_os = "espidf")]
    fn config_exists(&self) -> bool {
        let key = Self::c_name(CONFIG_KEY);
        Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
            let mut size = 0usize;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            Ok(ret == ESP_OK)
        })
        .unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn config_exists(&self) -> bool {
        self.store
            .borrow()
            .contains_key(&Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY))
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<MonitorConfig, ConfigError> {
        if !self.config_exists() {
            info!("NVS: no stored config, using defaults");
            return Ok(MonitorConfig::default());
        }

        let mut buf = [0u8; MAX_BLOB_SIZE];
        let len = self
            .read_blob(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf)
            .ok_or(ConfigError::IoError)?;
        let cfg: MonitorConfig =
            postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("NVS: loaded config ({} bytes)", len);
        Ok(cfg)
    }

    fn save(&self, config: &MonitorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::IoError);
        }
        self.write_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)?;
        info!("NVS: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_boot_loads_defaults() {
        let nvs = NvsAdapter::new().unwrap();
        assert_eq!(nvs.load(), Ok(MonitorConfig::default()));
    }

    #[test]
    fn save_then_load() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = MonitorConfig {
            poll_interval_ms: 2000,
            device_id: Some(heapless::String::try_from("kitchen").unwrap()),
            ..Default::default()
        };
        nvs.save(&cfg).unwrap();
        assert_eq!(nvs.load(), Ok(cfg));
    }

    #[test]
    fn save_rejects_invalid() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = MonitorConfig {
            read_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            nvs.save(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
        assert!(!nvs.config_exists());
    }

    #[test]
    fn corrupt_blob_falls_back_to_defaults() {
        let nvs = NvsAdapter::new().unwrap();
        nvs.write_blob(CONFIG_NAMESPACE, CONFIG_KEY, &[0xFF; 3]).unwrap();
        assert_eq!(nvs.load(), Err(ConfigError::Corrupted));
        assert_eq!(nvs.load_or_default(), MonitorConfig::default());
    }

    #[test]
    fn out_of_range_blob_is_rejected_on_load() {
        let nvs = NvsAdapter::new().unwrap();
        let bad = MonitorConfig {
            poll_interval_ms: 1,
            ..Default::default()
        };
        let bytes = postcard::to_allocvec(&bad).unwrap();
        nvs.write_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes).unwrap();
        assert!(matches!(nvs.load(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn stored_wifi_credentials_roundtrip() {
        let nvs = NvsAdapter::new().unwrap();
        let creds = WifiCredentials {
            ssid: heapless::String::try_from("HomeWiFi").unwrap(),
            password: heapless::String::try_from("mysecret8").unwrap(),
        };
        nvs.store_wifi_credentials(&creds).unwrap();
        assert_eq!(nvs.wifi_credentials(), Some(creds));
    }
}
