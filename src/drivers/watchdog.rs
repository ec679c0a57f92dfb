//! Task Watchdog Timer (TWDT) subscription for the sampling thread.
//!
//! A sampler stuck inside an I2C transaction stops feeding and the device
//! resets after [`TIMEOUT_MS`].

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::{info, warn};

pub const TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Subscribe the calling task to the TWDT.
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms: TIMEOUT_MS,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    warn!("Watchdog: reconfigure returned {} (already configured?)", ret);
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    info!("Watchdog: sampler subscribed ({} ms)", TIMEOUT_MS);
                } else {
                    warn!("Watchdog: subscribe failed ({})", ret);
                }
                Self { subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::debug!("Watchdog(sim): no-op");
            Self {}
        }
    }

    /// Reset the countdown. Call at least once per [`TIMEOUT_MS`].
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    /// Remove the calling task from the TWDT before it exits.
    pub fn unsubscribe(self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            unsafe {
                esp_task_wdt_delete(core::ptr::null_mut());
            }
        }
    }
}
