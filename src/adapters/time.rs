//! Wall-clock adapter.
//!
//! - [`SystemClock`] implements [`ClockPort`] from the system time, which on
//!   ESP-IDF is newlib's `gettimeofday()` and on the host `SystemTime`.
//! - [`SntpSync`] starts ESP-IDF SNTP and waits (bounded) for the first
//!   sync at boot. Until then the device clock counts from 1970 and
//!   snapshots carry that time.

use chrono::{DateTime, Utc};

use crate::app::ports::ClockPort;

/// Anything earlier is treated as "never synced".
pub const EPOCH_2020: i64 = 1_577_836_800;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }

    /// Whether the wall clock looks set (post-2020).
    pub fn is_synced(&self) -> bool {
        self.now_utc().timestamp() >= EPOCH_2020
    }
}

impl ClockPort for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Running SNTP client. Dropping it stops time sync.
#[cfg(target_os = "espidf")]
pub struct SntpSync {
    _sntp: esp_idf_svc::sntp::EspSntp<'static>,
}

#[cfg(target_os = "espidf")]
impl SntpSync {
    /// Start SNTP against `server` and wait up to `timeout_secs` for the
    /// first sync. A timeout is logged, not fatal.
    pub fn start(server: &str, timeout_secs: u16) -> Result<Self, crate::error::CommsError> {
        use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};
        use log::{error, info, warn};

        let mut conf = SntpConf::default();
        conf.servers[0] = server;
        let sntp = EspSntp::new(&conf).map_err(|e| {
            error!("SNTP: start failed: {}", e);
            crate::error::CommsError::SntpStartFailed
        })?;
        info!("SNTP: started ({})", server);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(timeout_secs.into());
        while sntp.get_sync_status() != SyncStatus::Completed
            && std::time::Instant::now() < deadline
        {
            std::thread::sleep(std::time::Duration::from_millis(250));
        }
        // RTC time survives a soft reset.
        if SystemClock.is_synced() {
            info!("SNTP: clock set, now {}", SystemClock.now_utc());
        } else {
            warn!(
                "SNTP: not synced after {}s, timestamps use device clock",
                timeout_secs
            );
        }
        Ok(Self { _sntp: sntp })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_clock_is_set_and_advances() {
        let clock = SystemClock::new();
        assert!(clock.is_synced());
        let a = clock.now_utc();
        let b = clock.now_utc();
        assert!(b >= a);
    }
}
