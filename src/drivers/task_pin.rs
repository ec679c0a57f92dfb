//! Core-pinned thread spawning.
//!
//! ESP-IDF implements `std::thread` on pthreads over FreeRTOS tasks.
//! `esp_pthread_set_cfg()` configures the *next* `pthread_create()` from
//! the calling thread, so config and spawn must stay paired.

/// ESP32 CPU cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0: WiFi, lwIP, HTTP server.
    Pro = 0,
    /// Core 1: sensor sampling.
    App = 1,
}

/// Spawn a thread pinned to `core` with the given FreeRTOS priority and
/// stack. `name` must be NUL-terminated (e.g. `"sampler\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    // SAFETY: cfg outlives the call; `name` is 'static and NUL-terminated.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = priority as i32;
        cfg.stack_size = (stack_kb * 1024) as i32;
        cfg.thread_name = name.as_ptr() as *const _;
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(std::io::Error::other(format!(
            "esp_pthread_set_cfg failed: {ret}"
        )));
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Task: spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
}

/// Host debug builds need far more stack than the device.
#[cfg(not(target_os = "espidf"))]
const HOST_MIN_STACK_KB: usize = 256;

/// Host fallback: no affinity or priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    let display_name = name.trim_end_matches('\0');
    log::info!("Task: spawning '{}' (sim, stack={}KB)", display_name, stack_kb);

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb.max(HOST_MIN_STACK_KB) * 1024)
        .spawn(f)
}
