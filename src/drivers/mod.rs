//! Task plumbing for the sampling thread.

pub mod task_pin;
pub mod watchdog;
