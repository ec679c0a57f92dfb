//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below exercises one path through the firmware against mock
//! adapters. All tests run on the host with no hardware.

mod concurrency_tests;
mod http_tests;
mod mock_sensor;
mod sampler_tests;
