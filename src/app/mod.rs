//! Application core: the sampling state machine and its ports.
//!
//! Hardware, clock, storage and logging sit behind the traits in
//! [`ports`], so everything here runs on the host against mocks.

pub mod events;
pub mod ports;
pub mod sampler;
