//! Platform abstractions consumed by the cycle driver.
//!
//! - Trait definitions are pure and have no feature gates
//! - Mock implementations are always available for host testing
//! - Wall-clock implementations live in the simulation crate

pub mod time;

pub use time::{MockTime, TimeSource};
