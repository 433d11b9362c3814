//! Cycle driver and timing
//!
//! # Components
//!
//! - [`types`]: Cycle budget and statistics
//! - [`driver`]: The [`Robot`] cycle driver, robot modes and the
//!   [`IntentSource`] trait

pub mod driver;
pub mod types;

pub use driver::{IntentSource, Robot, RobotMode, SchedulerConfig};
pub use types::{CycleBudget, CycleStats};
