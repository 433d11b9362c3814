//! robocycle_core - Pure no_std cycle scheduling and command arbitration
//!
//! This crate contains the platform-agnostic machinery that drives a set of
//! actuator subsystems from one stream of operator/autonomous intent at a
//! fixed rate. It can be tested on host without any feature flags.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives
//! - **no_std + alloc**: Shared routine handles and registries need `alloc`
//! - **Trait abstractions**: Actuators, time, intent and log sinks are injected
//!
//! # Modules
//!
//! - [`diagnostics`]: Leveled diagnostics handle and sinks
//! - [`intent`]: Per-cycle intent snapshot
//! - [`controller`]: Pluggable controller strategies and their selection
//! - [`subsystem`]: Subsystem pipeline, locking and the subsystem registry
//! - [`subsystems`]: Elevator, drive and outrigger subsystems
//! - [`routine`]: Routine state machine, composites and the routine manager
//! - [`routines`]: Concrete autonomous routines
//! - [`scheduler`]: Cycle driver, cycle budget and statistics
//! - [`traits`]: Platform abstractions (TimeSource)
//! - [`math`]: Deadzone, clamp and range helpers

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod controller;
pub mod diagnostics;
pub mod intent;
pub mod math;
pub mod routine;
pub mod routines;
pub mod scheduler;
pub mod subsystem;
pub mod subsystems;
pub mod traits;

pub use controller::{ControlStrategy, ControllerSet, Directive};
pub use diagnostics::{Diagnostics, DiagnosticsSink, Level, LevelFilter};
pub use intent::{Intent, MAX_INTENT_ROUTINES};
pub use routine::{
    CancelPolicy, ParallelRoutine, Routine, RoutineContext, RoutineHandle, RoutineManager,
    RoutineManagerConfig, RoutineState, SequentialRoutine,
};
pub use scheduler::{CycleBudget, CycleStats, IntentSource, Robot, RobotMode, SchedulerConfig};
pub use subsystem::{Subsystem, SubsystemConfig, SubsystemCore, SubsystemHandle, SubsystemRegistry};
pub use traits::{MockTime, TimeSource};
