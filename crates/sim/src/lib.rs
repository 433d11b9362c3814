//! robocycle_sim - Host simulation of the robocycle control loop
//!
//! Drives [`robocycle_core`] at a fixed rate against simple mechanism models,
//! with operator input replayed from a TOML timeline.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration and validation
//! - [`plant`]: Simulated elevator, drive and outrigger mechanisms
//! - [`routines`]: Named routine table used by the script
//! - [`script`]: Timeline-driven intent source
//! - [`clock`]: Lockstep and wall clocks
//! - [`harness`]: Robot construction and the run loops
//! - [`logging`]: tracing subscriber setup

pub mod clock;
pub mod config;
pub mod error;
pub mod harness;
pub mod logging;
pub mod plant;
pub mod routines;
pub mod script;

pub use clock::{SimClock, WallClock};
pub use config::SimConfig;
pub use error::SimError;
pub use harness::{SimSummary, Simulation};
pub use logging::init_tracing;
pub use script::ScriptedIntent;
