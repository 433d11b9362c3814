//! Concrete subsystems
//!
//! Each subsystem talks to hardware only through an actuator bridge trait
//! ([`ElevatorActuator`], [`DriveActuator`], [`OutriggerActuator`]).
//! Platform crates implement the bridges; the logic here is host-testable.

pub mod drive;
pub mod elevator;
pub mod outrigger;

pub use drive::{Drive, DriveActuator, DriveConfig};
pub use elevator::{
    Elevator, ElevatorActuator, ElevatorConfig, ElevatorController, ElevatorControllerId,
    ElevatorDemand, ElevatorFaults, ElevatorPlant,
};
pub use outrigger::{
    Outrigger, OutriggerActuator, OutriggerConfig, OutriggerController, OutriggerControllerId,
    OutriggerPlant,
};

use core::fmt;

/// Actuator bridge error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Device did not answer within its timeout
    Timeout,
    /// Device rejected the demand (mode or range)
    Rejected,
    /// Bus or hardware failure, with a device specific code
    Hardware(i32),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorError::Timeout => write!(f, "timeout"),
            ActuatorError::Rejected => write!(f, "demand rejected"),
            ActuatorError::Hardware(code) => write!(f, "hardware error {}", code),
        }
    }
}
