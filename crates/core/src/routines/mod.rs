//! Concrete routines
//!
//! Routines that drive a subsystem lock it in `begin` and unlock it in
//! `terminate`, so the operator regains control as soon as they finish.

mod drive;
mod elevator;
mod outrigger;
mod wait;

pub use drive::TimedDriveRoutine;
pub use elevator::SetElevatorPositionRoutine;
pub use outrigger::SetOutriggerAngleRoutine;
pub use wait::WaitRoutine;
