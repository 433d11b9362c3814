//! Named routine table
//!
//! Script steps request routines by name. The table resolves those names to
//! shared handles built once at startup, so requesting the same name twice
//! re-runs the same routine instance.

use std::collections::BTreeMap;

use robocycle_core::routines::{
    SetElevatorPositionRoutine, SetOutriggerAngleRoutine, TimedDriveRoutine, WaitRoutine,
};
use robocycle_core::subsystems::{Drive, Elevator, Outrigger, OutriggerConfig};
use robocycle_core::{ParallelRoutine, RoutineHandle, SequentialRoutine, SubsystemHandle};

use crate::config::SimConfig;
use crate::error::SimError;

/// Handles of the subsystems that were built
#[derive(Debug, Clone, Copy, Default)]
pub struct SubsystemHandles {
    pub elevator: Option<SubsystemHandle<Elevator>>,
    pub drive: Option<SubsystemHandle<Drive>>,
    pub outrigger: Option<SubsystemHandle<Outrigger>>,
}

#[derive(Debug, Default)]
pub struct RoutineTable {
    routines: BTreeMap<String, RoutineHandle>,
    /// Names skipped because a subsystem they need is disabled
    unavailable: BTreeMap<String, &'static str>,
}

impl RoutineTable {
    /// Build the standard set of routines for the enabled subsystems
    pub fn standard(config: &SimConfig, handles: &SubsystemHandles) -> Self {
        let mut table = Self::default();
        let heights = config.heights;
        let ticks = |inches: f64| config.elevator.ticks(inches);
        let outrigger = OutriggerConfig::default();

        table.insert(WaitRoutine::from_millis("Wait", 500));

        match handles.elevator {
            Some(elevator) => {
                let presets = [
                    ("ElevatorDown", 0),
                    ("BottomHatch", ticks(heights.bottom_hatch)),
                    ("RocketMiddleHatch", ticks(heights.rocket_middle_hatch)),
                    ("RocketTopHatch", ticks(heights.rocket_top_hatch)),
                ];
                for (name, position) in presets {
                    table.insert(SetElevatorPositionRoutine::new(name, elevator, position));
                }
            }
            None => {
                for name in ["ElevatorDown", "BottomHatch", "RocketMiddleHatch", "RocketTopHatch"] {
                    table.unavailable.insert(name.to_string(), "elevator");
                }
            }
        }

        match handles.drive {
            Some(drive) => {
                table.insert(TimedDriveRoutine::new("DriveForward", drive, 0.3, 1_000_000));
            }
            None => {
                table.unavailable.insert("DriveForward".to_string(), "drive");
            }
        }

        match handles.outrigger {
            Some(arm) => {
                table.insert(SetOutriggerAngleRoutine::new(
                    "StowOutrigger",
                    arm,
                    outrigger.stow_angle,
                ));
            }
            None => {
                table.unavailable.insert("StowOutrigger".to_string(), "outrigger");
            }
        }

        for (name, height) in [
            ("SecondLevelClimb", heights.second_level_climb),
            ("ThirdLevelClimb", heights.third_level_climb),
        ] {
            match (handles.elevator, handles.drive, handles.outrigger) {
                (Some(elevator), Some(drive), Some(arm)) => {
                    let climb = climb_routine(name, ticks(height), elevator, drive, arm, &outrigger);
                    table.routines.insert(name.to_string(), climb);
                }
                (None, _, _) => {
                    table.unavailable.insert(name.to_string(), "elevator");
                }
                (_, None, _) => {
                    table.unavailable.insert(name.to_string(), "drive");
                }
                (_, _, None) => {
                    table.unavailable.insert(name.to_string(), "outrigger");
                }
            }
        }

        table
    }

    fn insert<R: robocycle_core::Routine + 'static>(&mut self, routine: R) {
        let handle = RoutineHandle::new(routine);
        self.routines.insert(handle.name().to_string(), handle);
    }

    /// Shared handle for `name`
    pub fn resolve(&self, name: &str) -> Result<RoutineHandle, SimError> {
        if let Some(handle) = self.routines.get(name) {
            return Ok(handle.clone());
        }
        match self.unavailable.get(name) {
            Some(&subsystem) => Err(SimError::SubsystemDisabled {
                routine: name.to_string(),
                subsystem,
            }),
            None => Err(SimError::UnknownRoutine(name.to_string())),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routines.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }
}

/// Climb onto a raised platform
///
/// Raise the carriage and swing the outrigger down together, creep forward
/// onto the platform, then bring both back.
fn climb_routine(
    name: &str,
    height: i32,
    elevator: SubsystemHandle<Elevator>,
    drive: SubsystemHandle<Drive>,
    arm: SubsystemHandle<Outrigger>,
    outrigger: &OutriggerConfig,
) -> RoutineHandle {
    let lift = ParallelRoutine::new(format!("{name}Lift"), Vec::new())
        .with(RoutineHandle::new(SetElevatorPositionRoutine::new(
            format!("{name}Raise"),
            elevator,
            height,
        )))
        .with(RoutineHandle::new(
            SetOutriggerAngleRoutine::new(
                format!("{name}Extend"),
                arm,
                outrigger.full_extended_angle / 2.0,
            )
            .with_wheel(0.5),
        ));

    let sequence = SequentialRoutine::new(name, Vec::new())
        .then(RoutineHandle::new(lift))
        .then(RoutineHandle::new(TimedDriveRoutine::new(
            format!("{name}Creep"),
            drive,
            0.25,
            750_000,
        )))
        .then(RoutineHandle::new(WaitRoutine::from_millis(format!("{name}Settle"), 200)))
        .then(RoutineHandle::new(SetElevatorPositionRoutine::new(
            format!("{name}Lower"),
            elevator,
            0,
        )))
        .then(RoutineHandle::new(SetOutriggerAngleRoutine::new(
            format!("{name}Stow"),
            arm,
            outrigger.stow_angle,
        )));

    RoutineHandle::new(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubsystemEnables;
    use crate::harness::Simulation;
    use robocycle_core::Diagnostics;

    fn table(enables: SubsystemEnables) -> RoutineTable {
        let config = SimConfig {
            subsystems: enables,
            ..SimConfig::default()
        };
        let sim = Simulation::lockstep(&config, &Diagnostics::silent()).unwrap();
        RoutineTable::standard(&config, sim.handles())
    }

    #[test]
    fn test_all_routines_with_every_subsystem() {
        let table = table(SubsystemEnables::default());
        for name in ["Wait", "ElevatorDown", "DriveForward", "SecondLevelClimb", "StowOutrigger"] {
            assert!(table.resolve(name).is_ok(), "{name} missing");
        }
    }

    #[test]
    fn test_resolve_shares_instance() {
        let table = table(SubsystemEnables::default());
        let a = table.resolve("RocketTopHatch").unwrap();
        let b = table.resolve("RocketTopHatch").unwrap();
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_disabled_subsystem_is_reported() {
        let table = table(SubsystemEnables {
            outrigger: false,
            ..SubsystemEnables::default()
        });

        assert!(table.resolve("ElevatorDown").is_ok());
        match table.resolve("ThirdLevelClimb") {
            Err(SimError::SubsystemDisabled { subsystem, .. }) => assert_eq!(subsystem, "outrigger"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_name() {
        let table = table(SubsystemEnables::default());
        assert!(matches!(table.resolve("Dance"), Err(SimError::UnknownRoutine(_))));
    }
}
