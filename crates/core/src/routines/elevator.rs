use alloc::string::String;

use crate::routine::{Routine, RoutineContext};
use crate::subsystem::SubsystemHandle;
use crate::subsystems::Elevator;

/// Moves the elevator to an encoder position under set-point control
pub struct SetElevatorPositionRoutine {
    name: String,
    elevator: SubsystemHandle<Elevator>,
    position: i32,
}

impl SetElevatorPositionRoutine {
    pub fn new(name: impl Into<String>, elevator: SubsystemHandle<Elevator>, position: i32) -> Self {
        Self {
            name: name.into(),
            elevator,
            position,
        }
    }

    pub fn position(&self) -> i32 {
        self.position
    }
}

impl Routine for SetElevatorPositionRoutine {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&mut self, ctx: &mut RoutineContext<'_>) {
        ctx.subsystems.lock(self.elevator);
        if let Some(elevator) = ctx.subsystems.get_mut(self.elevator) {
            elevator.set_wanted_set_point(self.position);
        }
    }

    fn check_finished(&mut self, ctx: &mut RoutineContext<'_>) -> bool {
        match ctx.subsystems.get(self.elevator) {
            Some(elevator) => elevator.within_position(self.position),
            None => true,
        }
    }

    fn terminate(&mut self, ctx: &mut RoutineContext<'_>) {
        ctx.subsystems.unlock(self.elevator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::routine::RoutineHandle;
    use crate::subsystem::{Subsystem, SubsystemConfig, SubsystemRegistry};
    use crate::subsystems::elevator::tests::MockElevator;
    use crate::subsystems::{ElevatorConfig, ElevatorControllerId};

    #[test]
    fn test_finishes_within_tolerance() {
        let diag = Diagnostics::silent();
        let mut registry = SubsystemRegistry::new();
        let mock = MockElevator::default();
        let elevator = registry.add(Elevator::new(
            mock.clone(),
            ElevatorConfig::default(),
            SubsystemConfig::default(),
            &diag,
        ));
        let routine = RoutineHandle::new(SetElevatorPositionRoutine::new("Climb", elevator, 20_000));

        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        routine.begin(&mut ctx);
        assert!(!routine.check_finished(&mut ctx));

        let state = registry.get(elevator).unwrap();
        assert!(state.is_locked());
        assert_eq!(state.controller(), Some(ElevatorControllerId::SetPoint));

        mock.set_position(19_500);
        if let Some(elevator) = registry.get_mut(elevator) {
            elevator.update();
        }
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        assert!(routine.check_finished(&mut ctx));
        routine.terminate(&mut ctx);
        assert!(!registry.is_locked(elevator));
    }
}
