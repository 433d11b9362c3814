use alloc::string::String;

use crate::routine::{Routine, RoutineContext};
use crate::subsystem::SubsystemHandle;
use crate::subsystems::Outrigger;

/// Swings the outrigger to an angle, optionally spinning its wheel
pub struct SetOutriggerAngleRoutine {
    name: String,
    outrigger: SubsystemHandle<Outrigger>,
    angle: f64,
    wheel_output: f64,
}

impl SetOutriggerAngleRoutine {
    pub fn new(name: impl Into<String>, outrigger: SubsystemHandle<Outrigger>, angle: f64) -> Self {
        Self {
            name: name.into(),
            outrigger,
            angle,
            wheel_output: 0.0,
        }
    }

    pub fn with_wheel(mut self, output: f64) -> Self {
        self.wheel_output = output;
        self
    }
}

impl Routine for SetOutriggerAngleRoutine {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&mut self, ctx: &mut RoutineContext<'_>) {
        ctx.subsystems.lock(self.outrigger);
        if let Some(outrigger) = ctx.subsystems.get_mut(self.outrigger) {
            outrigger.set_wanted_angle(self.angle);
            outrigger.set_wheel_output(self.wheel_output);
        }
    }

    fn check_finished(&mut self, ctx: &mut RoutineContext<'_>) -> bool {
        ctx.subsystems
            .get(self.outrigger)
            .map_or(true, |o| o.within_angle(self.angle))
    }

    fn terminate(&mut self, ctx: &mut RoutineContext<'_>) {
        if let Some(outrigger) = ctx.subsystems.get_mut(self.outrigger) {
            outrigger.set_wheel_output(0.0);
        }
        ctx.subsystems.unlock(self.outrigger);
    }
}
