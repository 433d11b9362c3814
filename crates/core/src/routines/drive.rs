use alloc::string::String;

use crate::routine::{Routine, RoutineContext};
use crate::subsystem::SubsystemHandle;
use crate::subsystems::Drive;

/// Drives with fixed outputs for a duration
pub struct TimedDriveRoutine {
    name: String,
    drive: SubsystemHandle<Drive>,
    left: f64,
    right: f64,
    duration_us: u64,
    start_us: u64,
}

impl TimedDriveRoutine {
    pub fn new(
        name: impl Into<String>,
        drive: SubsystemHandle<Drive>,
        output: f64,
        duration_us: u64,
    ) -> Self {
        Self::with_sides(name, drive, output, output, duration_us)
    }

    pub fn with_sides(
        name: impl Into<String>,
        drive: SubsystemHandle<Drive>,
        left: f64,
        right: f64,
        duration_us: u64,
    ) -> Self {
        Self {
            name: name.into(),
            drive,
            left,
            right,
            duration_us,
            start_us: 0,
        }
    }
}

impl Routine for TimedDriveRoutine {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&mut self, ctx: &mut RoutineContext<'_>) {
        self.start_us = ctx.now_us;
        ctx.subsystems.lock(self.drive);
    }

    fn update(&mut self, ctx: &mut RoutineContext<'_>) {
        if let Some(drive) = ctx.subsystems.get_mut(self.drive) {
            drive.set_drive_output(self.left, self.right);
        }
    }

    fn check_finished(&mut self, ctx: &mut RoutineContext<'_>) -> bool {
        ctx.now_us.saturating_sub(self.start_us) >= self.duration_us
    }

    fn terminate(&mut self, ctx: &mut RoutineContext<'_>) {
        if let Some(drive) = ctx.subsystems.get_mut(self.drive) {
            drive.set_drive_output(0.0, 0.0);
        }
        ctx.subsystems.unlock(self.drive);
    }
}
