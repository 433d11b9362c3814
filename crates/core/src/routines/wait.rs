use alloc::string::String;

use crate::routine::{Routine, RoutineContext};

/// Finishes after a fixed duration
#[derive(Debug, Clone)]
pub struct WaitRoutine {
    name: String,
    duration_us: u64,
    start_us: u64,
}

impl WaitRoutine {
    pub fn new(name: impl Into<String>, duration_us: u64) -> Self {
        Self {
            name: name.into(),
            duration_us,
            start_us: 0,
        }
    }

    pub fn from_millis(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(name, duration_ms.saturating_mul(1_000))
    }
}

impl Routine for WaitRoutine {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&mut self, ctx: &mut RoutineContext<'_>) {
        self.start_us = ctx.now_us;
    }

    fn check_finished(&mut self, ctx: &mut RoutineContext<'_>) -> bool {
        ctx.now_us.saturating_sub(self.start_us) >= self.duration_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::routine::RoutineHandle;
    use crate::subsystem::SubsystemRegistry;

    #[test]
    fn test_wait_measures_from_begin() {
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let wait = RoutineHandle::new(WaitRoutine::from_millis("Wait", 500));

        wait.begin(&mut RoutineContext::new(&mut registry, 1_000_000, &diag));
        assert!(!wait.check_finished(&mut RoutineContext::new(&mut registry, 1_499_999, &diag)));
        assert!(wait.check_finished(&mut RoutineContext::new(&mut registry, 1_500_000, &diag)));
    }
}
