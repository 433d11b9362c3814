//! Intent snapshot
//!
//! One [`Intent`] is produced per cycle by an
//! [`IntentSource`](crate::scheduler::IntentSource) and read by the routine
//! manager and every subsystem pipeline. It is replaced wholesale on the next
//! cycle, never merged.

use heapless::Vec;

use crate::routine::RoutineHandle;

/// Maximum routines one intent may request in a single cycle.
pub const MAX_INTENT_ROUTINES: usize = 8;

/// Operator/autonomous requested state for all subsystems
#[derive(Debug, Clone, Default)]
pub struct Intent {
    /// Drive forward axis [-1, 1]
    pub drive_forward: f64,
    /// Drive turn axis [-1, 1]
    pub drive_turn: f64,
    /// Elevator manual axis [-1, 1]
    pub elevator_input: f64,
    /// Outrigger arm axis [-1, 1]
    pub outrigger: f64,
    /// Outrigger wheel axis [-1, 1]
    pub outrigger_wheel: f64,

    /// Fine drive control with reduced gain
    pub drive_precision: bool,
    /// Request the elevator to descend under the soft-land controller
    pub elevator_soft_land: bool,
    /// Drop the active routine and every queued routine before enqueueing
    pub cancel_routines: bool,

    /// Routines to enqueue this cycle, in order
    pub routines: Vec<RoutineHandle, MAX_INTENT_ROUTINES>,
}

impl Intent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a routine. Returns `false` (routine dropped) when the
    /// per-cycle list is full.
    pub fn push_routine(&mut self, routine: RoutineHandle) -> bool {
        self.routines.push(routine).is_ok()
    }

    /// Whether any routine was requested this cycle
    pub fn has_routines(&self) -> bool {
        !self.routines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::WaitRoutine;

    #[test]
    fn test_default_is_neutral() {
        let intent = Intent::default();
        assert_eq!(intent.drive_forward, 0.0);
        assert_eq!(intent.elevator_input, 0.0);
        assert!(!intent.cancel_routines);
        assert!(!intent.has_routines());
    }

    #[test]
    fn test_push_routine_respects_capacity() {
        let mut intent = Intent::new();
        let wait = RoutineHandle::new(WaitRoutine::new("Wait", 1_000));

        for _ in 0..MAX_INTENT_ROUTINES {
            assert!(intent.push_routine(wait.clone()));
        }
        assert!(!intent.push_routine(wait.clone()));
        assert_eq!(intent.routines.len(), MAX_INTENT_ROUTINES);
    }

    #[test]
    fn test_clone_shares_routine_handles() {
        let mut intent = Intent::new();
        let wait = RoutineHandle::new(WaitRoutine::new("Wait", 1_000));
        intent.push_routine(wait.clone());

        let copy = intent.clone();
        assert!(copy.routines[0].ptr_eq(&wait));
    }
}
