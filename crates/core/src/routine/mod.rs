//! Routine state machine
//!
//! A routine is a unit of autonomous work. Authors implement [`Routine`];
//! callers only ever touch the shared [`RoutineHandle`], which enforces the
//! state machine:
//!
//! ```text
//!            begin               check_finished + terminate
//!   Idle ───────────▶ Active ───────────────────────────────▶ Finished
//!    ▲                  │                                        │
//!    └──── abandon ─────┘◀──────────────── begin ────────────────┘
//! ```
//!
//! Handles are reference counted: an intent, the manager queue and a
//! composite may all hold the same routine. Re-entrant calls on a handle
//! (a routine reaching itself through a composite) are rejected as no-ops.

mod composite;
pub mod manager;

pub use composite::{ParallelRoutine, SequentialRoutine};
pub use manager::{CancelPolicy, RoutineManager, RoutineManagerConfig, RoutineStats};

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::diagnostics::Diagnostics;
use crate::subsystem::SubsystemRegistry;

/// Lifecycle state of a routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutineState {
    #[default]
    Idle,
    Active,
    Finished,
}

/// Everything a routine hook may touch during one call
pub struct RoutineContext<'a> {
    pub subsystems: &'a mut SubsystemRegistry,
    /// Start of the current cycle
    pub now_us: u64,
    pub diagnostics: &'a Diagnostics,
}

impl<'a> RoutineContext<'a> {
    pub fn new(
        subsystems: &'a mut SubsystemRegistry,
        now_us: u64,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Self {
            subsystems,
            now_us,
            diagnostics,
        }
    }
}

/// Author-facing routine hooks
///
/// A routine that drives one subsystem locks it in `begin` and unlocks it in
/// `terminate`.
pub trait Routine {
    fn name(&self) -> &str;

    fn begin(&mut self, _ctx: &mut RoutineContext<'_>) {}

    fn update(&mut self, _ctx: &mut RoutineContext<'_>) {}

    fn check_finished(&mut self, ctx: &mut RoutineContext<'_>) -> bool;

    /// Release whatever `begin` acquired
    fn terminate(&mut self, _ctx: &mut RoutineContext<'_>) {}

    /// Hard stop without cleanup. Composites forward this to their children.
    fn abandon(&mut self) {}
}

struct RoutineInner {
    name: Box<str>,
    state: Cell<RoutineState>,
    activations: Cell<u32>,
    body: RefCell<Box<dyn Routine>>,
}

/// Shared handle to a routine
#[derive(Clone)]
pub struct RoutineHandle {
    inner: Rc<RoutineInner>,
}

impl RoutineHandle {
    pub fn new<R: Routine + 'static>(routine: R) -> Self {
        Self {
            inner: Rc::new(RoutineInner {
                name: Box::from(routine.name()),
                state: Cell::new(RoutineState::Idle),
                activations: Cell::new(0),
                body: RefCell::new(Box::new(routine)),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> RoutineState {
        self.inner.state.get()
    }

    pub fn is_active(&self) -> bool {
        self.state() == RoutineState::Active
    }

    pub fn is_finished(&self) -> bool {
        self.state() == RoutineState::Finished
    }

    /// Number of times this routine has been begun
    pub fn activations(&self) -> u32 {
        self.inner.activations.get()
    }

    /// Whether both handles refer to the same routine
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Idle or Finished → Active
    ///
    /// Returns `false` if the routine is already active.
    pub fn begin(&self, ctx: &mut RoutineContext<'_>) -> bool {
        if self.is_active() {
            crate::log_debug!(ctx.diagnostics, "Routine {} already active", self.name());
            return false;
        }
        let Ok(mut body) = self.inner.body.try_borrow_mut() else {
            return false;
        };
        self.inner.state.set(RoutineState::Active);
        self.inner
            .activations
            .set(self.inner.activations.get().wrapping_add(1));
        body.begin(ctx);
        crate::log_debug!(ctx.diagnostics, "Routine {} begun", self.name());
        true
    }

    /// Incremental work, only while active
    pub fn update(&self, ctx: &mut RoutineContext<'_>) {
        if !self.is_active() {
            return;
        }
        if let Ok(mut body) = self.inner.body.try_borrow_mut() {
            body.update(ctx);
        }
    }

    /// Poll for completion
    ///
    /// Outside the Active state this reports whether the routine is Finished.
    pub fn check_finished(&self, ctx: &mut RoutineContext<'_>) -> bool {
        if !self.is_active() {
            return self.is_finished();
        }
        match self.inner.body.try_borrow_mut() {
            Ok(mut body) => body.check_finished(ctx),
            Err(_) => false,
        }
    }

    /// Active → Finished, running the cleanup hook once
    pub fn terminate(&self, ctx: &mut RoutineContext<'_>) -> bool {
        if !self.is_active() {
            return false;
        }
        let Ok(mut body) = self.inner.body.try_borrow_mut() else {
            return false;
        };
        body.terminate(ctx);
        self.inner.state.set(RoutineState::Finished);
        crate::log_debug!(ctx.diagnostics, "Routine {} terminated", self.name());
        true
    }

    /// Active → Idle without running the cleanup hook
    pub fn abandon(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        let Ok(mut body) = self.inner.body.try_borrow_mut() else {
            return false;
        };
        body.abandon();
        self.inner.state.set(RoutineState::Idle);
        true
    }
}

impl fmt::Debug for RoutineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutineHandle")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Routine finishing after a fixed number of updates, counting every hook
    pub(crate) struct Countdown {
        name: &'static str,
        remaining: u32,
        updates_needed: u32,
        pub(crate) log: Rc<RefCell<alloc::vec::Vec<alloc::string::String>>>,
    }

    impl Countdown {
        pub(crate) fn new(
            name: &'static str,
            updates_needed: u32,
            log: &Rc<RefCell<alloc::vec::Vec<alloc::string::String>>>,
        ) -> Self {
            Self {
                name,
                remaining: updates_needed,
                updates_needed,
                log: Rc::clone(log),
            }
        }

        fn record(&self, event: &str) {
            self.log
                .borrow_mut()
                .push(alloc::format!("{}:{}", self.name, event));
        }
    }

    impl Routine for Countdown {
        fn name(&self) -> &str {
            self.name
        }

        fn begin(&mut self, _ctx: &mut RoutineContext<'_>) {
            self.remaining = self.updates_needed;
            self.record("begin");
        }

        fn update(&mut self, _ctx: &mut RoutineContext<'_>) {
            self.remaining = self.remaining.saturating_sub(1);
            self.record("update");
        }

        fn check_finished(&mut self, _ctx: &mut RoutineContext<'_>) -> bool {
            self.remaining == 0
        }

        fn terminate(&mut self, _ctx: &mut RoutineContext<'_>) {
            self.record("terminate");
        }

        fn abandon(&mut self) {
            self.record("abandon");
        }
    }

    pub(crate) fn event_log() -> Rc<RefCell<alloc::vec::Vec<alloc::string::String>>> {
        Rc::new(RefCell::new(alloc::vec::Vec::new()))
    }

    #[test]
    fn test_state_machine() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let routine = RoutineHandle::new(Countdown::new("A", 1, &log));

        assert_eq!(routine.state(), RoutineState::Idle);
        assert!(!routine.check_finished(&mut ctx));
        assert!(!routine.terminate(&mut ctx));

        assert!(routine.begin(&mut ctx));
        assert!(!routine.begin(&mut ctx));
        assert!(!routine.check_finished(&mut ctx));

        routine.update(&mut ctx);
        assert!(routine.check_finished(&mut ctx));
        assert!(routine.terminate(&mut ctx));
        assert!(!routine.terminate(&mut ctx));
        assert!(routine.is_finished());
        assert!(routine.check_finished(&mut ctx));

        assert_eq!(*log.borrow(), ["A:begin", "A:update", "A:terminate"]);
    }

    #[test]
    fn test_update_ignored_unless_active() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let routine = RoutineHandle::new(Countdown::new("A", 1, &log));

        routine.update(&mut ctx);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_finished_routine_can_begin_again() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let routine = RoutineHandle::new(Countdown::new("A", 1, &log));

        routine.begin(&mut ctx);
        routine.update(&mut ctx);
        routine.terminate(&mut ctx);

        assert!(routine.begin(&mut ctx));
        assert!(routine.is_active());
        assert_eq!(routine.activations(), 2);
    }

    #[test]
    fn test_abandon_skips_terminate() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let routine = RoutineHandle::new(Countdown::new("A", 3, &log));

        routine.begin(&mut ctx);
        assert!(routine.abandon());
        assert!(!routine.abandon());

        assert_eq!(routine.state(), RoutineState::Idle);
        assert_eq!(*log.borrow(), ["A:begin", "A:abandon"]);
    }
}
