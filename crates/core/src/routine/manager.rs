//! Single active routine with a FIFO queue

use alloc::collections::VecDeque;

use super::{RoutineContext, RoutineHandle};
use crate::diagnostics::Diagnostics;
use crate::intent::Intent;

/// What happens to the active routine on [`RoutineManager::terminate_all`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Drop it without running `terminate`. Subsystems it locked stay locked
    /// until their own unlock policy releases them.
    #[default]
    Abandon,
    /// Run `terminate` so the routine releases its subsystems
    Terminate,
}

/// Routine manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutineManagerConfig {
    pub cancel_policy: CancelPolicy,
    /// Begin the next queued routine in the cycle the previous one finished
    /// instead of the following cycle
    pub same_cycle_handoff: bool,
}

/// Bookkeeping counters, cleared on reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutineStats {
    pub begun: u32,
    pub finished: u32,
    pub cancelled: u32,
}

/// Runs at most one routine at a time
#[derive(Debug)]
pub struct RoutineManager {
    active: Option<RoutineHandle>,
    queue: VecDeque<RoutineHandle>,
    config: RoutineManagerConfig,
    stats: RoutineStats,
    diag: Diagnostics,
}

impl RoutineManager {
    pub fn new(config: RoutineManagerConfig, diag: &Diagnostics) -> Self {
        Self {
            active: None,
            queue: VecDeque::new(),
            config,
            stats: RoutineStats::default(),
            diag: diag.scoped("RoutineManager"),
        }
    }

    pub fn active(&self) -> Option<&RoutineHandle> {
        self.active.as_ref()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|r| r.name())
    }

    /// Number of queued routines, excluding the active one
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }

    pub fn stats(&self) -> RoutineStats {
        self.stats
    }

    pub fn config(&self) -> &RoutineManagerConfig {
        &self.config
    }

    /// Append to the back of the queue. Duplicates are allowed.
    pub fn enqueue(&mut self, routine: RoutineHandle) {
        crate::log_debug!(self.diag, "Queued {}", routine.name());
        self.queue.push_back(routine);
    }

    /// Enqueue every routine the intent requests, in order
    pub fn enqueue_from_intent(&mut self, intent: &Intent) {
        for routine in &intent.routines {
            self.enqueue(routine.clone());
        }
    }

    /// One cycle of routine work
    ///
    /// A routine begun here is first updated on the next call.
    pub fn advance(&mut self, ctx: &mut RoutineContext<'_>) {
        let had_active = self.active.is_some();

        if let Some(active) = self.active.as_ref() {
            active.update(ctx);
            if active.check_finished(ctx) {
                active.terminate(ctx);
                crate::log_info!(self.diag, "Finished {}", active.name());
                self.stats.finished = self.stats.finished.wrapping_add(1);
                self.active = None;
            }
        }

        if had_active && !self.config.same_cycle_handoff {
            return;
        }

        if self.active.is_none() {
            if let Some(next) = self.queue.pop_front() {
                if !next.begin(ctx) {
                    crate::log_debug!(self.diag, "Dropped {}, could not begin", next.name());
                    return;
                }
                crate::log_info!(self.diag, "Began {}", next.name());
                self.stats.begun = self.stats.begun.wrapping_add(1);
                self.active = Some(next);
            }
        }
    }

    /// Drop the active routine and every queued one
    pub fn terminate_all(&mut self, ctx: &mut RoutineContext<'_>) {
        if let Some(active) = self.active.take() {
            match self.config.cancel_policy {
                CancelPolicy::Abandon => {
                    active.abandon();
                }
                CancelPolicy::Terminate => {
                    active.terminate(ctx);
                }
            }
            crate::log_info!(self.diag, "Cancelled {}", active.name());
            self.stats.cancelled = self.stats.cancelled.wrapping_add(1);
        }
        let dropped = self.queue.len();
        self.queue.clear();
        if dropped > 0 {
            crate::log_debug!(self.diag, "Dropped {} queued routines", dropped);
        }
    }

    /// Mode transition reset
    pub fn reset(&mut self, ctx: &mut RoutineContext<'_>) {
        self.terminate_all(ctx);
        self.stats = RoutineStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::tests::{event_log, Countdown};
    use crate::routine::RoutineState;
    use crate::subsystem::SubsystemRegistry;
    use alloc::vec::Vec;

    fn manager(config: RoutineManagerConfig) -> RoutineManager {
        RoutineManager::new(config, &Diagnostics::silent())
    }

    #[test]
    fn test_fifo_handoff_on_next_cycle() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let mut manager = manager(RoutineManagerConfig::default());
        let a = RoutineHandle::new(Countdown::new("A", 1, &log));
        let b = RoutineHandle::new(Countdown::new("B", 1, &log));
        manager.enqueue(a.clone());
        manager.enqueue(b.clone());

        // Cycle 1: A begins, no update
        manager.advance(&mut ctx);
        assert_eq!(manager.active_name(), Some("A"));
        assert_eq!(manager.pending(), 1);

        // Cycle 2: A updates and finishes, B waits
        manager.advance(&mut ctx);
        assert!(a.is_finished());
        assert_eq!(b.state(), RoutineState::Idle);
        assert!(manager.active().is_none());

        // Cycle 3: B begins
        manager.advance(&mut ctx);
        assert!(b.is_active());

        assert_eq!(
            *log.borrow(),
            ["A:begin", "A:update", "A:terminate", "B:begin"]
        );
    }

    #[test]
    fn test_same_cycle_handoff() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let mut manager = manager(RoutineManagerConfig {
            same_cycle_handoff: true,
            ..RoutineManagerConfig::default()
        });
        let a = RoutineHandle::new(Countdown::new("A", 1, &log));
        let b = RoutineHandle::new(Countdown::new("B", 1, &log));
        manager.enqueue(a.clone());
        manager.enqueue(b.clone());

        manager.advance(&mut ctx);
        manager.advance(&mut ctx);

        assert!(a.is_finished());
        assert!(b.is_active());
        // Terminate of the outgoing routine is observed before the next begins
        assert_eq!(
            *log.borrow(),
            ["A:begin", "A:update", "A:terminate", "B:begin"]
        );
    }

    #[test]
    fn test_at_most_one_active() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let mut manager = manager(RoutineManagerConfig::default());
        let routines: Vec<RoutineHandle> = ["A", "B", "C", "D"]
            .into_iter()
            .zip([2, 1, 3, 1])
            .map(|(name, updates)| RoutineHandle::new(Countdown::new(name, updates, &log)))
            .collect();

        for (cycle, routine) in (0..20).zip(routines.iter().cycle()) {
            if cycle % 3 == 0 {
                manager.enqueue(routine.clone());
            }
            manager.advance(&mut ctx);
            let active = routines.iter().filter(|r| r.is_active()).count();
            assert!(active <= 1, "cycle {cycle}: {active} active");
        }
    }

    #[test]
    fn test_duplicate_enqueue_runs_twice() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let mut manager = manager(RoutineManagerConfig::default());
        let a = RoutineHandle::new(Countdown::new("A", 1, &log));
        manager.enqueue(a.clone());
        manager.enqueue(a.clone());

        for _ in 0..4 {
            manager.advance(&mut ctx);
        }

        assert_eq!(a.activations(), 2);
        assert_eq!(manager.stats().finished, 2);
        assert!(manager.is_idle());
    }

    #[test]
    fn test_routine_already_active_elsewhere_is_dropped() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let mut manager = manager(RoutineManagerConfig::default());
        let a = RoutineHandle::new(Countdown::new("A", 3, &log));
        let b = RoutineHandle::new(Countdown::new("B", 1, &log));
        assert!(a.begin(&mut ctx));

        manager.enqueue(a.clone());
        manager.enqueue(b.clone());
        manager.advance(&mut ctx);

        assert!(manager.active().is_none());
        assert_eq!(manager.stats().begun, 0);
        assert_eq!(manager.pending(), 1);
        assert_eq!(a.activations(), 1);

        manager.advance(&mut ctx);
        assert_eq!(manager.active_name(), Some("B"));
        assert_eq!(manager.stats().begun, 1);
    }

    #[test]
    fn test_terminate_all_abandons_active() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let mut manager = manager(RoutineManagerConfig::default());
        let a = RoutineHandle::new(Countdown::new("A", 5, &log));
        let b = RoutineHandle::new(Countdown::new("B", 1, &log));
        manager.enqueue(a.clone());
        manager.enqueue(b.clone());
        manager.advance(&mut ctx);

        manager.terminate_all(&mut ctx);

        assert!(manager.is_idle());
        assert_eq!(manager.pending(), 0);
        assert_eq!(a.state(), RoutineState::Idle);
        assert!(log.borrow().iter().all(|e| e != "A:terminate"));
        assert_eq!(manager.stats().cancelled, 1);
    }

    #[test]
    fn test_terminate_policy_runs_cleanup() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let mut manager = manager(RoutineManagerConfig {
            cancel_policy: CancelPolicy::Terminate,
            ..RoutineManagerConfig::default()
        });
        let a = RoutineHandle::new(Countdown::new("A", 5, &log));
        manager.enqueue(a.clone());
        manager.advance(&mut ctx);

        manager.terminate_all(&mut ctx);

        assert!(a.is_finished());
        assert_eq!(*log.borrow(), ["A:begin", "A:terminate"]);
    }

    #[test]
    fn test_reset_clears_stats() {
        let log = event_log();
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        let mut manager = manager(RoutineManagerConfig::default());
        manager.enqueue(RoutineHandle::new(Countdown::new("A", 5, &log)));
        manager.advance(&mut ctx);
        assert_eq!(manager.stats().begun, 1);

        manager.reset(&mut ctx);

        assert_eq!(manager.stats(), RoutineStats::default());
        assert!(manager.is_idle());
    }

    #[test]
    fn test_enqueue_from_intent_keeps_order() {
        let log = event_log();
        let mut manager = manager(RoutineManagerConfig::default());
        let mut intent = Intent::new();
        intent.push_routine(RoutineHandle::new(Countdown::new("First", 1, &log)));
        intent.push_routine(RoutineHandle::new(Countdown::new("Second", 1, &log)));

        manager.enqueue_from_intent(&intent);

        assert_eq!(manager.pending(), 2);
        let mut registry = SubsystemRegistry::new();
        let diag = Diagnostics::silent();
        let mut ctx = RoutineContext::new(&mut registry, 0, &diag);
        manager.advance(&mut ctx);
        assert_eq!(manager.active_name(), Some("First"));
    }
}
