//! Subsystem pipeline and lock arbitration
//!
//! A subsystem is an independently lockable unit of actuation. Each cycle the
//! driver calls [`Subsystem::pipeline`], which runs the hooks in a fixed order:
//!
//! 1. Unlock if locked and [`Subsystem::should_unlock`] agrees
//! 2. Advance the sequence counter (wraps to 0 after `sequence_max`)
//! 3. [`Subsystem::spaced_update`] every `spaced_interval` cycles
//! 4. [`Subsystem::update`] unconditionally
//! 5. [`Subsystem::update_locked`] or [`Subsystem::update_unlocked`]
//! 6. Remember the intent as `last_intent`
//!
//! `locked` is a cooperative arbitration flag between the manual path and the
//! active routine. It only changes through [`Subsystem::lock`] and
//! [`Subsystem::unlock`], each of which runs its hook once per transition.

mod registry;

pub use registry::{SubsystemHandle, SubsystemId, SubsystemRegistry};

use core::any::Any;
use core::fmt;

use crate::diagnostics::{Diagnostics, Level};
use crate::intent::Intent;

/// Default number of cycles between spaced updates
pub const SPACED_UPDATE_INTERVAL: u64 = 5;

/// Default number of cycles between sampled log lines
pub const DEFAULT_SAMPLE_INTERVAL: u64 = 10;

/// Per-subsystem timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsystemConfig {
    /// Cycles between spaced updates (0 disables them)
    pub spaced_interval: u64,
    /// Largest sequence value before wrapping back to 0
    pub sequence_max: u64,
    /// Cycles between [`SubsystemCore::log_sample`] lines (0 disables them)
    pub sample_interval: u64,
    /// Write demands to the actuator bridge. When `false` the subsystem
    /// computes outputs but never sends them.
    pub should_output: bool,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        Self {
            spaced_interval: SPACED_UPDATE_INTERVAL,
            sequence_max: u64::MAX,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            should_output: true,
        }
    }
}

/// State shared by every subsystem
pub struct SubsystemCore {
    name: &'static str,
    locked: bool,
    sequence: u64,
    last_intent: Intent,
    config: SubsystemConfig,
    diag: Diagnostics,
}

impl SubsystemCore {
    /// Create an unlocked core with sequence 0
    pub fn new(name: &'static str, config: SubsystemConfig, diag: &Diagnostics) -> Self {
        let diag = diag.scoped(name);
        crate::log_info!(diag, "Subsystem initialized");
        Self {
            name,
            locked: false,
            sequence: 0,
            last_intent: Intent::default(),
            config,
            diag,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Intent seen by the previous pipeline run, for edge detection
    pub fn last_intent(&self) -> &Intent {
        &self.last_intent
    }

    pub fn config(&self) -> &SubsystemConfig {
        &self.config
    }

    pub fn should_output(&self) -> bool {
        self.config.should_output
    }

    /// Diagnostics handle scoped to this subsystem
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    /// Log through the scoped handle
    pub fn log(&self, level: Level, message: fmt::Arguments<'_>) {
        self.diag.log(level, message);
    }

    /// Log only on every `sample_interval`-th cycle
    pub fn log_sample(&self, level: Level, message: fmt::Arguments<'_>) {
        self.log_sample_every(self.config.sample_interval, level, message);
    }

    /// Log only on cycles where the sequence is a multiple of `every`
    pub fn log_sample_every(&self, every: u64, level: Level, message: fmt::Arguments<'_>) {
        if every != 0 && self.sequence % every == 0 {
            self.diag.log(level, message);
        }
    }

    fn advance_sequence(&mut self) {
        if self.sequence < self.config.sequence_max {
            self.sequence += 1;
        } else {
            self.sequence = 0;
        }
    }

    fn spaced_due(&self) -> bool {
        self.sequence
            .checked_rem(self.config.spaced_interval)
            .is_some_and(|r| r == 0)
    }

    fn clear(&mut self) {
        self.locked = false;
        self.sequence = 0;
        self.last_intent = Intent::default();
    }
}

impl fmt::Debug for SubsystemCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsystemCore")
            .field("name", &self.name)
            .field("locked", &self.locked)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Hooks of one subsystem
///
/// Implementors provide [`core`](Subsystem::core)/[`core_mut`](Subsystem::core_mut)
/// and override the hooks they need. The provided `pipeline`, `lock`,
/// `unlock` and `reset` methods implement the fixed cycle contract.
pub trait Subsystem: Any {
    fn core(&self) -> &SubsystemCore;

    fn core_mut(&mut self) -> &mut SubsystemCore;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Whether the manual path may take control back from a routine
    fn should_unlock(&self, _intent: &Intent) -> bool {
        true
    }

    fn on_lock(&mut self) {}

    fn on_unlock(&mut self) {}

    /// Throttled hook for low-rate work (telemetry, diagnostics)
    fn spaced_update(&mut self, _intent: &Intent) {}

    /// Per-cycle physical state refresh, independent of lock state
    fn update(&mut self) {}

    /// Autonomous path: the active routine owns the subsystem
    fn update_locked(&mut self) {}

    /// Manual path
    fn update_unlocked(&mut self, _intent: &Intent) {}

    /// Subsystem-specific part of [`reset`](Subsystem::reset)
    fn on_reset(&mut self) {}

    fn name(&self) -> &'static str {
        self.core().name()
    }

    fn is_locked(&self) -> bool {
        self.core().is_locked()
    }

    /// Hand the subsystem to autonomous control
    ///
    /// Returns `false` without calling `on_lock` if already locked.
    fn lock(&mut self) -> bool {
        if self.core().is_locked() {
            return false;
        }
        self.on_lock();
        self.core_mut().locked = true;
        crate::log_info!(self.core().diagnostics(), "Locked");
        true
    }

    /// Return the subsystem to manual control
    ///
    /// Returns `false` without calling `on_unlock` if already unlocked.
    fn unlock(&mut self) -> bool {
        if !self.core().is_locked() {
            return false;
        }
        self.on_unlock();
        self.core_mut().locked = false;
        crate::log_info!(self.core().diagnostics(), "Unlocked");
        true
    }

    /// Run one cycle
    fn pipeline(&mut self, intent: &Intent) {
        if self.is_locked() && self.should_unlock(intent) {
            self.unlock();
        }
        self.core_mut().advance_sequence();
        if self.core().spaced_due() {
            self.spaced_update(intent);
        }
        self.update();
        if self.is_locked() {
            self.update_locked();
        } else {
            self.update_unlocked(intent);
        }
        self.core_mut().last_intent = intent.clone();
    }

    /// Mode transition reset: unlocked, sequence 0, last intent cleared
    ///
    /// The lock flag is cleared directly; `on_unlock` does not run.
    fn reset(&mut self) {
        self.core_mut().clear();
        self.on_reset();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::math;
    use alloc::vec::Vec;

    /// Subsystem recording every hook invocation
    pub(crate) struct Probe {
        core: SubsystemCore,
        pub events: Vec<&'static str>,
        pub deadzone: Option<f64>,
        pub locks: u32,
        pub unlocks: u32,
        pub spaced: u32,
        pub resets: u32,
    }

    impl Probe {
        pub(crate) fn new(config: SubsystemConfig) -> Self {
            Self {
                core: SubsystemCore::new("Probe", config, &Diagnostics::silent()),
                events: Vec::new(),
                deadzone: None,
                locks: 0,
                unlocks: 0,
                spaced: 0,
                resets: 0,
            }
        }

        pub(crate) fn with_deadzone(deadzone: f64) -> Self {
            let mut probe = Self::new(SubsystemConfig::default());
            probe.deadzone = Some(deadzone);
            probe
        }
    }

    impl Subsystem for Probe {
        fn core(&self) -> &SubsystemCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut SubsystemCore {
            &mut self.core
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn should_unlock(&self, intent: &Intent) -> bool {
            match self.deadzone {
                Some(deadzone) => math::exceeds(intent.elevator_input, deadzone),
                None => true,
            }
        }

        fn on_lock(&mut self) {
            self.locks += 1;
        }

        fn on_unlock(&mut self) {
            self.unlocks += 1;
            self.events.push("unlock");
        }

        fn spaced_update(&mut self, _intent: &Intent) {
            self.spaced += 1;
            self.events.push("spaced");
        }

        fn update(&mut self) {
            self.events.push("update");
        }

        fn update_locked(&mut self) {
            self.events.push("locked");
        }

        fn update_unlocked(&mut self, _intent: &Intent) {
            self.events.push("unlocked");
        }

        fn on_reset(&mut self) {
            self.resets += 1;
        }
    }

    #[test]
    fn test_lock_twice_fires_hook_once() {
        let mut probe = Probe::new(SubsystemConfig::default());

        assert!(probe.lock());
        assert!(!probe.lock());
        assert_eq!(probe.locks, 1);
        assert!(probe.is_locked());

        assert!(probe.unlock());
        assert!(!probe.unlock());
        assert_eq!(probe.unlocks, 1);
        assert!(!probe.is_locked());
    }

    #[test]
    fn test_pipeline_order_unlocked() {
        let mut probe = Probe::new(SubsystemConfig::default());
        probe.pipeline(&Intent::default());

        assert_eq!(probe.core().sequence(), 1);
        assert_eq!(probe.events, ["update", "unlocked"]);
    }

    #[test]
    fn test_pipeline_default_policy_unlocks_before_update() {
        let mut probe = Probe::new(SubsystemConfig::default());
        probe.lock();
        probe.pipeline(&Intent::default());

        assert!(!probe.is_locked());
        assert_eq!(probe.events, ["unlock", "update", "unlocked"]);
    }

    #[test]
    fn test_pipeline_deadzone_keeps_lock() {
        let mut probe = Probe::with_deadzone(0.1);
        probe.lock();

        let mut intent = Intent::default();
        intent.elevator_input = 0.05;
        probe.pipeline(&intent);
        assert!(probe.is_locked());
        assert_eq!(probe.events, ["update", "locked"]);

        intent.elevator_input = -0.4;
        probe.pipeline(&intent);
        assert!(!probe.is_locked());
        assert_eq!(probe.unlocks, 1);
    }

    #[test]
    fn test_spaced_update_every_interval() {
        let mut probe = Probe::new(SubsystemConfig::default());
        for _ in 0..12 {
            probe.pipeline(&Intent::default());
        }
        // Sequences 5 and 10
        assert_eq!(probe.spaced, 2);
    }

    #[test]
    fn test_spaced_interval_zero_disables() {
        let mut probe = Probe::new(SubsystemConfig {
            spaced_interval: 0,
            ..SubsystemConfig::default()
        });
        for _ in 0..10 {
            probe.pipeline(&Intent::default());
        }
        assert_eq!(probe.spaced, 0);
    }

    #[test]
    fn test_sequence_wraps_to_zero() {
        let mut probe = Probe::new(SubsystemConfig {
            sequence_max: 3,
            ..SubsystemConfig::default()
        });
        let sequences: Vec<u64> = (0..6)
            .map(|_| {
                probe.pipeline(&Intent::default());
                probe.core().sequence()
            })
            .collect();
        assert_eq!(sequences, [1, 2, 3, 0, 1, 2]);
    }

    #[test]
    fn test_sequence_wraps_at_u64_max() {
        let mut probe = Probe::new(SubsystemConfig::default());
        probe.core_mut().sequence = u64::MAX;
        probe.pipeline(&Intent::default());
        assert_eq!(probe.core().sequence(), 0);
    }

    #[test]
    fn test_last_intent_stored() {
        let mut probe = Probe::new(SubsystemConfig::default());
        let mut intent = Intent::default();
        intent.drive_forward = 0.7;
        probe.pipeline(&intent);
        assert_eq!(probe.core().last_intent().drive_forward, 0.7);
    }

    #[test]
    fn test_reset_clears_state_without_unlock_hook() {
        let mut probe = Probe::new(SubsystemConfig::default());
        let mut intent = Intent::default();
        intent.drive_turn = 0.3;
        probe.pipeline(&intent);
        probe.lock();

        probe.reset();

        assert!(!probe.is_locked());
        assert_eq!(probe.unlocks, 0);
        assert_eq!(probe.resets, 1);
        assert_eq!(probe.core().sequence(), 0);
        assert_eq!(probe.core().last_intent().drive_turn, 0.0);
    }
}
