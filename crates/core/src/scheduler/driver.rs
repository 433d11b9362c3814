//! Cycle driver
//!
//! [`Robot`] owns the subsystems and the routine manager and runs one cycle
//! per [`Robot::cycle`] call, in a fixed order:
//!
//! 1. Overrun check against the previous cycle start
//! 2. Poll the [`IntentSource`]
//! 3. Cancel all routines if the intent asks for it
//! 4. Enqueue the intent's routines, advance the routine manager
//! 5. Run every subsystem pipeline in registration order
//! 6. Record cycle statistics
//!
//! The caller provides the fixed-rate tick (a timer interrupt, an async
//! interval, or a test loop).

use core::fmt;

use super::types::{saturate_us, CycleBudget, CycleStats};
use crate::diagnostics::Diagnostics;
use crate::intent::Intent;
use crate::routine::{RoutineContext, RoutineHandle, RoutineManager, RoutineManagerConfig};
use crate::subsystem::{Subsystem, SubsystemHandle, SubsystemRegistry};
use crate::traits::TimeSource;

/// Operating mode of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobotMode {
    #[default]
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl RobotMode {
    /// Whether cycles run in this mode
    pub fn is_controllable(self) -> bool {
        !matches!(self, RobotMode::Disabled)
    }

    pub fn name(self) -> &'static str {
        match self {
            RobotMode::Disabled => "Disabled",
            RobotMode::Autonomous => "Autonomous",
            RobotMode::Teleop => "Teleop",
            RobotMode::Test => "Test",
        }
    }
}

impl fmt::Display for RobotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Producer of the per-cycle intent (operator input, autonomous script)
pub trait IntentSource {
    /// Build the intent for the cycle starting at `now_us`
    fn next_intent(&mut self, now_us: u64) -> Intent;
}

impl<F> IntentSource for F
where
    F: FnMut(u64) -> Intent,
{
    fn next_intent(&mut self, now_us: u64) -> Intent {
        self(now_us)
    }
}

/// Cycle driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerConfig {
    pub budget: CycleBudget,
    pub routines: RoutineManagerConfig,
}

/// The cycle driver
pub struct Robot<T: TimeSource, S: IntentSource> {
    config: SchedulerConfig,
    time: T,
    intent_source: S,
    subsystems: SubsystemRegistry,
    routines: RoutineManager,
    mode: RobotMode,
    intent: Intent,
    last_cycle_us: Option<u64>,
    stats: CycleStats,
    diag: Diagnostics,
}

impl<T: TimeSource, S: IntentSource> Robot<T, S> {
    /// Create a disabled robot with no subsystems
    pub fn new(config: SchedulerConfig, time: T, intent_source: S, diag: &Diagnostics) -> Self {
        let diag = diag.scoped("Robot");
        crate::log_info!(
            diag,
            "Cycle period {} us, overrun above {} us",
            config.budget.period_us,
            config.budget.overrun_threshold_us()
        );
        Self {
            routines: RoutineManager::new(config.routines, &diag),
            config,
            time,
            intent_source,
            subsystems: SubsystemRegistry::new(),
            mode: RobotMode::Disabled,
            intent: Intent::default(),
            last_cycle_us: None,
            stats: CycleStats::default(),
            diag,
        }
    }

    /// Register a subsystem; pipelines run in registration order
    pub fn add_subsystem<U: Subsystem>(&mut self, subsystem: U) -> SubsystemHandle<U> {
        self.subsystems.add(subsystem)
    }

    pub fn subsystem<U: Subsystem>(&self, handle: SubsystemHandle<U>) -> Option<&U> {
        self.subsystems.get(handle)
    }

    pub fn subsystem_mut<U: Subsystem>(&mut self, handle: SubsystemHandle<U>) -> Option<&mut U> {
        self.subsystems.get_mut(handle)
    }

    pub fn subsystems(&self) -> &SubsystemRegistry {
        &self.subsystems
    }

    pub fn routines(&self) -> &RoutineManager {
        &self.routines
    }

    /// Queue a routine outside of the intent path
    pub fn enqueue(&mut self, routine: RoutineHandle) {
        self.routines.enqueue(routine);
    }

    pub fn mode(&self) -> RobotMode {
        self.mode
    }

    /// Intent of the last cycle
    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn time(&self) -> &T {
        &self.time
    }

    pub fn intent_source(&self) -> &S {
        &self.intent_source
    }

    pub fn intent_source_mut(&mut self) -> &mut S {
        &mut self.intent_source
    }

    /// Switch mode
    ///
    /// Entering Autonomous, Teleop or Test resets the robot. Disabled only
    /// stops cycling.
    pub fn enter_mode(&mut self, mode: RobotMode) {
        crate::log_info!(self.diag, "Mode: {} -> {}", self.mode, mode);
        self.mode = mode;
        if mode.is_controllable() {
            self.reset();
        }
    }

    /// Clear timing, intent, routines and every subsystem
    pub fn reset(&mut self) {
        self.last_cycle_us = None;
        self.intent = Intent::default();
        let now_us = self.time.now_us();
        let mut ctx = RoutineContext::new(&mut self.subsystems, now_us, &self.diag);
        self.routines.reset(&mut ctx);
        self.subsystems.reset_all();
    }

    /// Run one cycle
    ///
    /// Returns `false` without doing anything while disabled.
    pub fn cycle(&mut self) -> bool {
        if !self.mode.is_controllable() {
            return false;
        }

        let start_us = self.time.now_us();
        let period_us = self.last_cycle_us.map(|last| start_us.saturating_sub(last));
        if let Some(period_us) = period_us {
            if self.config.budget.is_overrun(period_us) {
                self.stats.record_overrun();
                crate::log_warn!(
                    self.diag,
                    "Cycle took {} us, more than {}% over the {} us period",
                    period_us,
                    self.config.budget.overrun_tolerance_percent,
                    self.config.budget.period_us
                );
            }
        }
        self.last_cycle_us = Some(start_us);

        self.intent = self.intent_source.next_intent(start_us);

        let mut ctx = RoutineContext::new(&mut self.subsystems, start_us, &self.diag);
        if self.intent.cancel_routines {
            self.routines.terminate_all(&mut ctx);
        }
        self.routines.enqueue_from_intent(&self.intent);
        self.routines.advance(&mut ctx);

        self.subsystems.pipeline_all(&self.intent);

        let execution_us = self.time.elapsed_since(start_us);
        self.stats.record(
            saturate_us(execution_us),
            period_us.map(saturate_us),
            &self.config.budget,
        );
        true
    }
}

impl<T: TimeSource, S: IntentSource> fmt::Debug for Robot<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Robot")
            .field("mode", &self.mode)
            .field("subsystems", &self.subsystems)
            .field("routines", &self.routines)
            .field("stats", &self.stats)
            .finish()
    }
}
