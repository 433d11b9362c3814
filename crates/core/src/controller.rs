//! Pluggable controller strategies
//!
//! A controllable subsystem pre-builds every control algorithm it supports and
//! keeps them in a [`ControllerSet`]. Exactly one (or none) is active at a time.
//!
//! # Lifecycle
//!
//! 1. `select(Some(id))` - `on_disable()` on the outgoing strategy, then
//!    `on_enable()` on the incoming one. Selecting the active id is a no-op.
//! 2. `process_intent()` - manual path, called only while unlocked
//! 3. `control()` - every cycle regardless of lock state; may return
//!    [`Directive::Switch`] to hand over to another strategy
//! 4. `reset()` - on subsystem reset
//!
//! The strategy never mutates the active selection itself. A requested
//! transition is applied by the set after `control()` has returned.

use alloc::vec::Vec;
use core::fmt;

use crate::diagnostics::Diagnostics;
use crate::intent::Intent;

/// Transition request returned from [`ControlStrategy::control`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<Id> {
    /// Stay on the current strategy
    Hold,
    /// Hand control to another strategy after this cycle's output
    Switch(Id),
}

/// One control algorithm of a subsystem
///
/// `Plant` is the subsystem's sensed state plus its actuator bridge. The
/// strategy receives it by reference instead of holding a back-pointer to the
/// owning subsystem.
pub trait ControlStrategy {
    /// Identifier of the strategy within its set
    type Id: Copy + PartialEq + fmt::Debug;
    /// Sensor state and actuator bridge the strategy acts on
    type Plant;

    fn id(&self) -> Self::Id;

    /// Name for logging and telemetry
    fn name(&self) -> &'static str;

    /// Called once when this strategy becomes active
    fn on_enable(&mut self) {}

    /// Called once when this strategy stops being active
    fn on_disable(&mut self) {}

    /// Derive set points from the manual path
    fn process_intent(&mut self, _intent: &Intent, _plant: &Self::Plant) {}

    /// Apply the last computed output to the actuator
    fn control(&mut self, plant: &mut Self::Plant) -> Directive<Self::Id>;

    /// Clear internal set point/accumulator state
    fn reset(&mut self) {}
}

/// All strategies of one subsystem and the active selection
pub struct ControllerSet<C: ControlStrategy> {
    strategies: Vec<C>,
    active: Option<usize>,
    transitions: u32,
    diag: Diagnostics,
}

impl<C: ControlStrategy> ControllerSet<C> {
    /// Create a set with nothing active
    pub fn new(strategies: Vec<C>, diag: Diagnostics) -> Self {
        Self {
            strategies,
            active: None,
            transitions: 0,
            diag,
        }
    }

    /// Id of the active strategy
    pub fn active_id(&self) -> Option<C::Id> {
        self.active
            .and_then(|i| self.strategies.get(i))
            .map(|s| s.id())
    }

    /// Name of the active strategy, `"None"` when nothing is selected
    pub fn active_name(&self) -> &'static str {
        self.active
            .and_then(|i| self.strategies.get(i))
            .map_or("None", |s| s.name())
    }

    /// Whether `id` is the active strategy
    pub fn is_active(&self, id: C::Id) -> bool {
        self.active_id() == Some(id)
    }

    /// Number of selection changes since construction
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    pub fn get(&self, id: C::Id) -> Option<&C> {
        self.strategies.iter().find(|s| s.id() == id)
    }

    pub fn get_mut(&mut self, id: C::Id) -> Option<&mut C> {
        self.strategies.iter_mut().find(|s| s.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.strategies.iter()
    }

    /// Change the active strategy
    ///
    /// Returns `true` only if the selection changed. Unknown ids are
    /// rejected with a warning and leave the selection untouched.
    pub fn select(&mut self, candidate: Option<C::Id>) -> bool {
        let index = match candidate {
            None => None,
            Some(id) => match self.strategies.iter().position(|s| s.id() == id) {
                Some(index) => Some(index),
                None => {
                    crate::log_warn!(self.diag, "Unknown controller {:?}", id);
                    return false;
                }
            },
        };

        if index == self.active {
            return false;
        }

        let from = self.active_name();
        if let Some(old) = self.active.and_then(|i| self.strategies.get_mut(i)) {
            old.on_disable();
        }
        self.active = index;
        if let Some(new) = index.and_then(|i| self.strategies.get_mut(i)) {
            new.on_enable();
        }
        self.transitions = self.transitions.wrapping_add(1);

        crate::log_debug!(self.diag, "Controller: {} -> {}", from, self.active_name());
        true
    }

    /// Feed the manual path to the active strategy
    pub fn process_intent(&mut self, intent: &Intent, plant: &C::Plant) {
        if let Some(active) = self.active.and_then(|i| self.strategies.get_mut(i)) {
            active.process_intent(intent, plant);
        }
    }

    /// Run the active strategy and apply its transition request
    ///
    /// Returns `false` when no strategy is active.
    pub fn control(&mut self, plant: &mut C::Plant) -> bool {
        let directive = match self.active.and_then(|i| self.strategies.get_mut(i)) {
            Some(active) => active.control(plant),
            None => return false,
        };

        if let Directive::Switch(next) = directive {
            self.select(Some(next));
        }
        true
    }

    /// Reset every strategy, active or not
    pub fn reset_all(&mut self) {
        for strategy in self.strategies.iter_mut() {
            strategy.reset();
        }
    }
}
