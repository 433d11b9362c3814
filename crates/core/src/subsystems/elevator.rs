//! Elevator subsystem
//!
//! A closed-loop lift with four interchangeable control strategies:
//!
//! | Strategy | Manual path                              | Output                         |
//! |----------|------------------------------------------|--------------------------------|
//! | Raw      | deadzoned input × `raw_output_scale`     | percent output                 |
//! | SetPoint | set point += input × `set_point_increment` | motion profile to set point  |
//! | Velocity | input × `cruise_velocity`                | closed-loop velocity           |
//! | SoftLand | none                                     | gentle descent by position band |
//!
//! SetPoint and Velocity hand over to SoftLand when the lift reaches its
//! upper limit or when the bridge reports a sensor/hardware fault.

use alloc::boxed::Box;
use alloc::vec::Vec;

use bitflags::bitflags;

use super::ActuatorError;
use crate::controller::{ControlStrategy, ControllerSet, Directive};
use crate::diagnostics::{Diagnostics, Level};
use crate::intent::Intent;
use crate::math;
use crate::subsystem::{Subsystem, SubsystemConfig, SubsystemCore};

bitflags! {
    /// Sticky faults latched by the motor controller
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ElevatorFaults: u16 {
        const UNDER_VOLTAGE = 1 << 0;
        const FORWARD_LIMIT_SWITCH = 1 << 1;
        /// Bottom switch, hit on every normal landing
        const REVERSE_LIMIT_SWITCH = 1 << 2;
        const FORWARD_SOFT_LIMIT = 1 << 3;
        const REVERSE_SOFT_LIMIT = 1 << 4;
        const RESET_DURING_ENABLE = 1 << 5;
        const SENSOR_OVERFLOW = 1 << 6;
        const SENSOR_OUT_OF_PHASE = 1 << 7;
        const HARDWARE_ESD_RESET = 1 << 8;
        const REMOTE_LOSS_OF_SIGNAL = 1 << 9;
    }
}

impl ElevatorFaults {
    /// Faults that make the encoder reading untrustworthy
    pub const SENSOR_OR_HARDWARE: Self = Self::SENSOR_OVERFLOW
        .union(Self::SENSOR_OUT_OF_PHASE)
        .union(Self::HARDWARE_ESD_RESET)
        .union(Self::REMOTE_LOSS_OF_SIGNAL);

    /// Faults worth reporting (everything but the reverse limit switch)
    pub fn reportable(self) -> Self {
        self.difference(Self::REVERSE_LIMIT_SWITCH)
    }
}

/// Demand written to the elevator motor controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElevatorDemand {
    /// Open-loop output in [-1, 1]
    PercentOutput(f64),
    /// Motion-profiled move to an encoder position with arbitrary feed-forward
    MotionProfile { position: i32, feed_forward: f64 },
    /// Closed-loop velocity (ticks per 100 ms) with arbitrary feed-forward
    Velocity { velocity: f64, feed_forward: f64 },
}

/// Elevator motor controller bridge
pub trait ElevatorActuator {
    /// Encoder position in ticks
    fn position(&self) -> i32;

    /// Encoder velocity in ticks per 100 ms
    fn velocity(&self) -> i32;

    fn output_current(&self) -> f64 {
        0.0
    }

    fn output_percent(&self) -> f64 {
        0.0
    }

    /// Read and clear the sticky faults
    fn take_sticky_faults(&mut self) -> ElevatorFaults;

    fn set(&mut self, demand: ElevatorDemand) -> Result<(), ActuatorError>;
}

/// Elevator tuning and limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevatorConfig {
    /// Lowest set point in ticks
    pub min_position: i32,
    /// Upper soft limit in ticks
    pub max_position: i32,
    pub input_threshold: f64,
    pub raw_output_scale: f64,
    /// Ticks added to the set point per cycle at full input
    pub set_point_increment: f64,
    /// Velocity at full input, ticks per 100 ms
    pub cruise_velocity: f64,
    /// Arbitrary feed-forward holding the carriage against gravity
    pub feed_forward: f64,
    pub soft_land_weak_position: i32,
    pub soft_land_weak_output: f64,
    pub soft_land_strong_position: i32,
    pub soft_land_strong_output: f64,
    /// Tolerance for [`Elevator::within_position`]
    pub within_set_point: i32,
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        Self {
            min_position: 0,
            max_position: 50_000,
            input_threshold: math::DEFAULT_INPUT_THRESHOLD,
            raw_output_scale: 0.2,
            set_point_increment: 5_000.0,
            cruise_velocity: 6_000.0,
            feed_forward: 0.07,
            soft_land_weak_position: 20_000,
            soft_land_weak_output: -0.05,
            soft_land_strong_position: 5_000,
            soft_land_strong_output: -0.15,
            within_set_point: 1_000,
        }
    }
}

/// What the strategies act on: sensed state plus the actuator bridge
pub struct ElevatorPlant {
    actuator: Box<dyn ElevatorActuator>,
    config: ElevatorConfig,
    position: i32,
    velocity: i32,
    should_output: bool,
    last_demand: Option<ElevatorDemand>,
    diag: Diagnostics,
}

impl ElevatorPlant {
    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn velocity(&self) -> i32 {
        self.velocity
    }

    pub fn config(&self) -> &ElevatorConfig {
        &self.config
    }

    /// Last demand handed to the bridge
    pub fn last_demand(&self) -> Option<ElevatorDemand> {
        self.last_demand
    }

    /// Send a demand to the bridge (unless output is disabled)
    pub fn drive(&mut self, demand: ElevatorDemand) {
        self.last_demand = Some(demand);
        if !self.should_output {
            return;
        }
        if let Err(e) = self.actuator.set(demand) {
            crate::log_error!(self.diag, "Actuator error: {}", e);
        }
    }

    fn refresh(&mut self) {
        self.position = self.actuator.position();
        self.velocity = self.actuator.velocity();
    }
}

/// Identifier of an elevator strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevatorControllerId {
    Raw,
    SetPoint,
    Velocity,
    SoftLand,
}

/// Elevator control strategies
#[derive(Debug, Clone, PartialEq)]
pub enum ElevatorController {
    Raw { input: f64, output: f64 },
    SetPoint { wanted: i32 },
    Velocity { input: f64, wanted_velocity: f64 },
    SoftLand,
}

impl ElevatorController {
    /// One of each strategy, in id order
    pub fn all() -> [Self; 4] {
        [
            ElevatorController::Raw {
                input: 0.0,
                output: 0.0,
            },
            ElevatorController::SetPoint { wanted: 0 },
            ElevatorController::Velocity {
                input: 0.0,
                wanted_velocity: 0.0,
            },
            ElevatorController::SoftLand,
        ]
    }

    /// Wanted set point, if this is the SetPoint strategy
    pub fn wanted_set_point(&self) -> Option<i32> {
        match self {
            ElevatorController::SetPoint { wanted } => Some(*wanted),
            _ => None,
        }
    }

    /// Stay below the upper limit or hand over to SoftLand
    fn guard_limit(plant: &ElevatorPlant) -> Option<Directive<ElevatorControllerId>> {
        if plant.position < plant.config.max_position {
            return None;
        }
        crate::log_error!(plant.diag, "Too high");
        Some(Directive::Switch(ElevatorControllerId::SoftLand))
    }
}

impl ControlStrategy for ElevatorController {
    type Id = ElevatorControllerId;
    type Plant = ElevatorPlant;

    fn id(&self) -> ElevatorControllerId {
        match self {
            ElevatorController::Raw { .. } => ElevatorControllerId::Raw,
            ElevatorController::SetPoint { .. } => ElevatorControllerId::SetPoint,
            ElevatorController::Velocity { .. } => ElevatorControllerId::Velocity,
            ElevatorController::SoftLand => ElevatorControllerId::SoftLand,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ElevatorController::Raw { .. } => "Raw",
            ElevatorController::SetPoint { .. } => "Set Point",
            ElevatorController::Velocity { .. } => "Velocity",
            ElevatorController::SoftLand => "Soft Land",
        }
    }

    fn process_intent(&mut self, intent: &Intent, plant: &ElevatorPlant) {
        let config = &plant.config;
        let input = math::threshold(intent.elevator_input, config.input_threshold);
        match self {
            ElevatorController::Raw {
                input: last,
                output,
            } => {
                *last = input;
                *output = input * config.raw_output_scale;
            }
            ElevatorController::SetPoint { wanted } => {
                *wanted = wanted.saturating_add((input * config.set_point_increment) as i32);
            }
            ElevatorController::Velocity {
                input: last,
                wanted_velocity,
            } => {
                *last = input;
                *wanted_velocity = input * config.cruise_velocity;
            }
            ElevatorController::SoftLand => {}
        }
    }

    fn control(&mut self, plant: &mut ElevatorPlant) -> Directive<ElevatorControllerId> {
        match self {
            ElevatorController::Raw { input, output } => {
                crate::log_trace!(plant.diag, "Input: {:.3}, Output: {:.3}", input, output);
                plant.drive(ElevatorDemand::PercentOutput(*output));
            }
            ElevatorController::SetPoint { wanted } => {
                *wanted = math::clamp_i32(
                    *wanted,
                    plant.config.min_position,
                    plant.config.max_position,
                );
                if let Some(redirect) = Self::guard_limit(plant) {
                    return redirect;
                }
                crate::log_trace!(
                    plant.diag,
                    "Wanted set point: {}, Feed forward: {:.3}",
                    wanted,
                    plant.config.feed_forward
                );
                let feed_forward = plant.config.feed_forward;
                plant.drive(ElevatorDemand::MotionProfile {
                    position: *wanted,
                    feed_forward,
                });
            }
            ElevatorController::Velocity {
                wanted_velocity, ..
            } => {
                if let Some(redirect) = Self::guard_limit(plant) {
                    return redirect;
                }
                crate::log_trace!(plant.diag, "Wanted velocity: {:.1}", wanted_velocity);
                let feed_forward = plant.config.feed_forward;
                plant.drive(ElevatorDemand::Velocity {
                    velocity: *wanted_velocity,
                    feed_forward,
                });
            }
            ElevatorController::SoftLand => {
                let config = plant.config;
                let output = if plant.position > config.soft_land_weak_position {
                    config.soft_land_weak_output
                } else if plant.position > config.soft_land_strong_position {
                    config.soft_land_strong_output
                } else {
                    0.0
                };
                plant.drive(ElevatorDemand::PercentOutput(output));
            }
        }
        Directive::Hold
    }

    fn reset(&mut self) {
        match self {
            ElevatorController::Raw { input, output } => {
                *input = 0.0;
                *output = 0.0;
            }
            ElevatorController::SetPoint { wanted } => *wanted = 0,
            ElevatorController::Velocity {
                input,
                wanted_velocity,
            } => {
                *input = 0.0;
                *wanted_velocity = 0.0;
            }
            ElevatorController::SoftLand => {}
        }
    }
}

/// Elevator subsystem
pub struct Elevator {
    core: SubsystemCore,
    plant: ElevatorPlant,
    controllers: ControllerSet<ElevatorController>,
    last_faults: ElevatorFaults,
}

impl Elevator {
    pub fn new<A: ElevatorActuator + 'static>(
        actuator: A,
        config: ElevatorConfig,
        subsystem: SubsystemConfig,
        diag: &Diagnostics,
    ) -> Self {
        let core = SubsystemCore::new("Elevator", subsystem, diag);
        let diag = core.diagnostics().clone();
        Self {
            plant: ElevatorPlant {
                actuator: Box::new(actuator),
                config,
                position: 0,
                velocity: 0,
                should_output: subsystem.should_output,
                last_demand: None,
                diag: diag.clone(),
            },
            controllers: ControllerSet::new(Vec::from(ElevatorController::all()), diag),
            last_faults: ElevatorFaults::empty(),
            core,
        }
    }

    /// Select a strategy, `None` to stop controlling
    ///
    /// Returns `true` only if the selection changed.
    pub fn set_controller(&mut self, id: Option<ElevatorControllerId>) -> bool {
        self.controllers.select(id)
    }

    pub fn controller(&self) -> Option<ElevatorControllerId> {
        self.controllers.active_id()
    }

    pub fn controller_name(&self) -> &'static str {
        self.controllers.active_name()
    }

    pub fn controllers(&self) -> &ControllerSet<ElevatorController> {
        &self.controllers
    }

    /// Switch to Raw with a fixed output
    pub fn set_raw_output(&mut self, value: f64) {
        self.set_controller(Some(ElevatorControllerId::Raw));
        if let Some(ElevatorController::Raw { output, .. }) =
            self.controllers.get_mut(ElevatorControllerId::Raw)
        {
            *output = value;
        }
    }

    /// Switch to SetPoint and track `position` ticks
    pub fn set_wanted_set_point(&mut self, position: i32) {
        self.set_controller(Some(ElevatorControllerId::SetPoint));
        if let Some(ElevatorController::SetPoint { wanted }) =
            self.controllers.get_mut(ElevatorControllerId::SetPoint)
        {
            *wanted = position;
        }
    }

    /// Hand the manual axis back to velocity control
    pub fn set_manual(&mut self) {
        self.set_controller(Some(ElevatorControllerId::Velocity));
    }

    pub fn soft_land(&mut self) {
        self.set_controller(Some(ElevatorControllerId::SoftLand));
    }

    pub fn position(&self) -> i32 {
        self.plant.position
    }

    pub fn velocity(&self) -> i32 {
        self.plant.velocity
    }

    pub fn plant(&self) -> &ElevatorPlant {
        &self.plant
    }

    pub fn config(&self) -> &ElevatorConfig {
        &self.plant.config
    }

    /// Faults read during the last update
    pub fn last_faults(&self) -> ElevatorFaults {
        self.last_faults
    }

    pub fn within_position(&self, target: i32) -> bool {
        let error = i64::from(self.plant.position) - i64::from(target);
        error.abs() <= i64::from(self.plant.config.within_set_point)
    }

    fn check_faults(&mut self) {
        let faults = self.plant.actuator.take_sticky_faults();
        self.last_faults = faults;
        if faults.is_empty() {
            return;
        }
        if !faults.reportable().is_empty() {
            crate::log_error!(self.core.diagnostics(), "Sticky faults: {:?}", faults.reportable());
        }
        let closed_loop = matches!(
            self.controllers.active_id(),
            Some(ElevatorControllerId::SetPoint | ElevatorControllerId::Velocity)
        );
        if closed_loop && faults.intersects(ElevatorFaults::SENSOR_OR_HARDWARE) {
            crate::log_warn!(self.core.diagnostics(), "Closed loop unsafe, soft landing");
            self.soft_land();
        }
    }
}

impl Subsystem for Elevator {
    fn core(&self) -> &SubsystemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubsystemCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
        self
    }

    fn should_unlock(&self, intent: &Intent) -> bool {
        math::exceeds(intent.elevator_input, self.plant.config.input_threshold)
    }

    fn spaced_update(&mut self, _intent: &Intent) {
        crate::log_debug!(
            self.core.diagnostics(),
            "Output: {:.3}, Current: {:.2}, Encoder Position: {}, Encoder Velocity: {}",
            self.plant.actuator.output_percent(),
            self.plant.actuator.output_current(),
            self.plant.position,
            self.plant.velocity
        );
    }

    fn update(&mut self) {
        self.check_faults();
        self.plant.refresh();
        if !self.controllers.control(&mut self.plant) {
            self.core
                .log_sample(Level::Warn, format_args!("No controller detected"));
        }
    }

    /// SoftLand, once entered, holds until reset
    fn update_unlocked(&mut self, intent: &Intent) {
        if intent.elevator_soft_land {
            self.soft_land();
        } else if !self.controllers.is_active(ElevatorControllerId::SoftLand) {
            self.set_manual();
        }
        self.controllers.process_intent(intent, &self.plant);
    }

    fn on_reset(&mut self) {
        self.plant.drive(ElevatorDemand::PercentOutput(0.0));
        self.controllers.select(None);
        self.controllers.reset_all();
        self.last_faults = ElevatorFaults::empty();
    }
}
