//! Outrigger subsystem: a pivoting climbing arm with a driven wheel

use alloc::boxed::Box;
use alloc::vec;

use super::ActuatorError;
use crate::controller::{ControlStrategy, ControllerSet, Directive};
use crate::diagnostics::{Diagnostics, Level};
use crate::intent::Intent;
use crate::math;
use crate::subsystem::{Subsystem, SubsystemConfig, SubsystemCore};

/// Outrigger arm and wheel motor controllers
pub trait OutriggerActuator {
    /// Arm encoder position in rotations
    fn position(&self) -> f64;

    /// Overwrite the encoder position
    fn reset_position(&mut self, position: f64);

    fn set_arm_output(&mut self, output: f64) -> Result<(), ActuatorError>;

    /// Closed-loop move to `set_point` rotations with a feed-forward voltage
    fn set_arm_reference(&mut self, set_point: f64, feed_forward: f64) -> Result<(), ActuatorError>;

    fn set_wheel_output(&mut self, output: f64) -> Result<(), ActuatorError>;
}

/// Outrigger geometry and gains
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutriggerConfig {
    pub input_threshold: f64,
    /// Encoder position when stowed
    pub lower: f64,
    /// Encoder position when fully extended
    pub upper: f64,
    /// Arm angle in degrees when stowed
    pub stow_angle: f64,
    pub full_extended_angle: f64,
    /// Holding output at horizontal, scaled by the cosine of the angle
    pub angle_feed_forward: f64,
    pub voltage_compensation: f64,
    /// Tolerance for [`Outrigger::within_angle`], degrees
    pub within_angle: f64,
    pub raw_output_limit: f64,
    /// Rotations added to the set point per cycle at full input
    pub set_point_increment: f64,
    pub wheel_output_scale: f64,
}

impl Default for OutriggerConfig {
    fn default() -> Self {
        Self {
            input_threshold: math::DEFAULT_INPUT_THRESHOLD,
            lower: 0.0,
            upper: 46.0,
            stow_angle: 0.0,
            full_extended_angle: 180.0,
            angle_feed_forward: 0.03,
            voltage_compensation: 12.0,
            within_angle: 2.0,
            raw_output_limit: 0.5,
            set_point_increment: 0.5,
            wheel_output_scale: 0.1,
        }
    }
}

/// Sensed arm state plus the actuator bridge
pub struct OutriggerPlant {
    actuator: Box<dyn OutriggerActuator>,
    config: OutriggerConfig,
    position: f64,
    angle: f64,
    should_output: bool,
    diag: Diagnostics,
}

impl OutriggerPlant {
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Arm angle in degrees
    pub fn angle(&self) -> f64 {
        self.angle
    }

    fn angle_to_position(&self, angle: f64) -> f64 {
        let c = &self.config;
        math::map(angle, c.stow_angle, c.full_extended_angle, c.lower, c.upper)
    }

    fn refresh(&mut self) {
        let c = self.config;
        self.position = self.actuator.position();
        self.angle = math::map(self.position, c.lower, c.upper, c.stow_angle, c.full_extended_angle);
    }

    fn report(&self, result: Result<(), ActuatorError>) {
        if let Err(e) = result {
            crate::log_error!(self.diag, "Actuator error: {}", e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutriggerControllerId {
    Raw,
    SetPoint,
}

/// Outrigger arm strategies
#[derive(Debug, Clone, PartialEq)]
pub enum OutriggerController {
    Raw { output: f64 },
    SetPoint { set_point: f64 },
}

impl ControlStrategy for OutriggerController {
    type Id = OutriggerControllerId;
    type Plant = OutriggerPlant;

    fn id(&self) -> OutriggerControllerId {
        match self {
            OutriggerController::Raw { .. } => OutriggerControllerId::Raw,
            OutriggerController::SetPoint { .. } => OutriggerControllerId::SetPoint,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            OutriggerController::Raw { .. } => "Raw",
            OutriggerController::SetPoint { .. } => "Set Point",
        }
    }

    fn process_intent(&mut self, intent: &Intent, plant: &OutriggerPlant) {
        let c = &plant.config;
        match self {
            OutriggerController::Raw { output } => {
                *output = math::clamp(intent.outrigger, -c.raw_output_limit, c.raw_output_limit);
            }
            OutriggerController::SetPoint { set_point } => {
                *set_point += intent.outrigger * c.set_point_increment;
            }
        }
    }

    fn control(&mut self, plant: &mut OutriggerPlant) -> Directive<OutriggerControllerId> {
        if !plant.should_output {
            return Directive::Hold;
        }
        let result = match self {
            OutriggerController::Raw { output } => plant.actuator.set_arm_output(*output),
            OutriggerController::SetPoint { set_point } => {
                let c = plant.config;
                let feed_forward = math::cos(math::to_radians(plant.angle)) * c.angle_feed_forward;
                plant
                    .actuator
                    .set_arm_reference(*set_point, feed_forward * c.voltage_compensation)
            }
        };
        plant.report(result);
        Directive::Hold
    }

    fn reset(&mut self) {
        match self {
            OutriggerController::Raw { output } => *output = 0.0,
            OutriggerController::SetPoint { set_point } => *set_point = 0.0,
        }
    }
}

/// Outrigger subsystem
pub struct Outrigger {
    core: SubsystemCore,
    plant: OutriggerPlant,
    controllers: ControllerSet<OutriggerController>,
    wheel_output: f64,
}

impl Outrigger {
    pub fn new<A: OutriggerActuator + 'static>(
        actuator: A,
        config: OutriggerConfig,
        subsystem: SubsystemConfig,
        diag: &Diagnostics,
    ) -> Self {
        let core = SubsystemCore::new("Outrigger", subsystem, diag);
        let diag = core.diagnostics().clone();
        let mut outrigger = Self {
            plant: OutriggerPlant {
                actuator: Box::new(actuator),
                config,
                position: config.lower,
                angle: config.stow_angle,
                should_output: subsystem.should_output,
                diag: diag.clone(),
            },
            controllers: ControllerSet::new(
                vec![
                    OutriggerController::Raw { output: 0.0 },
                    OutriggerController::SetPoint { set_point: 0.0 },
                ],
                diag,
            ),
            wheel_output: 0.0,
            core,
        };
        outrigger.stop_motors();
        outrigger
    }

    pub fn set_controller(&mut self, id: Option<OutriggerControllerId>) -> bool {
        self.controllers.select(id)
    }

    pub fn controller(&self) -> Option<OutriggerControllerId> {
        self.controllers.active_id()
    }

    pub fn set_raw_output(&mut self, value: f64) {
        self.set_controller(Some(OutriggerControllerId::Raw));
        if let Some(OutriggerController::Raw { output }) =
            self.controllers.get_mut(OutriggerControllerId::Raw)
        {
            *output = value;
        }
    }

    /// Switch to SetPoint and move to `angle` degrees
    pub fn set_wanted_angle(&mut self, angle: f64) {
        self.set_controller(Some(OutriggerControllerId::SetPoint));
        let position = self.plant.angle_to_position(angle);
        if let Some(OutriggerController::SetPoint { set_point }) =
            self.controllers.get_mut(OutriggerControllerId::SetPoint)
        {
            *set_point = position;
        }
    }

    pub fn set_wheel_output(&mut self, output: f64) {
        self.wheel_output = output;
    }

    pub fn wheel_output(&self) -> f64 {
        self.wheel_output
    }

    pub fn angle(&self) -> f64 {
        self.plant.angle
    }

    pub fn within_angle(&self, angle: f64) -> bool {
        math::within_range(self.plant.angle, angle, self.plant.config.within_angle)
    }

    fn stop_motors(&mut self) {
        self.wheel_output = 0.0;
        if !self.plant.should_output {
            return;
        }
        let arm = self.plant.actuator.set_arm_output(0.0);
        self.plant.report(arm);
        let wheel = self.plant.actuator.set_wheel_output(0.0);
        self.plant.report(wheel);
    }
}

impl Subsystem for Outrigger {
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
        let threshold = self.plant.config.input_threshold;
        math::exceeds(intent.outrigger, threshold) || math::exceeds(intent.outrigger_wheel, threshold)
    }

    fn update(&mut self) {
        self.plant.refresh();
        if !self.controllers.control(&mut self.plant) {
            self.core
                .log_sample(Level::Warn, format_args!("No controller detected"));
        }
        if self.plant.should_output {
            let result = self.plant.actuator.set_wheel_output(self.wheel_output);
            self.plant.report(result);
        }
    }

    /// Falls back to Raw when nothing is selected
    fn update_unlocked(&mut self, intent: &Intent) {
        if self.controllers.active_id().is_none() {
            self.set_controller(Some(OutriggerControllerId::Raw));
        }
        self.controllers.process_intent(intent, &self.plant);
        self.wheel_output = intent.outrigger_wheel * self.plant.config.wheel_output_scale;
    }

    fn on_reset(&mut self) {
        self.controllers.select(None);
        self.controllers.reset_all();
        let lower = self.plant.config.lower;
        self.plant.actuator.reset_position(lower);
        self.plant.refresh();
        self.stop_motors();
    }
}
