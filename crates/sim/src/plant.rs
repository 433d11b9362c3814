//! Simulated actuators
//!
//! Each mechanism is a small kinematic model behind an `Rc<RefCell<_>>`. The
//! bridge handed to the subsystem and the handle kept by the harness share
//! it: the subsystem writes demands through the bridge, the harness advances
//! the physics once per cycle with [`SimPlant::step`].

use std::cell::RefCell;
use std::rc::Rc;

use robocycle_core::subsystems::{
    ActuatorError, DriveActuator, ElevatorActuator, ElevatorDemand, ElevatorFaults,
    OutriggerActuator,
};

/// Elevator travel at full open-loop output, ticks per second
pub const ELEVATOR_FREE_SPEED: f64 = 60_000.0;
/// Drive wheel rotations per second at full output
pub const DRIVE_FREE_SPEED: f64 = 10.0;
/// Outrigger arm rotations per second at full output
pub const OUTRIGGER_FREE_SPEED: f64 = 40.0;

#[derive(Debug, Clone, Default)]
pub struct ElevatorModel {
    pub position: f64,
    /// Ticks per second
    pub velocity: f64,
    pub demand: Option<ElevatorDemand>,
    pub faults: ElevatorFaults,
    /// Carriage cannot travel past this, ticks
    pub hard_max: f64,
    /// Demands accepted since construction
    pub writes: u64,
    /// Next write fails with this error
    pub fail_next: Option<ActuatorError>,
}

impl ElevatorModel {
    pub fn new(hard_max: f64) -> Self {
        Self {
            hard_max,
            ..Self::default()
        }
    }

    fn step(&mut self, dt_s: f64) {
        let speed = match self.demand {
            None => 0.0,
            Some(ElevatorDemand::PercentOutput(output)) => output.clamp(-1.0, 1.0) * ELEVATOR_FREE_SPEED,
            Some(ElevatorDemand::Velocity { velocity, .. }) => velocity * 10.0,
            Some(ElevatorDemand::MotionProfile { position, .. }) => {
                if dt_s > 0.0 {
                    let max_step = ELEVATOR_FREE_SPEED * dt_s;
                    (f64::from(position) - self.position).clamp(-max_step, max_step) / dt_s
                } else {
                    0.0
                }
            }
        };

        self.position += speed * dt_s;
        self.velocity = speed;

        if self.position <= 0.0 {
            self.position = 0.0;
            if speed < 0.0 {
                self.faults |= ElevatorFaults::REVERSE_LIMIT_SWITCH;
                self.velocity = 0.0;
            }
        } else if self.position >= self.hard_max {
            self.position = self.hard_max;
            if speed > 0.0 {
                self.faults |= ElevatorFaults::FORWARD_LIMIT_SWITCH;
                self.velocity = 0.0;
            }
        }
    }
}

/// Elevator bridge over a shared [`ElevatorModel`]
#[derive(Debug, Clone)]
pub struct SimElevator(pub Rc<RefCell<ElevatorModel>>);

impl ElevatorActuator for SimElevator {
    fn position(&self) -> i32 {
        self.0.borrow().position.round() as i32
    }

    fn velocity(&self) -> i32 {
        (self.0.borrow().velocity / 10.0).round() as i32
    }

    fn output_percent(&self) -> f64 {
        match self.0.borrow().demand {
            Some(ElevatorDemand::PercentOutput(output)) => output,
            Some(ElevatorDemand::MotionProfile { feed_forward, .. })
            | Some(ElevatorDemand::Velocity { feed_forward, .. }) => feed_forward,
            None => 0.0,
        }
    }

    fn take_sticky_faults(&mut self) -> ElevatorFaults {
        std::mem::take(&mut self.0.borrow_mut().faults)
    }

    fn set(&mut self, demand: ElevatorDemand) -> Result<(), ActuatorError> {
        let mut model = self.0.borrow_mut();
        if let Some(err) = model.fail_next.take() {
            return Err(err);
        }
        model.demand = Some(demand);
        model.writes += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DriveModel {
    pub left_output: f64,
    pub right_output: f64,
    /// Wheel rotations
    pub left_position: f64,
    pub right_position: f64,
    /// Degrees, positive turning right
    pub heading: f64,
}

impl DriveModel {
    /// Heading change per rotation of difference between the sides
    const DEGREES_PER_ROTATION: f64 = 12.0;

    fn step(&mut self, dt_s: f64) {
        let left = self.left_output.clamp(-1.0, 1.0) * DRIVE_FREE_SPEED * dt_s;
        let right = self.right_output.clamp(-1.0, 1.0) * DRIVE_FREE_SPEED * dt_s;
        self.left_position += left;
        self.right_position += right;
        self.heading += (left - right) * Self::DEGREES_PER_ROTATION;
    }
}

#[derive(Debug, Clone)]
pub struct SimDrive(pub Rc<RefCell<DriveModel>>);

impl DriveActuator for SimDrive {
    fn set_output(&mut self, left: f64, right: f64) -> Result<(), ActuatorError> {
        let mut model = self.0.borrow_mut();
        model.left_output = left;
        model.right_output = right;
        Ok(())
    }

    fn left_position(&self) -> f64 {
        self.0.borrow().left_position
    }

    fn right_position(&self) -> f64 {
        self.0.borrow().right_position
    }

    fn heading(&self) -> f64 {
        self.0.borrow().heading
    }

    fn left_current(&self) -> f64 {
        self.0.borrow().left_output.abs() * 40.0
    }

    fn right_current(&self) -> f64 {
        self.0.borrow().right_output.abs() * 40.0
    }

    fn reset_sensors(&mut self) {
        let mut model = self.0.borrow_mut();
        model.left_position = 0.0;
        model.right_position = 0.0;
        model.heading = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArmDemand {
    Output(f64),
    Reference(f64),
}

#[derive(Debug, Clone, Copy)]
pub struct OutriggerModel {
    /// Arm rotations
    pub position: f64,
    pub lower: f64,
    pub upper: f64,
    pub arm: ArmDemand,
    pub wheel_output: f64,
}

impl OutriggerModel {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            position: lower,
            lower,
            upper,
            arm: ArmDemand::Output(0.0),
            wheel_output: 0.0,
        }
    }

    fn step(&mut self, dt_s: f64) {
        let max_step = OUTRIGGER_FREE_SPEED * dt_s;
        let delta = match self.arm {
            ArmDemand::Output(output) => output.clamp(-1.0, 1.0) * max_step,
            ArmDemand::Reference(set_point) => (set_point - self.position).clamp(-max_step, max_step),
        };
        self.position = (self.position + delta).clamp(self.lower, self.upper);
    }
}

#[derive(Debug, Clone)]
pub struct SimOutrigger(pub Rc<RefCell<OutriggerModel>>);

impl OutriggerActuator for SimOutrigger {
    fn position(&self) -> f64 {
        self.0.borrow().position
    }

    fn reset_position(&mut self, position: f64) {
        self.0.borrow_mut().position = position;
    }

    fn set_arm_output(&mut self, output: f64) -> Result<(), ActuatorError> {
        self.0.borrow_mut().arm = ArmDemand::Output(output);
        Ok(())
    }

    fn set_arm_reference(&mut self, set_point: f64, _feed_forward: f64) -> Result<(), ActuatorError> {
        self.0.borrow_mut().arm = ArmDemand::Reference(set_point);
        Ok(())
    }

    fn set_wheel_output(&mut self, output: f64) -> Result<(), ActuatorError> {
        self.0.borrow_mut().wheel_output = output;
        Ok(())
    }
}

/// Harness-side handles to every enabled model
#[derive(Debug, Clone, Default)]
pub struct SimPlant {
    pub elevator: Option<Rc<RefCell<ElevatorModel>>>,
    pub drive: Option<Rc<RefCell<DriveModel>>>,
    pub outrigger: Option<Rc<RefCell<OutriggerModel>>>,
}

impl SimPlant {
    /// Advance every model by `dt_us`
    pub fn step(&self, dt_us: u64) {
        let dt_s = dt_us as f64 / 1_000_000.0;
        if let Some(elevator) = &self.elevator {
            elevator.borrow_mut().step(dt_s);
        }
        if let Some(drive) = &self.drive {
            drive.borrow_mut().step(dt_s);
        }
        if let Some(outrigger) = &self.outrigger {
            outrigger.borrow_mut().step(dt_s);
        }
    }

    pub fn elevator_position(&self) -> Option<f64> {
        self.elevator.as_ref().map(|m| m.borrow().position)
    }

    pub fn outrigger_position(&self) -> Option<f64> {
        self.outrigger.as_ref().map(|m| m.borrow().position)
    }

    /// Mean wheel travel in rotations
    pub fn drive_distance(&self) -> Option<f64> {
        self.drive.as_ref().map(|m| {
            let m = m.borrow();
            (m.left_position + m.right_position) / 2.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYCLE_US: u64 = 20_000;

    fn elevator() -> (SimElevator, SimPlant) {
        let model = Rc::new(RefCell::new(ElevatorModel::new(55_000.0)));
        let plant = SimPlant {
            elevator: Some(model.clone()),
            ..SimPlant::default()
        };
        (SimElevator(model), plant)
    }

    #[test]
    fn test_elevator_motion_profile_converges() {
        let (mut bridge, plant) = elevator();
        bridge
            .set(ElevatorDemand::MotionProfile {
                position: 4_500,
                feed_forward: 0.07,
            })
            .unwrap();

        for _ in 0..10 {
            plant.step(CYCLE_US);
        }
        assert_eq!(bridge.position(), 4_500);
    }

    #[test]
    fn test_elevator_bottom_latches_reverse_limit() {
        let (mut bridge, plant) = elevator();
        bridge.set(ElevatorDemand::PercentOutput(-0.5)).unwrap();
        plant.step(CYCLE_US);

        assert_eq!(bridge.position(), 0);
        assert_eq!(bridge.take_sticky_faults(), ElevatorFaults::REVERSE_LIMIT_SWITCH);
        assert!(bridge.take_sticky_faults().is_empty());
    }

    #[test]
    fn test_elevator_top_latches_forward_limit() {
        let (mut bridge, plant) = elevator();
        bridge.set(ElevatorDemand::PercentOutput(1.0)).unwrap();
        for _ in 0..100 {
            plant.step(CYCLE_US);
        }
        assert_eq!(bridge.position(), 55_000);
        assert!(bridge.take_sticky_faults().contains(ElevatorFaults::FORWARD_LIMIT_SWITCH));
    }

    #[test]
    fn test_elevator_fail_next_rejects_once() {
        let (mut bridge, _plant) = elevator();
        bridge.0.borrow_mut().fail_next = Some(ActuatorError::Timeout);

        assert_eq!(bridge.set(ElevatorDemand::PercentOutput(0.1)), Err(ActuatorError::Timeout));
        assert!(bridge.set(ElevatorDemand::PercentOutput(0.1)).is_ok());
        assert_eq!(bridge.0.borrow().writes, 1);
    }

    #[test]
    fn test_drive_turns_with_uneven_sides() {
        let model = Rc::new(RefCell::new(DriveModel::default()));
        let plant = SimPlant {
            drive: Some(model.clone()),
            ..SimPlant::default()
        };
        let mut bridge = SimDrive(model);
        bridge.set_output(0.5, -0.5).unwrap();
        plant.step(CYCLE_US);

        assert!(bridge.heading() > 0.0);
        assert!(bridge.left_position() > 0.0);
        assert!(plant.drive_distance().unwrap().abs() < 1e-9);

        bridge.reset_sensors();
        assert_eq!(bridge.heading(), 0.0);
    }

    #[test]
    fn test_outrigger_reference_clamps_to_travel() {
        let model = Rc::new(RefCell::new(OutriggerModel::new(0.0, 46.0)));
        let plant = SimPlant {
            outrigger: Some(model.clone()),
            ..SimPlant::default()
        };
        let mut bridge = SimOutrigger(model);
        bridge.set_arm_reference(60.0, 0.0).unwrap();
        for _ in 0..200 {
            plant.step(CYCLE_US);
        }
        assert_eq!(bridge.position(), 46.0);
        assert_eq!(plant.outrigger_position(), Some(46.0));
    }
}
