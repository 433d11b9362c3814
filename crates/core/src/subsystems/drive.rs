//! Differential drive subsystem

use alloc::boxed::Box;

use super::ActuatorError;
use crate::diagnostics::{Diagnostics, Level};
use crate::intent::Intent;
use crate::math;
use crate::subsystem::{Subsystem, SubsystemConfig, SubsystemCore};

/// Drive motor controllers, encoders and IMU
pub trait DriveActuator {
    /// Write left/right percent outputs in [-1, 1]
    fn set_output(&mut self, left: f64, right: f64) -> Result<(), ActuatorError>;

    /// Left encoder position in rotations
    fn left_position(&self) -> f64;

    fn right_position(&self) -> f64;

    /// Fused heading in degrees
    fn heading(&self) -> f64 {
        0.0
    }

    /// Pitch in degrees
    fn tilt(&self) -> f64 {
        0.0
    }

    fn left_current(&self) -> f64 {
        0.0
    }

    fn right_current(&self) -> f64 {
        0.0
    }

    /// Zero heading and encoders
    fn reset_sensors(&mut self) {}
}

/// Drive shaping gains
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveConfig {
    pub input_threshold: f64,
    /// Output gain in precision mode
    pub precision_gain: f64,
    /// Turn contribution at zero forward input
    pub turn_gain: f64,
    /// How much forward input reduces the turn contribution
    pub turn_damping: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            input_threshold: math::DEFAULT_INPUT_THRESHOLD,
            precision_gain: 0.05,
            turn_gain: 0.25,
            turn_damping: 0.5,
        }
    }
}

/// Drive subsystem
///
/// Unlocked, the operator axes are shaped into left/right outputs. Locked,
/// whatever the routine last set with [`Drive::set_drive_output`] is written.
/// Writes happen in `update`, before the manual path runs, so they lag the
/// operator input by one cycle.
pub struct Drive {
    core: SubsystemCore,
    actuator: Box<dyn DriveActuator>,
    config: DriveConfig,
    left_output: f64,
    right_output: f64,
    left_position: f64,
    right_position: f64,
}

impl Drive {
    pub fn new<A: DriveActuator + 'static>(
        actuator: A,
        config: DriveConfig,
        subsystem: SubsystemConfig,
        diag: &Diagnostics,
    ) -> Self {
        Self {
            core: SubsystemCore::new("Drive", subsystem, diag),
            actuator: Box::new(actuator),
            config,
            left_output: 0.0,
            right_output: 0.0,
            left_position: 0.0,
            right_position: 0.0,
        }
    }

    pub fn set_drive_output(&mut self, left: f64, right: f64) {
        self.left_output = left;
        self.right_output = right;
    }

    /// Pending (left, right) outputs
    pub fn output(&self) -> (f64, f64) {
        (self.left_output, self.right_output)
    }

    pub fn heading(&self) -> f64 {
        self.actuator.heading()
    }

    pub fn tilt(&self) -> f64 {
        self.actuator.tilt()
    }

    pub fn reset_sensors(&mut self) {
        self.actuator.reset_sensors();
        self.left_position = 0.0;
        self.right_position = 0.0;
    }

    /// Left encoder in hundredths of a rotation
    pub fn left_ticks(&self) -> i32 {
        libm::round(self.left_position * 100.0) as i32
    }

    pub fn right_ticks(&self) -> i32 {
        libm::round(self.right_position * 100.0) as i32
    }

    /// Square an axis past the deadzone, keeping its sign
    fn shape(&self, value: f64) -> f64 {
        if math::exceeds(value, self.config.input_threshold) {
            math::signed_square(value)
        } else {
            0.0
        }
    }

    /// Linear from zero at the deadzone edge
    fn fine(&self, value: f64) -> f64 {
        let deadzoned = math::threshold(value, self.config.input_threshold);
        if deadzoned > 0.0 {
            deadzoned - self.config.input_threshold
        } else if deadzoned < 0.0 {
            deadzoned + self.config.input_threshold
        } else {
            0.0
        }
    }
}

impl Subsystem for Drive {
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
        math::exceeds(intent.drive_forward, self.config.input_threshold)
            || math::exceeds(intent.drive_turn, self.config.input_threshold)
    }

    fn spaced_update(&mut self, _intent: &Intent) {
        self.core.log_sample(
            Level::Debug,
            format_args!(
                "Left Output: {:.3}, Right Output: {:.3}, Left Current: {:.2}, Right Current: {:.2}",
                self.left_output,
                self.right_output,
                self.actuator.left_current(),
                self.actuator.right_current()
            ),
        );
    }

    fn update(&mut self) {
        self.left_position = self.actuator.left_position();
        self.right_position = self.actuator.right_position();
        if !self.core.should_output() {
            return;
        }
        if let Err(e) = self.actuator.set_output(self.left_output, self.right_output) {
            crate::log_error!(self.core.diagnostics(), "Actuator error: {}", e);
        }
    }

    fn update_unlocked(&mut self, intent: &Intent) {
        if intent.drive_precision {
            let forward = self.fine(intent.drive_forward);
            let turn = self.fine(intent.drive_turn);
            self.left_output = (forward + turn) * self.config.precision_gain;
            self.right_output = (forward - turn) * self.config.precision_gain;
        } else {
            let forward = self.shape(intent.drive_forward);
            let turn = self.shape(intent.drive_turn)
                * (1.0 - math::abs(forward) * self.config.turn_damping)
                * self.config.turn_gain;
            self.left_output = forward + turn;
            self.right_output = forward - turn;
        }
    }

    fn on_reset(&mut self) {
        self.left_output = 0.0;
        self.right_output = 0.0;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    #[derive(Clone, Default)]
    pub(crate) struct MockDrive(pub Rc<RefCell<Vec<(f64, f64)>>>);

    impl MockDrive {
        pub(crate) fn last(&self) -> Option<(f64, f64)> {
            self.0.borrow().last().copied()
        }
    }

    impl DriveActuator for MockDrive {
        fn set_output(&mut self, left: f64, right: f64) -> Result<(), ActuatorError> {
            self.0.borrow_mut().push((left, right));
            Ok(())
        }

        fn left_position(&self) -> f64 {
            1.234
        }

        fn right_position(&self) -> f64 {
            -0.5
        }
    }

    fn drive() -> (Drive, MockDrive) {
        let mock = MockDrive::default();
        let drive = Drive::new(
            mock.clone(),
            DriveConfig::default(),
            SubsystemConfig::default(),
            &Diagnostics::silent(),
        );
        (drive, mock)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_forward_is_squared() {
        let (mut drive, mock) = drive();
        let mut intent = Intent::default();
        intent.drive_forward = 0.5;

        drive.pipeline(&intent);
        assert_eq!(mock.last(), Some((0.0, 0.0)));
        let (left, right) = drive.output();
        assert!(close(left, 0.25));
        assert!(close(right, 0.25));

        drive.pipeline(&intent);
        let (left, right) = mock.last().unwrap();
        assert!(close(left, 0.25));
        assert!(close(right, 0.25));
        assert_eq!(mock.0.borrow().len(), 2);
    }

    #[test]
    fn test_turn_damped_by_forward() {
        let (mut drive, _mock) = drive();
        let mut intent = Intent::default();
        intent.drive_forward = 1.0;
        intent.drive_turn = 1.0;
        drive.update_unlocked(&intent);

        let (left, right) = drive.output();
        assert!(close(left, 1.125));
        assert!(close(right, 0.875));
    }

    #[test]
    fn test_precision_mode_is_symmetric() {
        let (mut drive, _mock) = drive();
        let mut intent = Intent::default();
        intent.drive_precision = true;
        intent.drive_forward = -0.6;
        drive.update_unlocked(&intent);

        let (left, right) = drive.output();
        assert!(close(left, -0.025));
        assert!(close(right, -0.025));
    }

    #[test]
    fn test_locked_writes_routine_output() {
        let (mut drive, mock) = drive();
        drive.lock();
        drive.set_drive_output(0.3, 0.3);

        drive.pipeline(&Intent::default());

        assert!(drive.is_locked());
        assert_eq!(mock.last(), Some((0.3, 0.3)));
    }

    #[test]
    fn test_turn_input_unlocks() {
        let (mut drive, _mock) = drive();
        drive.lock();
        let mut intent = Intent::default();
        intent.drive_turn = -0.2;
        drive.pipeline(&intent);
        assert!(!drive.is_locked());
    }

    #[test]
    fn test_encoder_ticks() {
        let (mut drive, _mock) = drive();
        drive.update();
        assert_eq!(drive.left_ticks(), 123);
        assert_eq!(drive.right_ticks(), -50);
    }
}
