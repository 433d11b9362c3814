//! Simulation configuration
//!
//! Loaded from TOML. Every section is optional; missing fields take the
//! defaults below.
//!
//! ```toml
//! log_level = "debug"
//! period_ms = 20
//! cycles = 600
//! mode = "teleop"
//!
//! [subsystems]
//! elevator = true
//! outrigger = true
//!
//! [[script]]
//! at_ms = 100
//! routines = ["SecondLevelClimb"]
//! ```

use std::path::Path;
use std::str::FromStr;

use robocycle_core::scheduler::CycleBudget;
use robocycle_core::subsystems::ElevatorConfig;
use robocycle_core::{CancelPolicy, LevelFilter, RobotMode, RoutineManagerConfig, SchedulerConfig};
use serde::Deserialize;

use crate::error::SimError;

/// Top-level simulation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Severity filter: off, error, warn, info, debug or trace.
    pub log_level: String,
    /// Cycle period in milliseconds.
    pub period_ms: u64,
    /// Cycles to run before stopping.
    pub cycles: u64,
    /// Mode entered at startup.
    pub mode: ModeName,
    /// Write demands to the simulated actuators.
    pub should_output: bool,
    pub subsystems: SubsystemEnables,
    pub heights: Heights,
    pub elevator: ElevatorSection,
    pub routines: RoutineSection,
    /// Timeline of scripted operator input.
    pub script: Vec<ScriptStep>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            period_ms: 20,
            cycles: 500,
            mode: ModeName::Teleop,
            should_output: true,
            subsystems: SubsystemEnables::default(),
            heights: Heights::default(),
            elevator: ElevatorSection::default(),
            routines: RoutineSection::default(),
            script: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeName {
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl From<ModeName> for RobotMode {
    fn from(mode: ModeName) -> Self {
        match mode {
            ModeName::Disabled => RobotMode::Disabled,
            ModeName::Autonomous => RobotMode::Autonomous,
            ModeName::Teleop => RobotMode::Teleop,
            ModeName::Test => RobotMode::Test,
        }
    }
}

/// Which subsystems are built.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubsystemEnables {
    pub elevator: bool,
    pub drive: bool,
    pub outrigger: bool,
}

impl Default for SubsystemEnables {
    fn default() -> Self {
        Self {
            elevator: true,
            drive: true,
            outrigger: true,
        }
    }
}

/// Named elevator heights in inches.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Heights {
    pub bottom_hatch: f64,
    pub rocket_middle_hatch: f64,
    pub rocket_top_hatch: f64,
    pub second_level_climb: f64,
    pub third_level_climb: f64,
}

impl Default for Heights {
    fn default() -> Self {
        Self {
            bottom_hatch: 4.7,
            rocket_middle_hatch: 53.8,
            rocket_top_hatch: 104.8,
            second_level_climb: 10.0,
            third_level_climb: 20.0,
        }
    }
}

/// Elevator constants.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElevatorSection {
    /// Encoder ticks per inch of carriage travel.
    pub ticks_per_inch: f64,
    pub max_position: i32,
    pub cruise_velocity: f64,
    pub feed_forward: f64,
    pub within_set_point: i32,
}

impl Default for ElevatorSection {
    fn default() -> Self {
        let core = ElevatorConfig::default();
        Self {
            ticks_per_inch: 450.0,
            max_position: core.max_position,
            cruise_velocity: core.cruise_velocity,
            feed_forward: core.feed_forward,
            within_set_point: core.within_set_point,
        }
    }
}

impl ElevatorSection {
    pub fn to_core(&self) -> ElevatorConfig {
        ElevatorConfig {
            max_position: self.max_position,
            cruise_velocity: self.cruise_velocity,
            feed_forward: self.feed_forward,
            within_set_point: self.within_set_point,
            ..ElevatorConfig::default()
        }
    }

    /// Convert a height in inches to encoder ticks.
    pub fn ticks(&self, inches: f64) -> i32 {
        (inches * self.ticks_per_inch).round() as i32
    }
}

/// Routine manager behavior.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutineSection {
    pub cancel_policy: CancelPolicyName,
    pub same_cycle_handoff: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelPolicyName {
    #[default]
    Abandon,
    Terminate,
}

impl From<CancelPolicyName> for CancelPolicy {
    fn from(name: CancelPolicyName) -> Self {
        match name {
            CancelPolicyName::Abandon => CancelPolicy::Abandon,
            CancelPolicyName::Terminate => CancelPolicy::Terminate,
        }
    }
}

/// One point on the operator input timeline.
///
/// Axes hold their value until a later step changes them. Routines and the
/// cancel request fire once, on the cycle the step is reached.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptStep {
    /// Time since the mode was entered.
    pub at_ms: u64,
    pub drive_forward: Option<f64>,
    pub drive_turn: Option<f64>,
    pub elevator_input: Option<f64>,
    pub outrigger: Option<f64>,
    pub outrigger_wheel: Option<f64>,
    pub drive_precision: Option<bool>,
    pub elevator_soft_land: Option<bool>,
    pub cancel_routines: bool,
    /// Names from the routine table.
    pub routines: Vec<String>,
}

impl SimConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SimError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, SimError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.level_filter()?;
        if self.period_ms == 0 {
            return Err(SimError::InvalidConfig("period_ms must be at least 1".into()));
        }
        if self.elevator.ticks_per_inch <= 0.0 {
            return Err(SimError::InvalidConfig("elevator.ticks_per_inch must be positive".into()));
        }
        if self.elevator.max_position <= 0 {
            return Err(SimError::InvalidConfig("elevator.max_position must be positive".into()));
        }
        if self.script.windows(2).any(|w| w[1].at_ms < w[0].at_ms) {
            return Err(SimError::InvalidConfig("script steps must be ordered by at_ms".into()));
        }
        let axes_out_of_range = self.script.iter().any(|step| {
            [
                step.drive_forward,
                step.drive_turn,
                step.elevator_input,
                step.outrigger,
                step.outrigger_wheel,
            ]
            .into_iter()
            .flatten()
            .any(|v| !(-1.0..=1.0).contains(&v))
        });
        if axes_out_of_range {
            return Err(SimError::InvalidConfig("script axes must lie in [-1, 1]".into()));
        }
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, SimError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| SimError::InvalidConfig(format!("unknown log level {:?}", self.log_level)))
    }

    pub fn period_us(&self) -> u64 {
        self.period_ms.saturating_mul(1_000)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        let rate_hz = u32::try_from(1_000 / self.period_ms.max(1)).unwrap_or(u32::MAX);
        SchedulerConfig {
            budget: CycleBudget {
                period_us: u32::try_from(self.period_us()).unwrap_or(u32::MAX),
                ..CycleBudget::from_rate_hz(rate_hz)
            },
            routines: RoutineManagerConfig {
                cancel_policy: self.routines.cancel_policy.into(),
                same_cycle_handoff: self.routines.same_cycle_handoff,
            },
        }
    }
}
