//! Simulation harness
//!
//! Builds a [`Robot`] from a [`SimConfig`], wires each enabled subsystem to
//! its simulated mechanism and runs the cycle loop either in lockstep or
//! paced by a tokio interval.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use robocycle_core::routine::RoutineStats;
use robocycle_core::subsystems::{Drive, DriveConfig, Elevator, Outrigger, OutriggerConfig};
use robocycle_core::{
    CycleStats, Diagnostics, MockTime, Robot, RobotMode, SubsystemConfig, TimeSource,
};
use tokio::time::{interval, MissedTickBehavior};

use crate::clock::{SimClock, WallClock};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::plant::{
    DriveModel, ElevatorModel, OutriggerModel, SimDrive, SimElevator, SimOutrigger, SimPlant,
};
use crate::routines::{RoutineTable, SubsystemHandles};
use crate::script::ScriptedIntent;

/// Hard stop above the configured soft maximum, in percent
const ELEVATOR_OVERTRAVEL_PERCENT: f64 = 10.0;

/// A robot wired to simulated mechanisms
pub struct Simulation {
    robot: Robot<SimClock, ScriptedIntent>,
    clock: SimClock,
    plant: SimPlant,
    handles: SubsystemHandles,
    table: RoutineTable,
    mode: RobotMode,
    period_us: u64,
    cycles_run: u64,
}

impl Simulation {
    pub fn new(config: &SimConfig, clock: SimClock, diag: &Diagnostics) -> Result<Self, SimError> {
        config.validate()?;

        let subsystem = SubsystemConfig {
            should_output: config.should_output,
            ..SubsystemConfig::default()
        };
        let mut robot = Robot::new(
            config.scheduler_config(),
            clock.clone(),
            ScriptedIntent::default(),
            diag,
        );
        let mut plant = SimPlant::default();
        let mut handles = SubsystemHandles::default();

        if config.subsystems.elevator {
            let elevator = config.elevator.to_core();
            let hard_max =
                f64::from(elevator.max_position) * (1.0 + ELEVATOR_OVERTRAVEL_PERCENT / 100.0);
            let model = Rc::new(RefCell::new(ElevatorModel::new(hard_max)));
            let bridge = SimElevator(Rc::clone(&model));
            handles.elevator = Some(robot.add_subsystem(Elevator::new(bridge, elevator, subsystem, diag)));
            plant.elevator = Some(model);
        }

        if config.subsystems.drive {
            let model = Rc::new(RefCell::new(DriveModel::default()));
            let bridge = SimDrive(Rc::clone(&model));
            handles.drive = Some(robot.add_subsystem(Drive::new(
                bridge,
                DriveConfig::default(),
                subsystem,
                diag,
            )));
            plant.drive = Some(model);
        }

        if config.subsystems.outrigger {
            let outrigger = OutriggerConfig::default();
            let model = Rc::new(RefCell::new(OutriggerModel::new(outrigger.lower, outrigger.upper)));
            let bridge = SimOutrigger(Rc::clone(&model));
            handles.outrigger = Some(robot.add_subsystem(Outrigger::new(
                bridge, outrigger, subsystem, diag,
            )));
            plant.outrigger = Some(model);
        }

        let table = RoutineTable::standard(config, &handles);
        *robot.intent_source_mut() = ScriptedIntent::new(&config.script, &table)?;

        tracing::debug!(
            subsystems = robot.subsystems().len(),
            routines = table.len(),
            "Simulation built"
        );

        Ok(Self {
            robot,
            clock,
            plant,
            handles,
            table,
            mode: config.mode.into(),
            period_us: config.period_us(),
            cycles_run: 0,
        })
    }

    /// Deterministic simulation on a clock advanced one period per cycle
    pub fn lockstep(config: &SimConfig, diag: &Diagnostics) -> Result<Self, SimError> {
        Self::new(config, SimClock::Lockstep(MockTime::new()), diag)
    }

    /// Simulation on wall time, run with [`Simulation::run_realtime`]
    pub fn realtime(config: &SimConfig, diag: &Diagnostics) -> Result<Self, SimError> {
        Self::new(config, SimClock::Realtime(WallClock::new()), diag)
    }

    pub fn robot(&self) -> &Robot<SimClock, ScriptedIntent> {
        &self.robot
    }

    pub fn robot_mut(&mut self) -> &mut Robot<SimClock, ScriptedIntent> {
        &mut self.robot
    }

    pub fn plant(&self) -> &SimPlant {
        &self.plant
    }

    pub fn handles(&self) -> &SubsystemHandles {
        &self.handles
    }

    pub fn routine_table(&self) -> &RoutineTable {
        &self.table
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    /// Enter the configured mode and restart the script
    pub fn start(&mut self) {
        self.robot.intent_source_mut().rewind();
        self.robot.enter_mode(self.mode);
    }

    /// Run one cycle, then let the mechanisms respond for one period
    ///
    /// Returns `false` while the robot is disabled.
    pub fn step(&mut self) -> bool {
        let ran = self.robot.cycle();
        if ran {
            self.cycles_run += 1;
        }
        self.plant.step(self.period_us);
        self.clock.advance(self.period_us);
        ran
    }

    /// Run `cycles` cycles back to back
    pub fn run_lockstep(&mut self, cycles: u64) -> SimSummary {
        self.start();
        for _ in 0..cycles {
            if !self.step() {
                break;
            }
        }
        self.summary()
    }

    /// Run `cycles` cycles paced by wall time
    ///
    /// Stops early on Ctrl-C. A late tick is delayed rather than burst so the
    /// cycle driver sees the overrun.
    pub async fn run_realtime(&mut self, cycles: u64) -> SimSummary {
        let mut ticker = interval(Duration::from_micros(self.period_us));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        self.start();
        while self.cycles_run < cycles {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(cycles = self.cycles_run, "Interrupted");
                    break;
                }
                _ = ticker.tick() => {
                    if !self.step() {
                        break;
                    }
                }
            }
        }
        self.summary()
    }

    pub fn summary(&self) -> SimSummary {
        let robot = &self.robot;
        let elevator = self
            .handles
            .elevator
            .and_then(|handle| robot.subsystem(handle));
        let outrigger = self
            .handles
            .outrigger
            .and_then(|handle| robot.subsystem(handle));

        SimSummary {
            cycles: self.cycles_run,
            elapsed_us: self.clock.now_us(),
            mode: robot.mode(),
            stats: *robot.stats(),
            routines: robot.routines().stats(),
            active_routine: robot.routines().active_name().map(str::to_string),
            elevator_position: elevator.map(Elevator::position),
            elevator_controller: elevator.map(Elevator::controller_name),
            outrigger_angle: outrigger.map(Outrigger::angle),
            drive_distance: self.plant.drive_distance(),
            locked: robot.subsystems().locked_count(),
            dropped_routines: robot.intent_source().dropped_routines(),
        }
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("robot", &self.robot)
            .field("cycles_run", &self.cycles_run)
            .finish()
    }
}

/// End-of-run report
#[derive(Debug, Clone, PartialEq)]
pub struct SimSummary {
    pub cycles: u64,
    pub elapsed_us: u64,
    pub mode: RobotMode,
    pub stats: CycleStats,
    pub routines: RoutineStats,
    pub active_routine: Option<String>,
    pub elevator_position: Option<i32>,
    pub elevator_controller: Option<&'static str>,
    pub outrigger_angle: Option<f64>,
    pub drive_distance: Option<f64>,
    pub locked: usize,
    pub dropped_routines: u32,
}

impl fmt::Display for SimSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} cycles in {} ({:.2} s)",
            self.cycles,
            self.mode,
            self.elapsed_us as f64 / 1_000_000.0
        )?;
        writeln!(
            f,
            "  execution avg {} us, max {} us, budget misses {}, overruns {}",
            self.stats.avg_execution_us,
            self.stats.max_execution_us,
            self.stats.budget_misses,
            self.stats.overruns
        )?;
        writeln!(
            f,
            "  routines begun {}, finished {}, cancelled {}, active {}",
            self.routines.begun,
            self.routines.finished,
            self.routines.cancelled,
            self.active_routine.as_deref().unwrap_or("none")
        )?;
        if let (Some(position), Some(controller)) = (self.elevator_position, self.elevator_controller) {
            writeln!(f, "  elevator at {} ticks ({})", position, controller)?;
        }
        if let Some(angle) = self.outrigger_angle {
            writeln!(f, "  outrigger at {:.1} deg", angle)?;
        }
        if let Some(distance) = self.drive_distance {
            writeln!(f, "  drive travelled {:.2} rotations", distance)?;
        }
        write!(f, "  {} subsystem(s) locked", self.locked)
    }
}
