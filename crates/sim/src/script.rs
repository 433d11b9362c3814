//! Scripted operator input
//!
//! Replays the `[[script]]` timeline of the configuration as an
//! [`IntentSource`]. Time is measured from the first cycle after the source
//! was created or rewound.

use robocycle_core::{Intent, IntentSource, RoutineHandle};

use crate::config::ScriptStep;
use crate::error::SimError;
use crate::routines::RoutineTable;

#[derive(Debug)]
struct ResolvedStep {
    at_us: u64,
    step: ScriptStep,
    routines: Vec<RoutineHandle>,
}

/// Timeline-driven intent source
#[derive(Debug, Default)]
pub struct ScriptedIntent {
    steps: Vec<ResolvedStep>,
    next: usize,
    start_us: Option<u64>,
    held: Intent,
    dropped_routines: u32,
}

impl ScriptedIntent {
    /// Resolve every routine name up front so typos fail at startup
    pub fn new(steps: &[ScriptStep], table: &RoutineTable) -> Result<Self, SimError> {
        let steps = steps
            .iter()
            .map(|step| -> Result<ResolvedStep, SimError> {
                let routines = step
                    .routines
                    .iter()
                    .map(|name| table.resolve(name))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ResolvedStep {
                    at_us: step.at_ms.saturating_mul(1_000),
                    step: step.clone(),
                    routines,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            steps,
            ..Self::default()
        })
    }

    /// Restart the timeline on the next cycle
    pub fn rewind(&mut self) {
        self.next = 0;
        self.start_us = None;
        self.held = Intent::default();
    }

    /// Whether every step has fired
    pub fn is_finished(&self) -> bool {
        self.next >= self.steps.len()
    }

    /// Routines that did not fit in a single cycle's intent
    pub fn dropped_routines(&self) -> u32 {
        self.dropped_routines
    }

    fn apply_axes(&mut self, step: &ScriptStep) {
        let held = &mut self.held;
        let axes = [
            (&mut held.drive_forward, step.drive_forward),
            (&mut held.drive_turn, step.drive_turn),
            (&mut held.elevator_input, step.elevator_input),
            (&mut held.outrigger, step.outrigger),
            (&mut held.outrigger_wheel, step.outrigger_wheel),
        ];
        for (axis, value) in axes {
            if let Some(value) = value {
                *axis = value;
            }
        }
        if let Some(precision) = step.drive_precision {
            held.drive_precision = precision;
        }
        if let Some(soft_land) = step.elevator_soft_land {
            held.elevator_soft_land = soft_land;
        }
    }
}

impl IntentSource for ScriptedIntent {
    fn next_intent(&mut self, now_us: u64) -> Intent {
        let start_us = *self.start_us.get_or_insert(now_us);
        let elapsed_us = now_us.saturating_sub(start_us);

        let mut cancel = false;
        let mut requested = Vec::new();
        while let Some(resolved) = self.steps.get(self.next) {
            if resolved.at_us > elapsed_us {
                break;
            }
            let step = resolved.step.clone();
            requested.extend(resolved.routines.iter().cloned());
            cancel |= step.cancel_routines;
            self.apply_axes(&step);
            self.next += 1;
        }

        let mut intent = self.held.clone();
        intent.cancel_routines = cancel;
        for routine in requested {
            if !intent.push_routine(routine) {
                self.dropped_routines += 1;
            }
        }
        intent
    }
}
