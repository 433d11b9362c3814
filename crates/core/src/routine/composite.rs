//! Sequential and parallel composition of routines

use alloc::string::String;
use alloc::vec::Vec;

use super::{Routine, RoutineContext, RoutineHandle};

/// Runs children one after another
pub struct SequentialRoutine {
    name: String,
    children: Vec<RoutineHandle>,
    current: usize,
}

impl SequentialRoutine {
    pub fn new(name: impl Into<String>, children: Vec<RoutineHandle>) -> Self {
        Self {
            name: name.into(),
            children,
            current: 0,
        }
    }

    /// Append a child
    pub fn then(mut self, child: RoutineHandle) -> Self {
        self.children.push(child);
        self
    }

    /// Index of the running child, equal to the child count once done
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Routine for SequentialRoutine {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&mut self, ctx: &mut RoutineContext<'_>) {
        self.current = 0;
        if let Some(first) = self.children.first() {
            first.begin(ctx);
        }
    }

    fn update(&mut self, ctx: &mut RoutineContext<'_>) {
        if let Some(child) = self.children.get(self.current) {
            child.update(ctx);
        }
    }

    fn check_finished(&mut self, ctx: &mut RoutineContext<'_>) -> bool {
        let Some(child) = self.children.get(self.current) else {
            return true;
        };
        if !child.check_finished(ctx) {
            return false;
        }
        child.terminate(ctx);
        self.current += 1;
        match self.children.get(self.current) {
            Some(next) => {
                next.begin(ctx);
                false
            }
            None => true,
        }
    }

    fn terminate(&mut self, ctx: &mut RoutineContext<'_>) {
        if let Some(child) = self.children.get(self.current) {
            child.terminate(ctx);
        }
    }

    fn abandon(&mut self) {
        if let Some(child) = self.children.get(self.current) {
            child.abandon();
        }
    }
}

/// Runs all children at once, finishing when the last one does
pub struct ParallelRoutine {
    name: String,
    children: Vec<RoutineHandle>,
}

impl ParallelRoutine {
    pub fn new(name: impl Into<String>, children: Vec<RoutineHandle>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn with(mut self, child: RoutineHandle) -> Self {
        self.children.push(child);
        self
    }

    /// Children still running
    pub fn active_count(&self) -> usize {
        self.children.iter().filter(|c| c.is_active()).count()
    }
}

impl Routine for ParallelRoutine {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&mut self, ctx: &mut RoutineContext<'_>) {
        for child in &self.children {
            child.begin(ctx);
        }
    }

    fn update(&mut self, ctx: &mut RoutineContext<'_>) {
        for child in self.children.iter().filter(|c| c.is_active()) {
            child.update(ctx);
        }
    }

    fn check_finished(&mut self, ctx: &mut RoutineContext<'_>) -> bool {
        for child in &self.children {
            if child.is_active() && child.check_finished(ctx) {
                child.terminate(ctx);
            }
        }
        self.active_count() == 0
    }

    fn terminate(&mut self, ctx: &mut RoutineContext<'_>) {
        for child in self.children.iter().filter(|c| c.is_active()) {
            child.terminate(ctx);
        }
    }

    fn abandon(&mut self) {
        for child in &self.children {
            child.abandon();
        }
    }
}
