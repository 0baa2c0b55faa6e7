//! FIFO of pending steps.

use std::collections::VecDeque;

use crate::step::{Step, StepId};

/// Ordered queue of steps awaiting execution.
///
/// Steps are only ever appended at the tail and removed from the head, so
/// insertion order is execution order. Ids keep counting across pops.
#[derive(Default)]
pub struct StepQueue {
    steps: VecDeque<(StepId, Box<dyn Step>)>,
    next_id: usize,
}

impl StepQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step and returns its id.
    pub fn push(&mut self, step: Box<dyn Step>) -> StepId {
        let id = StepId(self.next_id);
        self.next_id += 1;
        self.steps.push_back((id, step));
        id
    }

    /// Removes the head step.
    pub fn pop(&mut self) -> Option<(StepId, Box<dyn Step>)> {
        self.steps.pop_front()
    }

    /// Drops every pending step and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.steps.len();
        self.steps.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Names of pending steps in execution order.
    pub fn names(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|(_, step)| step.name().to_string())
            .collect()
    }
}
