//! Task representation.

use serde::Serialize;

use crate::core::utilization_model::{NullUtilization, UtilizationModel};
use crate::core::utilization_models::TaskIoModel;

/// Number of instructions in one compute length unit (MI).
pub const MILLION: f64 = 1_000_000.;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Queued,
    Running,
    Finished,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Finished => write!(f, "finished"),
        }
    }
}

/// A unit of work demanding compute (in MI) and I/O (in operations).
///
/// Progress is tracked in instructions and operations. It never decreases and never exceeds the totals.
#[derive(Clone)]
pub struct Task {
    id: u32,
    compute_length: u64,
    io_length: u64,
    cores: u32,
    compute_done: u64,
    io_done: u64,
    status: TaskStatus,
    finish_time: Option<f64>,
    compute_model: Box<dyn UtilizationModel>,
    io_model: TaskIoModel,
}

impl Task {
    pub fn new(
        id: u32,
        compute_length: u64,
        io_length: u64,
        cores: u32,
        compute_model: Box<dyn UtilizationModel>,
        io_model: TaskIoModel,
    ) -> Self {
        Self {
            id,
            compute_length,
            io_length,
            cores: cores.max(1),
            compute_done: 0,
            io_done: 0,
            status: TaskStatus::Queued,
            finish_time: None,
            compute_model,
            io_model,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn compute_length(&self) -> u64 {
        self.compute_length
    }

    pub fn io_length(&self) -> u64 {
        self.io_length
    }

    pub fn cores(&self) -> u32 {
        self.cores
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// Executed instructions.
    pub fn compute_done(&self) -> u64 {
        self.compute_done
    }

    /// Executed I/O operations.
    pub fn io_done(&self) -> u64 {
        self.io_done
    }

    fn total_instructions(&self) -> u64 {
        self.compute_length.saturating_mul(MILLION as u64)
    }

    /// Remaining compute length in MI, rounded down.
    pub fn remaining_compute(&self) -> u64 {
        self.total_instructions().saturating_sub(self.compute_done) / MILLION as u64
    }

    pub fn remaining_io(&self) -> u64 {
        self.io_length.saturating_sub(self.io_done)
    }

    pub fn is_compute_finished(&self) -> bool {
        self.remaining_compute() == 0
    }

    pub fn is_io_finished(&self) -> bool {
        self.remaining_io() == 0
    }

    pub fn compute_model(&self) -> &dyn UtilizationModel {
        self.compute_model.as_ref()
    }

    pub fn io_model(&self) -> &TaskIoModel {
        &self.io_model
    }

    pub(crate) fn io_model_mut(&mut self) -> &mut TaskIoModel {
        &mut self.io_model
    }

    /// Compute utilization at the given time, derated by I/O contention if the model reacts to it.
    pub fn compute_utilization(&self, time: f64) -> f64 {
        if self.compute_model.is_io_sensitive() {
            let io_utilization = self.io_model.utilization(time);
            self.compute_model.utilization_under_io(time, io_utilization)
        } else {
            self.compute_model.utilization(time)
        }
    }

    pub fn io_utilization(&self, time: f64) -> f64 {
        self.io_model.utilization(time)
    }

    pub(crate) fn add_compute_progress(&mut self, instructions: u64) {
        self.compute_done = self.compute_done.saturating_add(instructions).min(self.total_instructions());
    }

    pub(crate) fn add_io_progress(&mut self, operations: u64) {
        self.io_done = self.io_done.saturating_add(operations).min(self.io_length);
    }

    pub(crate) fn finish_compute(&mut self) {
        self.compute_model = Box::new(NullUtilization::new());
    }

    pub(crate) fn finish_io(&mut self) {
        self.io_model = TaskIoModel::finished();
    }

    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub(crate) fn finalize(&mut self, time: f64) {
        self.compute_done = self.total_instructions();
        self.io_done = self.io_length;
        self.status = TaskStatus::Finished;
        self.finish_time = Some(time);
    }
}
