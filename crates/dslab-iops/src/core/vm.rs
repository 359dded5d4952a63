//! Virtual machine.

use crate::core::task::Task;
use crate::core::task_scheduler::TaskScheduler;
use crate::core::utilization_history::UtilizationHistory;
use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VmStatus {
    Initializing,
    Running,
}

impl std::fmt::Display for VmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Initializing => write!(f, "initializing"),
            VmStatus::Running => write!(f, "running"),
        }
    }
}

/// Virtual machine with its own task scheduler and utilization histories.
///
/// Until the first processing update the VM requests its full capacity, which reserves it on the host at admission.
pub struct Vm {
    pub id: u32,
    io_bandwidth: u64,
    memory: u64,
    status: VmStatus,
    scheduler: TaskScheduler,
    compute_history: UtilizationHistory,
    io_history: UtilizationHistory,
    scheduling_interval: f64,
    last_history_time: f64,
}

impl Vm {
    /// Creates a VM around the scheduler, which defines the VM compute and I/O capacity.
    /// `io_bandwidth` is the flat slice requested from the host I/O provisioner.
    pub fn new(
        id: u32,
        io_bandwidth: u64,
        scheduler: TaskScheduler,
        scheduling_interval: f64,
        history_length: usize,
    ) -> Self {
        Self {
            id,
            io_bandwidth,
            memory: 0,
            status: VmStatus::Initializing,
            scheduler,
            compute_history: UtilizationHistory::new(history_length),
            io_history: UtilizationHistory::new(history_length),
            scheduling_interval,
            last_history_time: 0.,
        }
    }

    /// Sets the amount of memory moved on migration, in the units of `io_bandwidth` per second.
    pub fn with_memory(mut self, memory: u64) -> Self {
        self.memory = memory;
        self
    }

    pub fn submit(&mut self, task: Task) -> Result<f64> {
        self.scheduler.submit(task)
    }

    /// Runs the task scheduler with the capacity granted by the host and records utilization history.
    pub fn update_processing(&mut self, time: f64, compute_share: &[f64], io_share: f64) -> f64 {
        if self.status == VmStatus::Initializing {
            self.status = VmStatus::Running;
        }
        let next_event = self.scheduler.update_processing(time, compute_share, io_share);
        self.record_utilization(time);
        next_event
    }

    /// Appends one sample per dimension if a scheduling interval passed since the previous sample.
    /// Nothing is recorded at time zero.
    pub fn record_utilization(&mut self, time: f64) {
        if time - self.last_history_time < self.scheduling_interval {
            return;
        }
        self.compute_history.add(self.compute_utilization());
        self.io_history.add(self.io_utilization());
        self.last_history_time = time;
    }

    /// Sum of task compute utilizations at the latest processing time.
    pub fn compute_utilization(&self) -> f64 {
        self.scheduler
            .total_utilization_of_compute(self.scheduler.previous_time())
    }

    pub fn io_utilization(&self) -> f64 {
        self.scheduler.total_utilization_of_io(self.scheduler.previous_time())
    }

    /// Compute rate requested per virtual core.
    pub fn current_requested_compute(&self) -> Vec<f64> {
        if self.status == VmStatus::Initializing {
            return vec![self.core_compute(); self.cores() as usize];
        }
        self.scheduler.current_requested_compute()
    }

    pub fn current_requested_total_compute(&self) -> f64 {
        self.current_requested_compute().iter().sum()
    }

    pub fn current_requested_io(&self) -> f64 {
        if self.status == VmStatus::Initializing {
            return self.io_capacity();
        }
        self.scheduler.current_requested_io()
    }

    pub fn core_compute(&self) -> f64 {
        self.scheduler.core_compute()
    }

    pub fn cores(&self) -> u32 {
        self.scheduler.cores()
    }

    pub fn total_compute(&self) -> f64 {
        self.scheduler.total_compute()
    }

    pub fn io_capacity(&self) -> f64 {
        self.scheduler.io_capacity()
    }

    pub fn io_bandwidth(&self) -> u64 {
        self.io_bandwidth
    }

    pub fn memory(&self) -> u64 {
        self.memory
    }

    /// Time to copy the VM memory over its I/O bandwidth, infinite if it has memory but no bandwidth.
    pub fn migration_time(&self) -> f64 {
        if self.memory == 0 {
            0.
        } else if self.io_bandwidth == 0 {
            f64::INFINITY
        } else {
            self.memory as f64 / self.io_bandwidth as f64
        }
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    pub fn set_status(&mut self, status: VmStatus) {
        self.status = status;
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TaskScheduler {
        &mut self.scheduler
    }

    pub fn compute_history(&self) -> &UtilizationHistory {
        &self.compute_history
    }

    pub fn io_history(&self) -> &UtilizationHistory {
        &self.io_history
    }
}
