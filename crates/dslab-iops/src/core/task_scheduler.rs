//! Per-VM scheduling of tasks over compute and I/O capacity.

use std::cell::RefCell;

use crate::context::SimulationContext;
use crate::core::config::options::parse_config_value;
use crate::core::logger::TaskUtilizationEntry;
use crate::core::task::{Task, TaskStatus, MILLION};
use crate::core::utilization_models::TaskIoModel;
use crate::error::{Error, Result};
use crate::{log_debug, log_trace};

/// Minimal distance between the current time and any predicted finish time.
pub const MIN_FORWARD_PROGRESS: f64 = 0.1;

// STRUCTS -------------------------------------------------------------------------------------------------------------

/// The way task I/O demand follows compute demand. Selects which task I/O models the scheduler accepts and how
/// they are fed with the compute state of the task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemandCoupling {
    BurstCoupled,
    RatioCoupled,
}

impl DemandCoupling {
    pub fn accepts(&self, model: &TaskIoModel) -> bool {
        matches!(
            (self, model),
            (DemandCoupling::BurstCoupled, TaskIoModel::BurstCoupled(_))
                | (DemandCoupling::RatioCoupled, TaskIoModel::RatioCoupled(_))
                | (_, TaskIoModel::Finished(_))
        )
    }

    fn on_submit(&self, model: &mut TaskIoModel, compute_utilization: f64, total_compute: f64, io_capacity: f64) {
        match model {
            TaskIoModel::BurstCoupled(model) => model.set_compute_utilization(compute_utilization),
            TaskIoModel::RatioCoupled(model) => {
                model.set_compute_capacity(total_compute);
                model.set_io_capacity(io_capacity);
                model.set_compute_utilization(compute_utilization);
            }
            TaskIoModel::Finished(_) => {}
        }
    }

    fn on_progress(&self, model: &mut TaskIoModel, compute_done: f64, compute_utilization: f64, allocated: f64) {
        match model {
            TaskIoModel::BurstCoupled(model) => {
                model.update_compute_left(compute_done);
                model.set_compute_utilization(compute_utilization);
                model.set_allocated_compute(allocated);
            }
            TaskIoModel::RatioCoupled(model) => model.set_compute_utilization(compute_utilization),
            TaskIoModel::Finished(_) => {}
        }
    }
}

impl std::fmt::Display for DemandCoupling {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DemandCoupling::BurstCoupled => write!(f, "BurstCoupled"),
            DemandCoupling::RatioCoupled => write!(f, "RatioCoupled"),
        }
    }
}

/// Resolves the scheduler coupling from the name part of a task I/O model config string
/// (options such as `BurstCoupled[a=..,b=..]` are ignored here).
pub fn demand_coupling_resolver(config_str: &str) -> Result<DemandCoupling> {
    let (name, _) = parse_config_value(config_str);
    match name.as_str() {
        "BurstCoupled" => Ok(DemandCoupling::BurstCoupled),
        "RatioCoupled" => Ok(DemandCoupling::RatioCoupled),
        _ => Err(Error::Config(format!("can't resolve demand coupling: {}", config_str))),
    }
}

/// Capacity handed to the scheduler on the latest processing update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapacityShare {
    /// Compute rate per assigned core.
    pub compute: Vec<f64>,
    pub io: f64,
    pub time: f64,
}

impl CapacityShare {
    fn compute_for_cores(&self, cores: u32) -> f64 {
        self.compute.iter().take(cores as usize).sum()
    }
}

/// Active task with the cores assigned to it.
#[derive(Clone)]
pub struct ExecutionRecord {
    task: Task,
    cores: Vec<u32>,
}

impl ExecutionRecord {
    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn cores(&self) -> &[u32] {
        &self.cores
    }
}

#[derive(Clone)]
struct RequestedDemand {
    time: f64,
    compute: Vec<f64>,
    io: f64,
}

#[derive(Clone, Copy)]
struct VmCapacity {
    core_compute: f64,
    cores: u32,
    io_capacity: f64,
}

impl VmCapacity {
    fn total_compute(&self) -> f64 {
        self.core_compute * self.cores as f64
    }

    fn allocated_compute(&self, task: &Task, time: f64, share: &CapacityShare) -> f64 {
        let requested = task.compute_utilization(time) * self.total_compute();
        requested.min(share.compute_for_cores(task.cores()))
    }

    fn allocated_io(&self, task: &Task, time: f64, share: &CapacityShare) -> f64 {
        let requested = task.io_utilization(time) * self.io_capacity;
        requested.min(share.io)
    }

    /// Time of completion of the slower dimension. A dimension with no allocation is treated as progressing at unit
    /// rate. I/O rates up to 1 op/s are treated the same way.
    fn estimate_finish_time(&self, task: &Task, time: f64, share: &CapacityShare) -> f64 {
        let compute_time = time_to_finish(
            task.remaining_compute() as f64,
            self.allocated_compute(task, time, share),
            0.,
        );
        let io_time = time_to_finish(task.remaining_io() as f64, self.allocated_io(task, time, share), 1.);
        time + compute_time.max(io_time)
    }
}

fn time_to_finish(remaining: f64, rate: f64, stall_rate: f64) -> f64 {
    if remaining <= 0. {
        0.
    } else if rate > stall_rate {
        remaining / rate
    } else {
        remaining
    }
}

// IMPLEMENTATION ------------------------------------------------------------------------------------------------------

/// Runs tasks of a single VM, sharing the VM compute and I/O capacity handed down by the host.
///
/// Every processing update advances both progress counters of each task with the rates allocated at the previous
/// update, retires tasks whose both dimensions are done and returns the earliest predicted finish time.
pub struct TaskScheduler {
    vm_id: u32,
    host_id: Option<u32>,
    coupling: DemandCoupling,
    capacity: VmCapacity,
    running: Vec<ExecutionRecord>,
    finished: Vec<Task>,
    previous_time: f64,
    share: CapacityShare,
    requested: RefCell<Option<RequestedDemand>>,
    ctx: SimulationContext,
}

impl TaskScheduler {
    pub fn new(
        vm_id: u32,
        coupling: DemandCoupling,
        core_compute: f64,
        cores: u32,
        io_capacity: f64,
        ctx: SimulationContext,
    ) -> Result<Self> {
        if core_compute <= 0. {
            return Err(Error::invalid_parameter("core_compute", core_compute));
        }
        if cores == 0 {
            return Err(Error::invalid_parameter("cores", 0.));
        }
        if io_capacity < 0. {
            return Err(Error::invalid_parameter("io_capacity", io_capacity));
        }
        Ok(Self {
            vm_id,
            host_id: None,
            coupling,
            capacity: VmCapacity {
                core_compute,
                cores,
                io_capacity,
            },
            running: Vec::new(),
            finished: Vec::new(),
            previous_time: 0.,
            share: CapacityShare::default(),
            requested: RefCell::new(None),
            ctx,
        })
    }

    /// Accepts a task for execution and returns its predicted finish time based on the latest capacity share.
    pub fn submit(&mut self, mut task: Task) -> Result<f64> {
        if !self.coupling.accepts(task.io_model()) {
            return Err(Error::IncompatibleIoModel { task_id: task.id() });
        }
        task.set_status(TaskStatus::Running);
        // the I/O model must be configured before anything queries it at this time
        let compute_utilization = task.compute_model().utilization(self.previous_time);
        self.coupling.on_submit(
            task.io_model_mut(),
            compute_utilization,
            self.capacity.total_compute(),
            self.capacity.io_capacity,
        );
        let estimate = self
            .capacity
            .estimate_finish_time(&task, self.previous_time, &self.share)
            .max(self.previous_time + MIN_FORWARD_PROGRESS);
        log_debug!(
            self.ctx,
            "task #{} submitted to vm #{}, expected to finish at {:.3}",
            task.id(),
            self.vm_id,
            estimate
        );
        let cores = (0..task.cores()).collect();
        self.running.push(ExecutionRecord { task, cores });
        self.requested.replace(None);
        Ok(estimate)
    }

    /// Advances all tasks to `current_time` and stores the new capacity share.
    ///
    /// Returns the earliest predicted finish time of the remaining tasks, or zero if no task remains.
    pub fn update_processing(&mut self, current_time: f64, compute_share: &[f64], io_share: f64) -> f64 {
        let previous_time = self.previous_time;
        let timespan = current_time - previous_time;
        let capacity = self.capacity;
        let coupling = self.coupling;
        self.share = CapacityShare {
            compute: compute_share.to_vec(),
            io: io_share,
            time: current_time,
        };

        let mut next_event = f64::MAX;
        for record in self.running.iter_mut() {
            let task = &mut record.task;
            let allocated_compute = capacity.allocated_compute(task, previous_time, &self.share);
            let allocated_io = capacity.allocated_io(task, previous_time, &self.share);

            task.add_io_progress((timespan * allocated_io) as u64);
            let compute_done = timespan * allocated_compute * MILLION;
            task.add_compute_progress(compute_done as u64);

            if task.is_compute_finished() {
                task.finish_compute();
            }
            if task.is_io_finished() {
                task.finish_io();
            } else {
                let compute_utilization = task.compute_utilization(current_time);
                let allocated_now = capacity.allocated_compute(task, current_time, &self.share);
                coupling.on_progress(
                    task.io_model_mut(),
                    compute_done / MILLION,
                    compute_utilization,
                    allocated_now,
                );
            }

            self.ctx.log_task_utilization(TaskUtilizationEntry {
                time: current_time,
                host_id: self.host_id,
                vm_id: self.vm_id,
                task_id: task.id(),
                io_share,
                remaining_io: task.remaining_io(),
                io_utilization: task.io_utilization(current_time),
                remaining_compute: task.remaining_compute(),
                compute_utilization: task.compute_utilization(current_time),
            });

            if task.is_compute_finished() && task.is_io_finished() {
                continue;
            }
            let estimate = capacity
                .estimate_finish_time(task, current_time, &self.share)
                .max(current_time + MIN_FORWARD_PROGRESS);
            next_event = next_event.min(estimate);
        }

        let (done, active): (Vec<_>, Vec<_>) = std::mem::take(&mut self.running)
            .into_iter()
            .partition(|record| record.task.is_compute_finished() && record.task.is_io_finished());
        self.running = active;
        for record in done {
            let mut task = record.task;
            task.finalize(current_time);
            log_debug!(self.ctx, "task #{} finished on vm #{}", task.id(), self.vm_id);
            self.finished.push(task);
        }

        self.previous_time = current_time;
        if self.running.is_empty() {
            return 0.;
        }
        log_trace!(
            self.ctx,
            "vm #{}: {} running tasks, next event at {:.3}",
            self.vm_id,
            self.running.len(),
            next_event
        );
        next_event
    }

    pub fn total_utilization_of_compute(&self, time: f64) -> f64 {
        self.running.iter().map(|r| r.task.compute_utilization(time)).sum()
    }

    pub fn total_utilization_of_io(&self, time: f64) -> f64 {
        self.running.iter().map(|r| r.task.io_utilization(time)).sum()
    }

    /// Time left after `time` until the last running task is predicted to finish, given the latest capacity share.
    pub fn time_to_completion(&self, time: f64) -> f64 {
        let last_finish = self
            .running
            .iter()
            .map(|r| self.capacity.estimate_finish_time(&r.task, self.previous_time, &self.share))
            .fold(time, f64::max);
        last_finish - time
    }

    fn requested_demand(&self) -> RequestedDemand {
        if let Some(demand) = self.requested.borrow().as_ref() {
            if demand.time == self.previous_time {
                return demand.clone();
            }
        }
        let total = self.total_utilization_of_compute(self.previous_time) * self.capacity.total_compute();
        let per_core = total / self.capacity.cores as f64;
        let demand = RequestedDemand {
            time: self.previous_time,
            compute: vec![per_core; self.capacity.cores as usize],
            io: self.total_utilization_of_io(self.previous_time) * self.capacity.io_capacity,
        };
        self.requested.replace(Some(demand.clone()));
        demand
    }

    /// Compute rate requested per core at the latest processing time.
    pub fn current_requested_compute(&self) -> Vec<f64> {
        self.requested_demand().compute
    }

    pub fn current_requested_total_compute(&self) -> f64 {
        self.requested_demand().compute.iter().sum()
    }

    pub fn current_requested_io(&self) -> f64 {
        self.requested_demand().io
    }

    pub fn vm_id(&self) -> u32 {
        self.vm_id
    }

    pub fn host_id(&self) -> Option<u32> {
        self.host_id
    }

    pub fn set_host_id(&mut self, host_id: Option<u32>) {
        self.host_id = host_id;
    }

    pub fn coupling(&self) -> DemandCoupling {
        self.coupling
    }

    pub fn previous_time(&self) -> f64 {
        self.previous_time
    }

    pub fn capacity_share(&self) -> &CapacityShare {
        &self.share
    }

    pub fn core_compute(&self) -> f64 {
        self.capacity.core_compute
    }

    pub fn cores(&self) -> u32 {
        self.capacity.cores
    }

    pub fn total_compute(&self) -> f64 {
        self.capacity.total_compute()
    }

    pub fn io_capacity(&self) -> f64 {
        self.capacity.io_capacity
    }

    pub fn records(&self) -> &[ExecutionRecord] {
        &self.running
    }

    pub fn running_tasks(&self) -> impl Iterator<Item = &Task> {
        self.running.iter().map(|r| &r.task)
    }

    pub fn finished_tasks(&self) -> &[Task] {
        &self.finished
    }

    pub fn take_finished_tasks(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.finished)
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }
}
