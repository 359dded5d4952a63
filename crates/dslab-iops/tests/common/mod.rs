#![allow(dead_code)]

use dslab_iops::core::core_allocation_policies::proportional_share::ProportionalShare;
use dslab_iops::core::host::Host;
use dslab_iops::core::io_provisioner::SimpleIoProvisioner;
use dslab_iops::core::logger::FileLogger;
use dslab_iops::core::task::Task;
use dslab_iops::core::task_scheduler::{DemandCoupling, TaskScheduler};
use dslab_iops::core::utilization_model::ConstantUtilization;
use dslab_iops::core::utilization_models::ratio_coupled::IoRatioUtilization;
use dslab_iops::core::utilization_models::TaskIoModel;
use dslab_iops::core::vm::Vm;
use dslab_iops::core::vm_scheduler::VmScheduler;
use dslab_iops::log::Level;
use dslab_iops::RunContext;

pub fn run_context() -> RunContext {
    RunContext::new(Box::new(FileLogger::with_level(Level::Trace)))
}

/// Task with full compute demand and I/O demand following it with the given ratio.
pub fn ratio_task(id: u32, compute_length: u64, io_length: u64, iops_per_mips: f64) -> Task {
    Task::new(
        id,
        compute_length,
        io_length,
        1,
        Box::new(ConstantUtilization::full()),
        TaskIoModel::RatioCoupled(IoRatioUtilization::new(iops_per_mips).unwrap()),
    )
}

pub fn ratio_vm(run: &RunContext, id: u32, core_compute: f64, cores: u32, io_capacity: f64) -> Vm {
    let scheduler = TaskScheduler::new(
        id,
        DemandCoupling::RatioCoupled,
        core_compute,
        cores,
        io_capacity,
        run.create_context(format!("vm-{}", id)),
    )
    .unwrap();
    Vm::new(id, 0, scheduler, 1., 30)
}

pub fn host(run: &RunContext, id: u32, cores: Vec<f64>, io_capacity: f64, io_bandwidth: u64) -> Host {
    let vm_scheduler = VmScheduler::new(
        cores,
        io_capacity,
        Box::new(ProportionalShare::new()),
        run.create_context(format!("host-{}-vm-scheduler", id)),
    )
    .unwrap();
    Host::new(
        id,
        vm_scheduler,
        Box::new(SimpleIoProvisioner::new(io_bandwidth)),
        run.create_context(format!("host-{}", id)),
    )
}

/// Unique path in the temp directory for files written by a test.
pub fn temp_path(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("dslab-iops-{}-{}", std::process::id(), name))
        .to_str()
        .unwrap()
        .to_string()
}

/// Saves the run log and returns its CSV content.
pub fn saved_log(run: &RunContext, name: &str) -> String {
    let path = temp_path(name);
    run.logger().borrow().save_log(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    content
}
