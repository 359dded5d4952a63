mod common;
use common::{ratio_task, run_context};

use approx::assert_abs_diff_eq;

use dslab_iops::core::task::{Task, TaskStatus, MILLION};
use dslab_iops::core::task_scheduler::{
    demand_coupling_resolver, DemandCoupling, TaskScheduler, MIN_FORWARD_PROGRESS,
};
use dslab_iops::core::utilization_model::{ConstantUtilization, StochasticUtilization};
use dslab_iops::core::utilization_models::burst_coupled::IoBurstUtilization;
use dslab_iops::core::utilization_models::io_gated_compute::IoGatedComputeUtilization;
use dslab_iops::core::utilization_models::ratio_coupled::IoRatioUtilization;
use dslab_iops::core::utilization_models::TaskIoModel;
use dslab_iops::Error;

fn scheduler(coupling: DemandCoupling, core_compute: f64, cores: u32, io_capacity: f64) -> TaskScheduler {
    let run = run_context();
    TaskScheduler::new(0, coupling, core_compute, cores, io_capacity, run.create_context("vm-0")).unwrap()
}

#[test]
// VM with a single 1000 MIPS core and 100 IOPS runs a task with 2000 MI and 100 I/O operations.
// Compute demand is full, I/O demand is 1000 * 0.1 / 100 = 100% of VM I/O capacity.
// I/O finishes after the first second, compute after the second one.
fn test_io_finishes_before_compute() {
    let mut scheduler = scheduler(DemandCoupling::RatioCoupled, 1000., 1, 100.);
    scheduler.submit(ratio_task(1, 2000, 100, 0.1)).unwrap();

    let next = scheduler.update_processing(0., &[1000.], 100.);
    assert_abs_diff_eq!(next, 2., epsilon = 1e-9);

    let next = scheduler.update_processing(1., &[1000.], 100.);
    let task = scheduler.running_tasks().next().unwrap();
    assert_eq!(task.remaining_io(), 0);
    assert_eq!(task.remaining_compute(), 1000);
    assert_eq!(task.status(), TaskStatus::Running);
    assert!(task.io_model().is_finished());
    assert_abs_diff_eq!(next, 2., epsilon = 1e-9);

    // only compute progress is accrued now
    assert_eq!(scheduler.current_requested_io(), 0.);

    let next = scheduler.update_processing(2., &[1000.], 100.);
    assert_eq!(next, 0.);
    assert!(scheduler.is_empty());
    let finished = scheduler.finished_tasks();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].status(), TaskStatus::Finished);
    assert_eq!(finished[0].finish_time(), Some(2.));
    assert_eq!(finished[0].compute_done(), 2000 * MILLION as u64);
}

#[test]
// A task whose compute is finished keeps running while it still has I/O to do.
fn test_dual_completion() {
    let mut scheduler = scheduler(DemandCoupling::RatioCoupled, 1000., 1, 100.);
    // 100 MI of compute and 300 operations at 100 IOPS
    scheduler.submit(ratio_task(1, 100, 300, 0.1)).unwrap();
    scheduler.update_processing(0., &[1000.], 100.);

    scheduler.update_processing(1., &[1000.], 100.);
    let task = scheduler.running_tasks().next().unwrap();
    assert_eq!(task.remaining_compute(), 0);
    assert_eq!(task.remaining_io(), 200);

    // compute demand is gone, so does the I/O demand coupled to it, and the task stalls on I/O
    scheduler.update_processing(2., &[1000.], 100.);
    assert_eq!(scheduler.running_tasks().count(), 1);
    assert!(scheduler.finished_tasks().is_empty());
}

#[test]
fn test_forward_progress() {
    let mut scheduler = scheduler(DemandCoupling::RatioCoupled, 1000., 1, 100.);
    scheduler.submit(ratio_task(1, 1, 1, 0.1)).unwrap();
    scheduler.submit(ratio_task(2, 5000, 0, 0.1)).unwrap();
    scheduler.update_processing(0., &[1000.], 100.);

    // task 1 would finish almost immediately, but the estimate is never closer than the minimal step
    let next = scheduler.update_processing(0.5, &[1000.], 100.);
    assert!(next >= 0.5 + MIN_FORWARD_PROGRESS);

    let next = scheduler.update_processing(0.55, &[0.], 0.);
    assert!(next >= 0.55 + MIN_FORWARD_PROGRESS);
}

#[test]
// With zero allocation a remaining dimension is treated as stalled, not as infinite or instant completion.
fn test_zero_allocation_is_stalled() {
    let mut scheduler = scheduler(DemandCoupling::RatioCoupled, 1000., 1, 100.);
    let estimate = scheduler.submit(ratio_task(1, 2000, 100, 0.1)).unwrap();
    assert!(estimate.is_finite());
    assert!(estimate >= MIN_FORWARD_PROGRESS);

    let next = scheduler.update_processing(0., &[0.], 0.);
    assert!(next.is_finite());
    assert_abs_diff_eq!(next, 2000., epsilon = 1e-9);
}

#[test]
fn test_monotonic_progress() {
    let mut scheduler = scheduler(DemandCoupling::RatioCoupled, 500., 2, 80.);
    let task = Task::new(
        1,
        3000,
        400,
        2,
        Box::new(StochasticUtilization::new(11)),
        TaskIoModel::RatioCoupled(IoRatioUtilization::new(0.05).unwrap()),
    );
    scheduler.submit(task).unwrap();

    let mut compute_done = 0;
    let mut io_done = 0;
    let mut time = 0.;
    while time < 100. {
        scheduler.update_processing(time, &[500., 500.], 80.);
        if let Some(task) = scheduler.running_tasks().next() {
            assert!(task.compute_done() >= compute_done);
            assert!(task.io_done() >= io_done);
            assert!(task.compute_done() <= task.compute_length() * MILLION as u64);
            assert!(task.io_done() <= task.io_length());
            compute_done = task.compute_done();
            io_done = task.io_done();
        }
        time += 0.7;
    }
}

#[test]
fn test_requested_demand() {
    let mut scheduler = scheduler(DemandCoupling::RatioCoupled, 1000., 2, 100.);
    scheduler.submit(ratio_task(1, 2000, 100, 0.025)).unwrap();
    // full compute of the task over two cores, I/O is 2000 * 0.025 / 100 = 50%
    assert_eq!(scheduler.current_requested_compute(), vec![1000., 1000.]);
    assert_abs_diff_eq!(scheduler.current_requested_io(), 50., epsilon = 1e-9);

    // submit invalidates cached demand
    scheduler.submit(ratio_task(2, 2000, 100, 0.025)).unwrap();
    assert_eq!(scheduler.current_requested_compute(), vec![2000., 2000.]);
    assert_abs_diff_eq!(scheduler.current_requested_total_compute(), 4000., epsilon = 1e-9);
}

#[test]
fn test_incompatible_io_model() {
    let mut scheduler = scheduler(DemandCoupling::BurstCoupled, 1000., 1, 100.);
    let result = scheduler.submit(ratio_task(3, 100, 100, 0.1));
    assert!(matches!(result, Err(Error::IncompatibleIoModel { task_id: 3 })));
    assert!(scheduler.is_empty());

    let burst = IoBurstUtilization::new(Box::new(ConstantUtilization::full()), 0.05, 0.3).unwrap();
    let task = Task::new(
        4,
        100,
        100,
        1,
        Box::new(ConstantUtilization::full()),
        TaskIoModel::BurstCoupled(burst),
    );
    assert!(scheduler.submit(task).is_ok());
}

#[test]
// Burst-coupled tasks progress on both dimensions and eventually finish.
fn test_burst_coupled_task_finishes() {
    let mut scheduler = scheduler(DemandCoupling::BurstCoupled, 1000., 1, 100.);
    let burst = IoBurstUtilization::new(Box::new(ConstantUtilization::full()), 0.5, 0.5).unwrap();
    let task = Task::new(1, 100, 50, 1, Box::new(ConstantUtilization::full()), TaskIoModel::BurstCoupled(burst));
    scheduler.submit(task).unwrap();

    let mut time = 0.;
    let mut next = scheduler.update_processing(time, &[1000.], 100.);
    while next > 0. && time < 10000. {
        time = next;
        next = scheduler.update_processing(time, &[1000.], 100.);
    }
    assert!(scheduler.is_empty());
    assert_eq!(scheduler.finished_tasks()[0].io_done(), 50);
}

#[test]
fn test_demand_coupling_resolver() {
    assert_eq!(
        demand_coupling_resolver("BurstCoupled[a=0.1,b=0.2]").unwrap(),
        DemandCoupling::BurstCoupled
    );
    assert_eq!(demand_coupling_resolver("RatioCoupled").unwrap(), DemandCoupling::RatioCoupled);
    assert!(demand_coupling_resolver("Fancy").is_err());
}

#[test]
// Compute model gated by I/O with a cutoff that is never exceeded behaves exactly like the plain model,
// including the I/O demand at the submission time.
fn test_gated_task_submit() {
    let gated_task = Task::new(
        1,
        2000,
        100,
        1,
        Box::new(IoGatedComputeUtilization::new(Box::new(ConstantUtilization::full()), 1., 0.5).unwrap()),
        TaskIoModel::RatioCoupled(IoRatioUtilization::new(0.1).unwrap()),
    );
    let mut plain = scheduler(DemandCoupling::RatioCoupled, 1000., 1, 100.);
    let mut gated = scheduler(DemandCoupling::RatioCoupled, 1000., 1, 100.);
    plain.update_processing(0., &[1000.], 100.);
    gated.update_processing(0., &[1000.], 100.);

    let plain_estimate = plain.submit(ratio_task(1, 2000, 100, 0.1)).unwrap();
    let gated_estimate = gated.submit(gated_task).unwrap();
    assert_abs_diff_eq!(plain_estimate, 2., epsilon = 1e-9);
    assert_abs_diff_eq!(gated_estimate, plain_estimate, epsilon = 1e-9);
    assert_eq!(gated.current_requested_io(), 100.);

    plain.update_processing(1., &[1000.], 100.);
    gated.update_processing(1., &[1000.], 100.);
    let plain_task = plain.running_tasks().next().unwrap();
    let gated_task = gated.running_tasks().next().unwrap();
    assert_eq!(plain_task.io_done(), 100);
    assert_eq!(gated_task.io_done(), plain_task.io_done());
    assert_eq!(gated_task.remaining_compute(), 1000);
}

#[test]
// Lengths near the integer limit saturate instead of overflowing.
fn test_huge_compute_length() {
    let mut scheduler = scheduler(DemandCoupling::RatioCoupled, 1000., 1, 100.);
    let task = ratio_task(0, u64::MAX / 2, 100, 0.1);
    let full_length = u64::MAX / MILLION as u64;
    assert_eq!(task.remaining_compute(), full_length);
    scheduler.submit(task).unwrap();

    scheduler.update_processing(1., &[1000.], 100.);
    let task = scheduler.running_tasks().next().unwrap();
    assert!(task.is_io_finished());
    assert!(!task.is_compute_finished());
    assert_eq!(task.remaining_compute(), full_length - 1000);
}
