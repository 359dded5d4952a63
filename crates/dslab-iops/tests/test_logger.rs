mod common;
use common::{host, ratio_task, ratio_vm, saved_log, temp_path};

use dslab_iops::core::logger::{FileLogger, Logger, StdoutLogger};
use dslab_iops::core::migration_policy::{MigrationPlan, MigrationPolicy, MigrationReason};
use dslab_iops::core::overload_detectors::static_threshold::StaticThreshold;
use dslab_iops::core::vm_selection_policies::minimum_utilization::MinimumUtilization;
use dslab_iops::log::Level;
use dslab_iops::{log_debug, log_info, log_warn, RunContext};

#[test]
fn test_file_logger_level() {
    let run = RunContext::new(Box::new(FileLogger::with_level(Level::Info)));
    let ctx = run.create_context("component");
    run.set_time(5.);
    log_info!(ctx, "visible {}", 1);
    log_debug!(ctx, "hidden");
    run.set_time(6.);
    log_warn!(ctx, "warning");

    let content = saved_log(&run, "log.csv");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "timestamp,component,level,message");
    assert!(lines[1].ends_with(",component,INFO,visible 1"));
    assert!(lines[2].ends_with(",component,WARN,warning"));
}

#[test]
// Every processing update of a running task produces one utilization row.
fn test_task_utilization_rows() {
    let run = RunContext::new(Box::new(FileLogger::new()));
    let mut host = host(&run, 0, vec![1000.], 100., 100);
    let mut vm = ratio_vm(&run, 0, 1000., 1, 100.);
    vm.submit(ratio_task(0, 5000, 100, 0.1)).unwrap();
    host.add_vm(vm).unwrap();
    for time in [1., 2., 3.] {
        run.set_time(time);
        host.update_processing(time);
    }

    let path = temp_path("task-utilization.csv");
    run.logger().borrow().save_task_utilization(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("time,host_id,vm_id,task_id"));
    assert!(lines[1].starts_with("1.0,0,0,0,"));
}

fn saved_rows<F>(run: &RunContext, name: &str, save: F) -> Vec<String>
where
    F: Fn(&dyn Logger, &str) -> dslab_iops::Result<()>,
{
    let path = temp_path(name);
    save(run.logger().borrow().as_ref(), &path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    content.lines().map(|line| line.to_string()).collect()
}

#[test]
fn test_host_utilization_rows() {
    let run = RunContext::new(Box::new(FileLogger::new()));
    let mut busy = host(&run, 0, vec![1000.], 100., 100);
    let mut idle = host(&run, 1, vec![1000.], 200., 100);
    let mut vm = ratio_vm(&run, 0, 1000., 1, 100.);
    vm.submit(ratio_task(0, 5000, 100, 0.1)).unwrap();
    busy.add_vm(vm).unwrap();
    for time in [1., 2.] {
        run.set_time(time);
        busy.update_processing(time);
        idle.update_processing(time);
    }

    let lines = saved_rows(&run, "host-utilization.csv", |logger, path| logger.save_host_utilization(path));
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "time,host_id,io_utilization,io_unutilized,compute_utilization");
    // an initializing VM takes the whole I/O capacity of the host
    assert!(lines[1].starts_with("1.0,0,"));
    assert_eq!(lines[1].split(',').nth(3), Some("0"));
    assert_eq!(lines[2], "1.0,1,0.0,200,0.0");
    assert_eq!(lines[4], "2.0,1,0.0,200,0.0");
}

#[test]
fn test_migration_rows() {
    let run = RunContext::new(Box::new(FileLogger::new()));
    let policy = MigrationPolicy::new(
        Box::new(StaticThreshold::new(0.8, 0.8).unwrap()),
        Box::new(MinimumUtilization::new()),
        0.5,
        0.5,
        0.2,
        run.create_context("migration-policy"),
    )
    .unwrap();
    let mut hosts = vec![
        host(&run, 0, vec![1000., 1000.], 200., 100),
        host(&run, 1, vec![1000., 1000.], 200., 100),
        host(&run, 2, vec![1000.], 200., 100),
    ];
    let mut busy = ratio_vm(&run, 1, 1000., 1, 100.);
    busy.submit(ratio_task(0, 5000, 100, 0.1)).unwrap();
    hosts[0].add_vm(busy).unwrap();
    hosts[0].add_vm(ratio_vm(&run, 2, 1000., 1, 100.)).unwrap();
    run.set_time(1.);
    hosts[0].update_processing(1.);

    let plans = vec![
        MigrationPlan {
            vm_id: 1,
            source_host: 0,
            target_host: 1,
            reason: MigrationReason::Overload,
        },
        // not on the source host
        MigrationPlan {
            vm_id: 2,
            source_host: 1,
            target_host: 2,
            reason: MigrationReason::Consolidation,
        },
    ];
    let report = policy.perform_migrations(&mut hosts, &plans);
    assert_eq!(report.performed, 1);
    assert_eq!(report.failed, vec![plans[1].clone()]);

    let lines = saved_rows(&run, "migrations.csv", |logger, path| logger.save_migrations(path));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "time,vm_id,source_host,target_host,time_to_completion");
    assert!(lines[1].starts_with("1.0,1,0,1,"));
    let time_to_completion: f64 = lines[1].split(',').nth(4).unwrap().parse().unwrap();
    assert!(time_to_completion > 0.);
}

#[test]
fn test_stdout_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
    let run = RunContext::new(Box::new(StdoutLogger::new()));
    let ctx = run.create_context("stdout");
    log_info!(ctx, "message");

    let path = temp_path("stdout.csv");
    assert!(run.logger().borrow().save_log(&path).is_ok());
    assert!(!std::path::Path::new(&path).exists());
}
