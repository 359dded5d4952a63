use clap::Parser;
use log::{error, info};

use dslab_iops::core::config::policy_config::PolicyConfig;
use dslab_iops::core::core_allocation_policy::core_allocation_policy_resolver;
use dslab_iops::core::host::Host;
use dslab_iops::core::io_provisioner::SimpleIoProvisioner;
use dslab_iops::core::logger::{FileLogger, Logger, StdoutLogger};
use dslab_iops::core::migration_policy::MigrationPolicy;
use dslab_iops::core::overload_detector::overload_detector_resolver;
use dslab_iops::core::task::Task;
use dslab_iops::core::task_scheduler::{demand_coupling_resolver, TaskScheduler};
use dslab_iops::core::utilization_model::utilization_model_resolver;
use dslab_iops::core::utilization_models::task_io_model_resolver;
use dslab_iops::core::vm::Vm;
use dslab_iops::core::vm_scheduler::VmScheduler;
use dslab_iops::core::vm_selection_policy::vm_selection_policy_resolver;
use dslab_iops::{log_info, Result, RunContext};

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to run config
    #[clap(short, long)]
    config: String,

    /// Time step of the run loop
    #[clap(short, long, default_value_t = 1.)]
    step: f64,

    /// Save log messages to this CSV file instead of printing them
    #[clap(long)]
    log: Option<String>,

    /// Save per-task utilization samples to this CSV file
    #[clap(long)]
    task_utilization: Option<String>,

    /// Save per-host utilization samples to this CSV file
    #[clap(long)]
    host_utilization: Option<String>,

    /// Save performed migrations to this CSV file
    #[clap(long)]
    migrations: Option<String>,

    /// Save overload decisions to this CSV file
    #[clap(long)]
    decisions: Option<String>,
}

fn build_hosts(run: &RunContext, config: &PolicyConfig) -> Result<Vec<Host>> {
    let mut hosts = Vec::new();
    for host_config in config.hosts.iter() {
        for _ in 0..host_config.count.unwrap_or(1) {
            let id = hosts.len() as u32;
            let vm_scheduler = VmScheduler::new(
                vec![host_config.core_compute; host_config.cores as usize],
                host_config.io_capacity,
                core_allocation_policy_resolver(&config.core_allocation)?,
                run.create_context(format!("host-{}-vm-scheduler", id)),
            )?;
            hosts.push(Host::new(
                id,
                vm_scheduler,
                Box::new(SimpleIoProvisioner::new(host_config.io_bandwidth)),
                run.create_context(format!("host-{}", id)),
            ));
        }
    }
    Ok(hosts)
}

fn build_vms(run: &RunContext, config: &PolicyConfig) -> Result<Vec<Vm>> {
    let coupling = demand_coupling_resolver(&config.task_coupling)?;
    let mut vms = Vec::new();
    for vm_config in config.vms.iter() {
        for _ in 0..vm_config.count.unwrap_or(1) {
            let id = vms.len() as u32;
            let scheduler = TaskScheduler::new(
                id,
                coupling,
                vm_config.core_compute,
                vm_config.cores,
                vm_config.io_capacity,
                run.create_context(format!("vm-{}", id)),
            )?;
            vms.push(Vm::new(
                id,
                vm_config.io_bandwidth,
                scheduler,
                config.scheduling_interval,
                config.history_length,
            )
            .with_memory(vm_config.memory.unwrap_or(0)));
        }
    }
    Ok(vms)
}

/// Spreads tasks over VMs round-robin.
fn submit_tasks(config: &PolicyConfig, vms: &mut [Vm]) -> Result<usize> {
    if vms.is_empty() {
        return Ok(0);
    }
    let mut task_id = 0;
    for task_config in config.tasks.iter() {
        let model_str = task_config.compute_model.as_deref().unwrap_or("Full");
        for _ in 0..task_config.count.unwrap_or(1) {
            let compute_model = utilization_model_resolver(model_str)?;
            let io_model = task_io_model_resolver(&config.task_coupling, compute_model.as_ref())?;
            let task = Task::new(
                task_id,
                task_config.compute_length,
                task_config.io_length,
                task_config.cores.unwrap_or(1),
                compute_model,
                io_model,
            );
            let vm_count = vms.len();
            vms[task_id as usize % vm_count].submit(task)?;
            task_id += 1;
        }
    }
    Ok(task_id as usize)
}

/// Places VMs round-robin, trying the following hosts when the preferred one rejects the VM.
fn place_vms(run: &RunContext, hosts: &mut [Host], vms: Vec<Vm>) -> usize {
    let ctx = run.create_context("placement");
    let mut placed = 0;
    for (i, vm) in vms.into_iter().enumerate() {
        let mut vm = Some(vm);
        for offset in 0..hosts.len() {
            let host = &mut hosts[(i + offset) % hosts.len()];
            if let Some(candidate) = vm.take() {
                match host.add_vm(candidate) {
                    Ok(()) => {
                        placed += 1;
                        break;
                    }
                    Err(rejected) => vm = Some(rejected.vm),
                }
            }
        }
        if let Some(vm) = vm {
            log_info!(ctx, "vm #{} was not placed on any host", vm.id);
        }
    }
    placed
}

fn is_finished(hosts: &[Host]) -> bool {
    hosts.iter().all(|host| host.vms().all(|vm| vm.scheduler().is_empty()))
}

fn run(args: &Args) -> Result<()> {
    let config = PolicyConfig::from_file(&args.config)?;
    let logger: Box<dyn Logger> = if args.log.is_some()
        || args.task_utilization.is_some()
        || args.host_utilization.is_some()
        || args.migrations.is_some()
    {
        Box::new(FileLogger::new())
    } else {
        Box::new(StdoutLogger::new())
    };
    let run = RunContext::new(logger);

    let mut hosts = build_hosts(&run, &config)?;
    let mut vms = build_vms(&run, &config)?;
    let task_count = submit_tasks(&config, &mut vms)?;
    let vm_count = vms.len();
    let placed = place_vms(&run, &mut hosts, vms);
    info!("placed {} of {} vms, submitted {} tasks", placed, vm_count, task_count);

    let mut policy = MigrationPolicy::new(
        overload_detector_resolver(&config.overload_detector, config.compute_weight, config.io_weight)?,
        vm_selection_policy_resolver(&config.vm_selection, config.compute_weight, config.io_weight)?,
        config.compute_weight,
        config.io_weight,
        config.underload_threshold,
        run.create_context("migration-policy"),
    )?;

    let mut time = 0.;
    let mut next_evaluation = config.scheduling_interval;
    let mut migrations = 0;
    let mut failed_migrations = 0;
    let mut stranded = Vec::new();
    while time < config.simulation_length {
        time = (time + args.step).min(config.simulation_length);
        run.set_time(time);
        for host in hosts.iter_mut() {
            host.update_processing(time);
        }
        if time >= next_evaluation {
            let snapshots: Vec<_> = hosts.iter().map(|host| host.snapshot(time)).collect();
            let plans = policy.plan_migrations(&snapshots);
            if !plans.is_empty() {
                let report = policy.perform_migrations(&mut hosts, &plans);
                migrations += report.performed;
                failed_migrations += report.failed.len();
                stranded.extend(report.stranded);
            }
            next_evaluation += config.scheduling_interval;
        }
        if is_finished(&hosts) {
            break;
        }
    }

    let finished: usize = hosts
        .iter()
        .flat_map(|host| host.vms())
        .map(|vm| vm.scheduler().finished_tasks().len())
        .sum();
    info!("run finished at {:.1}", time);
    info!("finished tasks: {} of {}", finished, task_count);
    info!("migrations: {} performed, {} failed", migrations, failed_migrations);
    for host in hosts.iter() {
        info!(
            "host #{}: {} vms, compute utilization {:.3}, io utilization {:.3}",
            host.id,
            host.vm_count(),
            host.compute_utilization(),
            host.io_utilization()
        );
    }
    if !stranded.is_empty() {
        error!("{} vms were left without a host", stranded.len());
    }

    if let Some(path) = &args.decisions {
        policy.decision_history().save(path)?;
    }
    if let Some(path) = &args.log {
        run.logger().borrow().save_log(path)?;
    }
    if let Some(path) = &args.task_utilization {
        run.logger().borrow().save_task_utilization(path)?;
    }
    if let Some(path) = &args.host_utilization {
        run.logger().borrow().save_host_utilization(path)?;
    }
    if let Some(path) = &args.migrations {
        run.logger().borrow().save_migrations(path)?;
    }
    Ok(())
}

fn main() {
    init_logger();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
