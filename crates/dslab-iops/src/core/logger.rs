/// Logging facilities to record events and per-task utilization during a run.
use std::fs::File;

use colored::Color;
use log::Level;
use serde::Serialize;

use crate::context::SimulationContext;
use crate::error::Result;
use crate::log::get_colored;

/// Utilization sample of a single task, taken by the task scheduler after each processing update.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TaskUtilizationEntry {
    pub time: f64,
    pub host_id: Option<u32>,
    pub vm_id: u32,
    pub task_id: u32,
    pub io_share: f64,
    pub remaining_io: u64,
    pub io_utilization: f64,
    pub remaining_compute: u64,
    pub compute_utilization: f64,
}

/// Host-wide utilization after a processing update.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HostUtilizationEntry {
    pub time: f64,
    pub host_id: u32,
    pub io_utilization: f64,
    pub io_unutilized: u64,
    pub compute_utilization: f64,
}

/// A completed VM move between hosts.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MigrationEntry {
    pub time: f64,
    pub vm_id: u32,
    pub source_host: u32,
    pub target_host: u32,
    /// Estimated time until the last running task of the VM finishes, as of the move.
    pub time_to_completion: f64,
}

pub trait Logger {
    fn log_error(&mut self, ctx: &SimulationContext, log: String);

    fn log_warn(&mut self, ctx: &SimulationContext, log: String);

    fn log_info(&mut self, ctx: &SimulationContext, log: String);

    fn log_debug(&mut self, ctx: &SimulationContext, log: String);

    fn log_trace(&mut self, ctx: &SimulationContext, log: String);

    fn log_task_utilization(&mut self, ctx: &SimulationContext, entry: TaskUtilizationEntry);

    fn log_host_utilization(&mut self, ctx: &SimulationContext, entry: HostUtilizationEntry);

    fn log_migration(&mut self, ctx: &SimulationContext, entry: MigrationEntry);

    fn save_log(&self, _path: &str) -> Result<()>;

    fn save_task_utilization(&self, _path: &str) -> Result<()>;

    fn save_host_utilization(&self, _path: &str) -> Result<()>;

    fn save_migrations(&self, _path: &str) -> Result<()>;
}

/// Forwards messages to the `log` facade, formatted as `[time LEVEL component] message`.
#[derive(Default)]
pub struct StdoutLogger {}

impl StdoutLogger {
    pub fn new() -> Self {
        Self {}
    }
}

macro_rules! forward {
    ($level:expr, $label:expr, $color:expr, $ctx:expr, $msg:expr) => {
        log::log!(
            target: $ctx.name(),
            $level,
            "[{:.3} {} {}] {}",
            $ctx.time(),
            get_colored($label, $color),
            $ctx.name(),
            $msg
        )
    };
}

impl Logger for StdoutLogger {
    fn log_error(&mut self, ctx: &SimulationContext, log: String) {
        forward!(Level::Error, "ERROR", Color::Red, ctx, log);
    }

    fn log_warn(&mut self, ctx: &SimulationContext, log: String) {
        forward!(Level::Warn, "WARN ", Color::Yellow, ctx, log);
    }

    fn log_info(&mut self, ctx: &SimulationContext, log: String) {
        forward!(Level::Info, "INFO ", Color::Green, ctx, log);
    }

    fn log_debug(&mut self, ctx: &SimulationContext, log: String) {
        forward!(Level::Debug, "DEBUG", Color::Blue, ctx, log);
    }

    fn log_trace(&mut self, ctx: &SimulationContext, log: String) {
        forward!(Level::Trace, "TRACE", Color::Cyan, ctx, log);
    }

    fn log_task_utilization(&mut self, ctx: &SimulationContext, entry: TaskUtilizationEntry) {
        forward!(
            Level::Trace,
            "TRACE",
            Color::Cyan,
            ctx,
            format!(
                "task #{} on vm #{}: io share {:.3}, remaining io {}, io util {:.3}, remaining compute {}, compute util {:.3}",
                entry.task_id,
                entry.vm_id,
                entry.io_share,
                entry.remaining_io,
                entry.io_utilization,
                entry.remaining_compute,
                entry.compute_utilization
            )
        );
    }

    fn log_host_utilization(&mut self, ctx: &SimulationContext, entry: HostUtilizationEntry) {
        forward!(
            Level::Trace,
            "TRACE",
            Color::Cyan,
            ctx,
            format!(
                "host #{}: io util {:.3}, io unutilized {}, compute util {:.3}",
                entry.host_id, entry.io_utilization, entry.io_unutilized, entry.compute_utilization
            )
        );
    }

    fn log_migration(&mut self, ctx: &SimulationContext, entry: MigrationEntry) {
        forward!(
            Level::Debug,
            "DEBUG",
            Color::Blue,
            ctx,
            format!(
                "vm #{} migrated from host #{} to host #{}, {:.3} left to completion",
                entry.vm_id, entry.source_host, entry.target_host, entry.time_to_completion
            )
        );
    }

    fn save_log(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    fn save_task_utilization(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    fn save_host_utilization(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    fn save_migrations(&self, _path: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct LogEntry {
    pub timestamp: f64,
    pub component: String,
    pub level: String,
    pub message: String,
}

/// Keeps messages and utilization samples in memory and writes them as CSV on request.
pub struct FileLogger {
    log: Vec<LogEntry>,
    task_utilization: Vec<TaskUtilizationEntry>,
    host_utilization: Vec<HostUtilizationEntry>,
    migrations: Vec<MigrationEntry>,
    level: Level,
}

impl Default for FileLogger {
    fn default() -> Self {
        Self {
            log: Vec::new(),
            task_utilization: Vec::new(),
            host_utilization: Vec::new(),
            migrations: Vec::new(),
            level: Level::Info,
        }
    }
}

impl FileLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn task_utilization(&self) -> &[TaskUtilizationEntry] {
        &self.task_utilization
    }

    pub fn host_utilization(&self) -> &[HostUtilizationEntry] {
        &self.host_utilization
    }

    pub fn migrations(&self) -> &[MigrationEntry] {
        &self.migrations
    }

    fn log_internal(&mut self, ctx: &SimulationContext, message: String, level: Level) {
        if self.level < level {
            return;
        }
        self.log.push(LogEntry {
            timestamp: ctx.time(),
            component: ctx.name().to_string(),
            level: level.to_string(),
            message,
        });
    }
}

impl Logger for FileLogger {
    fn log_error(&mut self, ctx: &SimulationContext, log: String) {
        self.log_internal(ctx, log, Level::Error)
    }

    fn log_warn(&mut self, ctx: &SimulationContext, log: String) {
        self.log_internal(ctx, log, Level::Warn)
    }

    fn log_info(&mut self, ctx: &SimulationContext, log: String) {
        self.log_internal(ctx, log, Level::Info)
    }

    fn log_debug(&mut self, ctx: &SimulationContext, log: String) {
        self.log_internal(ctx, log, Level::Debug)
    }

    fn log_trace(&mut self, ctx: &SimulationContext, log: String) {
        self.log_internal(ctx, log, Level::Trace)
    }

    fn log_task_utilization(&mut self, _ctx: &SimulationContext, entry: TaskUtilizationEntry) {
        self.task_utilization.push(entry);
    }

    fn log_host_utilization(&mut self, _ctx: &SimulationContext, entry: HostUtilizationEntry) {
        self.host_utilization.push(entry);
    }

    fn log_migration(&mut self, _ctx: &SimulationContext, entry: MigrationEntry) {
        self.migrations.push(entry);
    }

    fn save_log(&self, path: &str) -> Result<()> {
        save_rows(path, &self.log)
    }

    fn save_task_utilization(&self, path: &str) -> Result<()> {
        save_rows(path, &self.task_utilization)
    }

    fn save_host_utilization(&self, path: &str) -> Result<()> {
        save_rows(path, &self.host_utilization)
    }

    fn save_migrations(&self, path: &str) -> Result<()> {
        save_rows(path, &self.migrations)
    }
}

fn save_rows<T: Serialize>(path: &str, rows: &[T]) -> Result<()> {
    let file = File::create(path)?;
    let mut wtr = csv::Writer::from_writer(file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
