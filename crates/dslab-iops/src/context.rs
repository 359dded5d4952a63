//! Accessing run-wide state from components.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::Level;
use sugars::{rc, refcell};

use crate::core::logger::{HostUtilizationEntry, Logger, MigrationEntry, TaskUtilizationEntry};

/// Shared handle to the logger of a run.
pub type LoggerRef = Rc<RefCell<Box<dyn Logger>>>;

/// State shared by all components of a single run: the simulated clock and the logger.
///
/// The clock is advanced by the external driver, components only read it.
#[derive(Clone)]
pub struct RunContext {
    clock: Rc<Cell<f64>>,
    logger: LoggerRef,
}

impl RunContext {
    /// Creates run state with the clock set to zero.
    pub fn new(logger: Box<dyn Logger>) -> Self {
        Self {
            clock: rc!(Cell::new(0.)),
            logger: rc!(refcell!(logger)),
        }
    }

    /// Creates a context for the component with the given name.
    pub fn create_context<S>(&self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        SimulationContext {
            name: name.as_ref().to_owned(),
            clock: self.clock.clone(),
            logger: self.logger.clone(),
        }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.clock.get()
    }

    /// Moves the simulated clock.
    pub fn set_time(&self, time: f64) {
        self.clock.set(time);
    }

    /// Returns the logger shared by all contexts of this run.
    pub fn logger(&self) -> LoggerRef {
        self.logger.clone()
    }
}

/// A facade for accessing the run state from a component.
#[derive(Clone)]
pub struct SimulationContext {
    name: String,
    clock: Rc<Cell<f64>>,
    logger: LoggerRef,
}

impl SimulationContext {
    /// Returns the name of component associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.clock.get()
    }

    /// Passes a message to the run logger. Used by the logging macros.
    pub fn log(&self, level: Level, message: String) {
        let mut logger = self.logger.borrow_mut();
        match level {
            Level::Error => logger.log_error(self, message),
            Level::Warn => logger.log_warn(self, message),
            Level::Info => logger.log_info(self, message),
            Level::Debug => logger.log_debug(self, message),
            Level::Trace => logger.log_trace(self, message),
        }
    }

    /// Passes a per-task utilization sample to the run logger.
    pub fn log_task_utilization(&self, entry: TaskUtilizationEntry) {
        self.logger.borrow_mut().log_task_utilization(self, entry);
    }

    pub fn log_host_utilization(&self, entry: HostUtilizationEntry) {
        self.logger.borrow_mut().log_host_utilization(self, entry);
    }

    pub fn log_migration(&self, entry: MigrationEntry) {
        self.logger.borrow_mut().log_migration(self, entry);
    }
}
