//! Logging facilities.
//!
//! Messages are routed through the logger of the component context rather than a process-wide registry, so
//! several runs can coexist in one process.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};

pub use log::Level;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

/// Logs a message at the info level.
///
/// # Examples
///
/// ```rust
/// use dslab_iops::core::logger::StdoutLogger;
/// use dslab_iops::{log_info, RunContext, SimulationContext};
///
/// struct Component {
///     ctx: SimulationContext,
/// }
///
/// impl Component {
///     fn start(&self) {
///         log_info!(self.ctx, "started");
///     }
/// }
///
/// let run = RunContext::new(Box::new(StdoutLogger::new()));
/// let comp = Component { ctx: run.create_context("comp") };
/// comp.start();
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $msg:expr) => (
        $ctx.log($crate::log::Level::Info, format!("{}", $msg))
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $ctx.log($crate::log::Level::Info, format!($format, $($arg)+))
    );
}

/// Logs a message at the debug level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $msg:expr) => (
        $ctx.log($crate::log::Level::Debug, format!("{}", $msg))
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $ctx.log($crate::log::Level::Debug, format!($format, $($arg)+))
    );
}

/// Logs a message at the trace level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $msg:expr) => (
        $ctx.log($crate::log::Level::Trace, format!("{}", $msg))
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $ctx.log($crate::log::Level::Trace, format!($format, $($arg)+))
    );
}

/// Logs a message at the error level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $msg:expr) => (
        $ctx.log($crate::log::Level::Error, format!("{}", $msg))
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $ctx.log($crate::log::Level::Error, format!($format, $($arg)+))
    );
}

/// Logs a message at the warn level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $msg:expr) => (
        $ctx.log($crate::log::Level::Warn, format!("{}", $msg))
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $ctx.log($crate::log::Level::Warn, format!($format, $($arg)+))
    );
}
