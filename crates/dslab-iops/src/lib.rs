#![doc = include_str!("../readme.md")]

pub mod context;
pub mod core;
pub mod error;
pub mod log;

pub use crate::context::{RunContext, SimulationContext};
pub use crate::error::{Error, Result};
