//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::core::utilization_history::HISTORY_LENGTH;
use crate::error::{Error, Result};

/// Holds raw run config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawPolicyConfig {
    pub scheduling_interval: Option<f64>,
    pub simulation_length: Option<f64>,
    pub history_length: Option<usize>,
    pub overload_detector: Option<String>,
    pub vm_selection: Option<String>,
    pub core_allocation: Option<String>,
    pub task_coupling: Option<String>,
    pub compute_weight: Option<f64>,
    pub io_weight: Option<f64>,
    pub underload_threshold: Option<f64>,
    pub hosts: Option<Vec<HostConfig>>,
    pub vms: Option<Vec<VmConfig>>,
    pub tasks: Option<Vec<TaskConfig>>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Number of cores.
    pub cores: u32,
    /// Compute capacity of a single core in MIPS.
    pub core_compute: f64,
    /// I/O capacity shared between VMs in IOPS.
    pub io_capacity: f64,
    /// Flat I/O bandwidth granted to VMs on admission.
    pub io_bandwidth: u64,
    /// Number of such hosts.
    pub count: Option<u32>,
}

/// Holds configuration of a single VM or a set of identical VMs.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct VmConfig {
    pub cores: u32,
    pub core_compute: f64,
    pub io_capacity: f64,
    pub io_bandwidth: u64,
    /// Memory copied on migration, defines the migration time together with `io_bandwidth`.
    pub memory: Option<u64>,
    pub count: Option<u32>,
}

/// Holds configuration of a task or a set of identical tasks, spread over VMs round-robin.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct TaskConfig {
    /// Compute length in MI.
    pub compute_length: u64,
    /// I/O length in operations.
    pub io_length: u64,
    pub cores: Option<u32>,
    /// Compute utilization model, see `utilization_model_resolver`.
    pub compute_model: Option<String>,
    pub count: Option<u32>,
}

/// Represents run configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PolicyConfig {
    /// Interval in seconds between migration policy evaluations and history samples.
    pub scheduling_interval: f64,
    /// Length of run in seconds.
    pub simulation_length: f64,
    /// Number of samples kept in utilization histories.
    pub history_length: usize,
    /// Overload detector, e.g. `InterQuartileRange[safety=1.5]`.
    pub overload_detector: String,
    /// VM selection policy, e.g. `MaximumWeightedUtilization`.
    pub vm_selection: String,
    /// Core allocation policy, `ProportionalShare` or `BestFit`.
    pub core_allocation: String,
    /// Task I/O model and scheduler coupling, e.g. `BurstCoupled[a=0.05,b=0.3]`.
    pub task_coupling: String,
    pub compute_weight: f64,
    pub io_weight: f64,
    /// Hosts with weighted utilization below this value are consolidated.
    pub underload_threshold: f64,
    pub hosts: Vec<HostConfig>,
    pub vms: Vec<VmConfig>,
    pub tasks: Vec<TaskConfig>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::from_raw(RawPolicyConfig {
            scheduling_interval: None,
            simulation_length: None,
            history_length: None,
            overload_detector: None,
            vm_selection: None,
            core_allocation: None,
            task_coupling: None,
            compute_weight: None,
            io_weight: None,
            underload_threshold: None,
            hosts: None,
            vms: None,
            tasks: None,
        })
    }
}

impl PolicyConfig {
    fn from_raw(raw: RawPolicyConfig) -> Self {
        Self {
            scheduling_interval: raw.scheduling_interval.unwrap_or(300.),
            simulation_length: raw.simulation_length.unwrap_or(86400.),
            history_length: raw.history_length.unwrap_or(HISTORY_LENGTH),
            overload_detector: raw
                .overload_detector
                .unwrap_or_else(|| "InterQuartileRange[safety=1.5]".to_string()),
            vm_selection: raw.vm_selection.unwrap_or_else(|| "MaximumWeightedUtilization".to_string()),
            core_allocation: raw.core_allocation.unwrap_or_else(|| "ProportionalShare".to_string()),
            task_coupling: raw
                .task_coupling
                .unwrap_or_else(|| "RatioCoupled[iops_per_mips=0.1]".to_string()),
            compute_weight: raw.compute_weight.unwrap_or(0.5),
            io_weight: raw.io_weight.unwrap_or(0.5),
            underload_threshold: raw.underload_threshold.unwrap_or(0.2),
            hosts: raw.hosts.unwrap_or_default(),
            vms: raw.vms.unwrap_or_default(),
            tasks: raw.tasks.unwrap_or_default(),
        }
    }

    /// Parses config from YAML string (uses default values if some parameters are absent).
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let raw: RawPolicyConfig = serde_yaml::from_str(yaml)?;
        let config = Self::from_raw(raw);
        config.validate()?;
        Ok(config)
    }

    /// Creates config by reading parameter values from YAML file.
    pub fn from_file(file_name: &str) -> Result<Self> {
        let yaml = std::fs::read_to_string(file_name)
            .map_err(|e| Error::Config(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_yaml(&yaml)
    }

    fn validate(&self) -> Result<()> {
        if self.scheduling_interval <= 0. {
            return Err(Error::invalid_parameter("scheduling_interval", self.scheduling_interval));
        }
        if self.simulation_length < 0. {
            return Err(Error::invalid_parameter("simulation_length", self.simulation_length));
        }
        if self.history_length == 0 {
            return Err(Error::invalid_parameter("history_length", 0.));
        }
        Ok(())
    }
}
