pub mod common;
pub mod config;
pub mod core_allocation_policies;
pub mod core_allocation_policy;
pub mod decision_history;
pub mod host;
pub mod io_provisioner;
pub mod logger;
pub mod migration_policy;
pub mod monitoring;
pub mod overload_detector;
pub mod overload_detectors;
pub mod stats;
pub mod task;
pub mod task_scheduler;
pub mod utilization_history;
pub mod utilization_model;
pub mod utilization_models;
pub mod vm;
pub mod vm_scheduler;
pub mod vm_selection_policies;
pub mod vm_selection_policy;
