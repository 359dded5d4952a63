//! Selection of VMs to migrate away from overloaded hosts.

use dyn_clone::{clone_trait_object, DynClone};

use crate::core::config::options::{parse_config_value, Options};
use crate::core::monitoring::HostSnapshot;
use crate::core::vm_selection_policies::maximum_io_utilization::MaximumIoUtilization;
use crate::core::vm_selection_policies::maximum_weighted_utilization::MaximumWeightedUtilization;
use crate::core::vm_selection_policies::minimum_migration_time::MinimumMigrationTime;
use crate::core::vm_selection_policies::minimum_utilization::MinimumUtilization;
use crate::core::vm_selection_policies::random_selection::RandomSelection;
use crate::error::{Error, Result};

/// Trait for implementation of VM selection policies.
///
/// Returns an ID of VM to migrate from the host or `None` if the host has no VMs.
pub trait VmSelectionPolicy: DynClone {
    fn select_vm(&mut self, host: &HostSnapshot) -> Option<u32>;
}

clone_trait_object!(VmSelectionPolicy);

pub fn vm_selection_policy_resolver(
    config_str: &str,
    compute_weight: f64,
    io_weight: f64,
) -> Result<Box<dyn VmSelectionPolicy>> {
    let (policy_name, options_str) = parse_config_value(config_str);
    let options = Options::new(&policy_name, &options_str);
    match policy_name.as_str() {
        "MinimumUtilization" => Ok(Box::new(MinimumUtilization::new())),
        "MinimumMigrationTime" => Ok(Box::new(MinimumMigrationTime::new())),
        "MaximumIoUtilization" => Ok(Box::new(MaximumIoUtilization::new())),
        "MaximumWeightedUtilization" => Ok(Box::new(MaximumWeightedUtilization::new(
            options.get_or("compute_weight", compute_weight)?,
            options.get_or("io_weight", io_weight)?,
        ))),
        "RandomSelection" => Ok(Box::new(RandomSelection::new(options.get_or("seed", 123)?))),
        _ => Err(Error::Config(format!("can't resolve vm selection policy: {}", config_str))),
    }
}
