//! Assignment of VM compute requests to physical cores.

use dyn_clone::{clone_trait_object, DynClone};
use indexmap::IndexMap;

use crate::core::config::options::parse_config_value;
use crate::core::core_allocation_policies::best_fit::BestFit;
use crate::core::core_allocation_policies::proportional_share::ProportionalShare;
use crate::error::{Error, Result};

/// Result of distributing compute requests of all VMs over host cores.
#[derive(Clone, Debug, PartialEq)]
pub struct CoreAssignment {
    /// Compute rate granted to each virtual core, keyed by VM id.
    pub shares: IndexMap<u32, Vec<f64>>,
    /// Used capacity of each physical core.
    pub core_usage: Vec<f64>,
}

/// Trait for implementation of core allocation policies.
///
/// The policy is a function of host core capacities and compute requests of all resident VMs (per virtual core),
/// which returns the complete assignment or `None` if the requests can't be placed. The assignment is always
/// recomputed from scratch, so it must not depend on previous calls.
pub trait CoreAllocationPolicy: DynClone {
    fn assign(&self, cores: &[f64], requests: &IndexMap<u32, Vec<f64>>) -> Option<CoreAssignment>;
}

clone_trait_object!(CoreAllocationPolicy);

pub fn core_allocation_policy_resolver(config_str: &str) -> Result<Box<dyn CoreAllocationPolicy>> {
    let (policy_name, _options) = parse_config_value(config_str);
    match policy_name.as_str() {
        "ProportionalShare" => Ok(Box::new(ProportionalShare::new())),
        "BestFit" => Ok(Box::new(BestFit::new())),
        _ => Err(Error::Config(format!("can't resolve core allocation policy: {}", config_str))),
    }
}
