//! Maximum Weighted Utilization policy.

use crate::core::monitoring::HostSnapshot;
use crate::core::vm_selection_policy::VmSelectionPolicy;

/// Selects the VM with the highest weighted sum of compute and I/O utilization.
#[derive(Clone)]
pub struct MaximumWeightedUtilization {
    compute_weight: f64,
    io_weight: f64,
}

impl MaximumWeightedUtilization {
    pub fn new(compute_weight: f64, io_weight: f64) -> Self {
        Self {
            compute_weight,
            io_weight,
        }
    }
}

impl VmSelectionPolicy for MaximumWeightedUtilization {
    fn select_vm(&mut self, host: &HostSnapshot) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut max_utilization = f64::MIN;
        for vm in &host.vms {
            let utilization = vm.weighted_utilization(self.compute_weight, self.io_weight);
            if utilization > max_utilization {
                max_utilization = utilization;
                result = Some(vm.id);
            }
        }
        result
    }
}
