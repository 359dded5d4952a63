//! Minimum Utilization policy.

use crate::core::monitoring::HostSnapshot;
use crate::core::vm_selection_policy::VmSelectionPolicy;

/// Selects the VM with the lowest compute utilization, i.e. requested compute relative to the VM capacity.
#[derive(Clone, Default)]
pub struct MinimumUtilization;

impl MinimumUtilization {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelectionPolicy for MinimumUtilization {
    fn select_vm(&mut self, host: &HostSnapshot) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut min_utilization = f64::MAX;
        for vm in &host.vms {
            let utilization = vm.compute_utilization();
            if utilization < min_utilization {
                min_utilization = utilization;
                result = Some(vm.id);
            }
        }
        result
    }
}
