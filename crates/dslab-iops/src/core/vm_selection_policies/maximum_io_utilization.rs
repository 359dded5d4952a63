//! Maximum I/O Utilization policy.

use crate::core::monitoring::HostSnapshot;
use crate::core::vm_selection_policy::VmSelectionPolicy;

/// Selects the VM with the highest I/O utilization.
#[derive(Clone, Default)]
pub struct MaximumIoUtilization;

impl MaximumIoUtilization {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelectionPolicy for MaximumIoUtilization {
    fn select_vm(&mut self, host: &HostSnapshot) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut max_io = f64::MIN;
        for vm in &host.vms {
            if vm.io_utilization() > max_io {
                max_io = vm.io_utilization();
                result = Some(vm.id);
            }
        }
        result
    }
}
