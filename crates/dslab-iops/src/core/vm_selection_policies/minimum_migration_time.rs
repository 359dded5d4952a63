//! Minimum Migration Time policy.

use crate::core::monitoring::HostSnapshot;
use crate::core::vm_selection_policy::VmSelectionPolicy;

/// Selects the VM that can be migrated in the shortest time.
#[derive(Clone, Default)]
pub struct MinimumMigrationTime;

impl MinimumMigrationTime {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelectionPolicy for MinimumMigrationTime {
    fn select_vm(&mut self, host: &HostSnapshot) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut min_time = f64::INFINITY;
        for vm in &host.vms {
            if result.is_none() || vm.migration_time < min_time {
                min_time = vm.migration_time;
                result = Some(vm.id);
            }
        }
        result
    }
}
