//! Random Selection policy.

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::core::monitoring::HostSnapshot;
use crate::core::vm_selection_policy::VmSelectionPolicy;

/// Selects a uniformly random VM, reproducible with a fixed seed.
#[derive(Clone)]
pub struct RandomSelection {
    rng: Pcg64,
}

impl RandomSelection {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
        }
    }
}

impl VmSelectionPolicy for RandomSelection {
    fn select_vm(&mut self, host: &HostSnapshot) -> Option<u32> {
        host.vms.choose(&mut self.rng).map(|vm| vm.id)
    }
}
