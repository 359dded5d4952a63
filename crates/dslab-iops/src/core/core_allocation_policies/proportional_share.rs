//! Time-shared core allocation.

use indexmap::IndexMap;

use crate::core::core_allocation_policy::{CoreAllocationPolicy, CoreAssignment};

const EPS: f64 = 1e-9;

/// Scales every virtual core request by `min(1, total capacity / total requested)` and packs the granted rates onto
/// cores in order, splitting a virtual core over several physical cores when needed.
///
/// Fails only if a single virtual core requests more than the largest physical core.
#[derive(Clone, Default)]
pub struct ProportionalShare;

impl ProportionalShare {
    pub fn new() -> Self {
        Self {}
    }
}

impl CoreAllocationPolicy for ProportionalShare {
    fn assign(&self, cores: &[f64], requests: &IndexMap<u32, Vec<f64>>) -> Option<CoreAssignment> {
        let max_core = cores.iter().cloned().fold(0., f64::max);
        if requests.values().flatten().any(|&rate| rate > max_core + EPS) {
            return None;
        }
        let capacity: f64 = cores.iter().sum();
        let requested: f64 = requests.values().flatten().sum();
        let scale = if requested > capacity { capacity / requested } else { 1. };

        let mut core_usage = vec![0.; cores.len()];
        let mut shares = IndexMap::new();
        let mut core = 0;
        for (vm_id, vm_request) in requests {
            let mut vm_share = Vec::with_capacity(vm_request.len());
            for rate in vm_request {
                let granted = rate * scale;
                let mut left = granted;
                while left > EPS && core < cores.len() {
                    let free = cores[core] - core_usage[core];
                    if free <= EPS {
                        core += 1;
                        continue;
                    }
                    let taken = left.min(free);
                    core_usage[core] += taken;
                    left -= taken;
                }
                vm_share.push(granted);
            }
            shares.insert(*vm_id, vm_share);
        }
        Some(CoreAssignment { shares, core_usage })
    }
}
