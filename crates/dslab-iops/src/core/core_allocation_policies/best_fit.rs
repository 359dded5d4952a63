//! Space-shared core allocation.

use indexmap::IndexMap;

use crate::core::core_allocation_policy::{CoreAllocationPolicy, CoreAssignment};

/// Gives each virtual core a dedicated physical core: the free one with the smallest capacity that still fits the
/// request (the lowest index on ties).
#[derive(Clone, Default)]
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl CoreAllocationPolicy for BestFit {
    fn assign(&self, cores: &[f64], requests: &IndexMap<u32, Vec<f64>>) -> Option<CoreAssignment> {
        let mut used = vec![false; cores.len()];
        let mut core_usage = vec![0.; cores.len()];
        let mut shares = IndexMap::new();
        for (vm_id, vm_request) in requests {
            let mut vm_share = Vec::with_capacity(vm_request.len());
            for &rate in vm_request {
                let mut best: Option<usize> = None;
                for (i, &capacity) in cores.iter().enumerate() {
                    if used[i] || capacity < rate {
                        continue;
                    }
                    if best.map_or(true, |b| capacity < cores[b]) {
                        best = Some(i);
                    }
                }
                let core = best?;
                used[core] = true;
                core_usage[core] = rate;
                vm_share.push(rate);
            }
            shares.insert(*vm_id, vm_share);
        }
        Some(CoreAssignment { shares, core_usage })
    }
}
