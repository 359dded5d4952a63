//! Per-host allocation of compute and I/O capacity between VMs.

use indexmap::IndexMap;

use crate::context::SimulationContext;
use crate::core::core_allocation_policy::{CoreAllocationPolicy, CoreAssignment};
use crate::error::{Error, Result};
use crate::{log_debug, log_trace};

/// Keeps the compute and I/O ledgers of a host.
///
/// Compute requests are placed on cores by the configured [`CoreAllocationPolicy`]. I/O is shared proportionally:
/// every allocation call records the VM request and rescales the allocations of all resident VMs by
/// `min(1, capacity / total requested)`, so the sum of allocations never exceeds the capacity and equals it when
/// the host is oversubscribed.
pub struct VmScheduler {
    cores: Vec<f64>,
    io_capacity: f64,
    policy: Box<dyn CoreAllocationPolicy>,
    requested_compute: IndexMap<u32, Vec<f64>>,
    allocated_compute: IndexMap<u32, Vec<f64>>,
    core_usage: Vec<f64>,
    available_compute: f64,
    requested_io: IndexMap<u32, f64>,
    allocated_io: IndexMap<u32, f64>,
    ctx: SimulationContext,
}

impl VmScheduler {
    pub fn new(
        cores: Vec<f64>,
        io_capacity: f64,
        policy: Box<dyn CoreAllocationPolicy>,
        ctx: SimulationContext,
    ) -> Result<Self> {
        if cores.is_empty() {
            return Err(Error::invalid_parameter("cores", 0.));
        }
        if let Some(&capacity) = cores.iter().find(|&&c| c <= 0.) {
            return Err(Error::invalid_parameter("core_compute", capacity));
        }
        if io_capacity < 0. {
            return Err(Error::invalid_parameter("io_capacity", io_capacity));
        }
        let available_compute = cores.iter().sum();
        Ok(Self {
            core_usage: vec![0.; cores.len()],
            cores,
            io_capacity,
            policy,
            requested_compute: IndexMap::new(),
            allocated_compute: IndexMap::new(),
            available_compute,
            requested_io: IndexMap::new(),
            allocated_io: IndexMap::new(),
            ctx,
        })
    }

    fn apply(&mut self, assignment: CoreAssignment) {
        self.available_compute = self.total_compute() - assignment.core_usage.iter().sum::<f64>();
        self.allocated_compute = assignment.shares;
        self.core_usage = assignment.core_usage;
    }

    /// Records the compute request of the VM (per virtual core) and reassigns cores for all resident VMs.
    ///
    /// On failure the previous request and assignment are kept.
    pub fn allocate_cores(&mut self, vm_id: u32, requested: &[f64]) -> bool {
        let previous = self.requested_compute.insert(vm_id, requested.to_vec());
        match self.policy.assign(&self.cores, &self.requested_compute) {
            Some(assignment) => {
                self.apply(assignment);
                log_trace!(
                    self.ctx,
                    "vm #{} allocated compute {:?}",
                    vm_id,
                    self.allocated_compute.get(&vm_id)
                );
                true
            }
            None => {
                match previous {
                    Some(request) => self.requested_compute.insert(vm_id, request),
                    None => self.requested_compute.shift_remove(&vm_id),
                };
                log_debug!(self.ctx, "not enough compute for vm #{}: requested {:?}", vm_id, requested);
                false
            }
        }
    }

    pub fn deallocate_cores(&mut self, vm_id: u32) {
        self.requested_compute.shift_remove(&vm_id);
        self.allocated_compute.shift_remove(&vm_id);
        match self.policy.assign(&self.cores, &self.requested_compute) {
            Some(assignment) => self.apply(assignment),
            None => {
                let used: f64 = self.allocated_compute.values().flatten().sum();
                self.available_compute = self.total_compute() - used;
            }
        }
    }

    pub fn deallocate_all_cores(&mut self) {
        self.requested_compute.clear();
        self.allocated_compute.clear();
        self.core_usage = vec![0.; self.cores.len()];
        self.available_compute = self.total_compute();
    }

    /// Records the I/O request of the VM and rebalances I/O of all resident VMs.
    ///
    /// Oversubscription is not a failure. Fails only if the VM requests I/O from a host without I/O capacity.
    pub fn allocate_io(&mut self, vm_id: u32, requested: f64) -> bool {
        if requested > 0. && self.io_capacity <= 0. {
            log_debug!(self.ctx, "no io capacity for vm #{}: requested {:.3}", vm_id, requested);
            return false;
        }
        self.requested_io.insert(vm_id, requested.max(0.));
        let total_requested: f64 = self.requested_io.values().sum();
        let scale = if total_requested <= self.io_capacity {
            1.
        } else {
            self.io_capacity / total_requested
        };
        for (id, request) in &self.requested_io {
            self.allocated_io.insert(*id, request * scale);
        }
        log_trace!(
            self.ctx,
            "vm #{} requested io {:.3}, scale factor {:.3}",
            vm_id,
            requested,
            scale
        );
        true
    }

    pub fn deallocate_io(&mut self, vm_id: u32) {
        self.requested_io.shift_remove(&vm_id);
        self.allocated_io.shift_remove(&vm_id);
    }

    pub fn deallocate_all_io(&mut self) {
        self.requested_io.clear();
        self.allocated_io.clear();
    }

    /// Removes the VM from every ledger.
    pub fn deallocate_vm(&mut self, vm_id: u32) {
        self.deallocate_cores(vm_id);
        self.deallocate_io(vm_id);
    }

    pub fn deallocate_all(&mut self) {
        self.deallocate_all_cores();
        self.deallocate_all_io();
    }

    pub fn cores(&self) -> &[f64] {
        &self.cores
    }

    pub fn core_usage(&self) -> &[f64] {
        &self.core_usage
    }

    pub fn total_compute(&self) -> f64 {
        self.cores.iter().sum()
    }

    pub fn available_compute(&self) -> f64 {
        self.available_compute
    }

    /// The largest unused capacity of a single core.
    pub fn max_available_core_compute(&self) -> f64 {
        self.cores
            .iter()
            .zip(self.core_usage.iter())
            .map(|(capacity, used)| capacity - used)
            .fold(0., f64::max)
    }

    pub fn allocated_compute(&self, vm_id: u32) -> Option<&Vec<f64>> {
        self.allocated_compute.get(&vm_id)
    }

    pub fn total_allocated_compute(&self, vm_id: u32) -> f64 {
        self.allocated_compute.get(&vm_id).map_or(0., |share| share.iter().sum())
    }

    pub fn io_capacity(&self) -> f64 {
        self.io_capacity
    }

    pub fn requested_io(&self, vm_id: u32) -> f64 {
        self.requested_io.get(&vm_id).copied().unwrap_or(0.)
    }

    pub fn allocated_io(&self, vm_id: u32) -> f64 {
        self.allocated_io.get(&vm_id).copied().unwrap_or(0.)
    }

    pub fn total_allocated_io(&self) -> f64 {
        self.allocated_io.values().sum()
    }

    pub fn vm_ids(&self) -> impl Iterator<Item = &u32> {
        self.requested_compute.keys()
    }
}
