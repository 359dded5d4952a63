//! Flat I/O bandwidth provisioning.

use dyn_clone::{clone_trait_object, DynClone};
use indexmap::IndexMap;

/// Ledger granting each VM a fixed I/O bandwidth slice on admission.
pub trait IoProvisioner: DynClone {
    /// Allocates `min(requested, vm_max)` after releasing the previous allocation of the VM.
    /// On failure the VM is left with no allocation.
    fn allocate(&mut self, vm_id: u32, requested: u64, vm_max: u64) -> bool;

    fn deallocate(&mut self, vm_id: u32);

    fn deallocate_all(&mut self);

    /// Checks whether the allocation would succeed, leaving the ledger unchanged.
    fn is_suitable(&mut self, vm_id: u32, requested: u64, vm_max: u64) -> bool;

    fn allocated(&self, vm_id: u32) -> u64;

    fn capacity(&self) -> u64;

    fn available(&self) -> u64;

    fn used(&self) -> u64 {
        self.capacity() - self.available()
    }
}

clone_trait_object!(IoProvisioner);

/// Best-effort provisioner: grants a request if the pool has enough bandwidth left.
#[derive(Clone)]
pub struct SimpleIoProvisioner {
    capacity: u64,
    available: u64,
    allocations: IndexMap<u32, u64>,
}

impl SimpleIoProvisioner {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            available: capacity,
            allocations: IndexMap::new(),
        }
    }
}

impl IoProvisioner for SimpleIoProvisioner {
    fn allocate(&mut self, vm_id: u32, requested: u64, vm_max: u64) -> bool {
        let amount = requested.min(vm_max);
        self.deallocate(vm_id);
        if self.available >= amount {
            self.available -= amount;
            self.allocations.insert(vm_id, amount);
            true
        } else {
            false
        }
    }

    fn deallocate(&mut self, vm_id: u32) {
        if let Some(amount) = self.allocations.shift_remove(&vm_id) {
            self.available += amount;
        }
    }

    fn deallocate_all(&mut self) {
        self.allocations.clear();
        self.available = self.capacity;
    }

    fn is_suitable(&mut self, vm_id: u32, requested: u64, vm_max: u64) -> bool {
        let previous = self.allocated(vm_id);
        let result = self.allocate(vm_id, requested, vm_max);
        self.deallocate(vm_id);
        if previous > 0 {
            self.allocate(vm_id, previous, previous);
        }
        result
    }

    fn allocated(&self, vm_id: u32) -> u64 {
        self.allocations.get(&vm_id).copied().unwrap_or(0)
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn available(&self) -> u64 {
        self.available
    }
}
