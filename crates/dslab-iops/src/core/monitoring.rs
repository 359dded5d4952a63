//! Read-only host and VM load snapshots consumed by the migration policy.

fn ratio(used: f64, total: f64) -> f64 {
    if total > 0. {
        used / total
    } else {
        0.
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VmSnapshot {
    pub id: u32,
    pub total_compute: f64,
    pub io_capacity: f64,
    pub requested_compute: f64,
    pub requested_io: f64,
    /// Estimated time to move the VM to another host.
    pub migration_time: f64,
}

impl VmSnapshot {
    pub fn compute_utilization(&self) -> f64 {
        ratio(self.requested_compute, self.total_compute)
    }

    pub fn io_utilization(&self) -> f64 {
        ratio(self.requested_io, self.io_capacity)
    }

    pub fn weighted_utilization(&self, compute_weight: f64, io_weight: f64) -> f64 {
        compute_weight * self.compute_utilization() + io_weight * self.io_utilization()
    }
}

/// Host load at the moment of snapshot together with the aggregated utilization history
/// (most recent first, zero tail trimmed).
#[derive(Clone, Debug, PartialEq)]
pub struct HostSnapshot {
    pub id: u32,
    pub time: f64,
    pub total_compute: f64,
    pub io_capacity: f64,
    pub requested_compute: f64,
    pub requested_io: f64,
    pub compute_history: Vec<f64>,
    pub io_history: Vec<f64>,
    pub vms: Vec<VmSnapshot>,
}

impl HostSnapshot {
    /// Snapshot of an empty host.
    pub fn new(id: u32, time: f64, total_compute: f64, io_capacity: f64) -> Self {
        Self {
            id,
            time,
            total_compute,
            io_capacity,
            requested_compute: 0.,
            requested_io: 0.,
            compute_history: Vec::new(),
            io_history: Vec::new(),
            vms: Vec::new(),
        }
    }

    pub fn with_history(mut self, compute_history: Vec<f64>, io_history: Vec<f64>) -> Self {
        self.compute_history = compute_history;
        self.io_history = io_history;
        self
    }

    pub fn compute_utilization(&self) -> f64 {
        ratio(self.requested_compute, self.total_compute)
    }

    pub fn io_utilization(&self) -> f64 {
        ratio(self.requested_io, self.io_capacity)
    }

    pub fn weighted_utilization(&self, compute_weight: f64, io_weight: f64) -> f64 {
        compute_weight * self.compute_utilization() + io_weight * self.io_utilization()
    }

    /// Whether the VM demand fits into the unrequested host capacity.
    pub fn fits(&self, vm: &VmSnapshot) -> bool {
        self.requested_compute + vm.requested_compute <= self.total_compute
            && self.requested_io + vm.requested_io <= self.io_capacity
    }

    pub fn add_vm(&mut self, vm: VmSnapshot) {
        self.requested_compute += vm.requested_compute;
        self.requested_io += vm.requested_io;
        self.vms.push(vm);
    }

    pub fn remove_vm(&mut self, vm_id: u32) -> Option<VmSnapshot> {
        let pos = self.vms.iter().position(|vm| vm.id == vm_id)?;
        let vm = self.vms.remove(pos);
        self.requested_compute -= vm.requested_compute;
        self.requested_io -= vm.requested_io;
        Some(vm)
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VmSnapshot> {
        self.vms.iter().find(|vm| vm.id == vm_id)
    }
}
