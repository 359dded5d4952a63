//! Physical host.

use indexmap::IndexMap;

use crate::context::SimulationContext;
use crate::core::common::{AllocationVerdict, RejectedVm};
use crate::core::io_provisioner::IoProvisioner;
use crate::core::logger::HostUtilizationEntry;
use crate::core::monitoring::{HostSnapshot, VmSnapshot};
use crate::core::stats::trim_zero_tail;
use crate::core::vm::Vm;
use crate::core::vm_scheduler::VmScheduler;
use crate::{log_debug, log_info, log_warn};

/// Host owning its capacity ledgers and resident VMs.
///
/// Ledgers are mutated only through the host, which keeps them consistent: a VM is present in every ledger or in
/// none of them.
pub struct Host {
    pub id: u32,
    vm_scheduler: VmScheduler,
    io_provisioner: Box<dyn IoProvisioner>,
    vms: IndexMap<u32, Vm>,
    ctx: SimulationContext,
}

impl Host {
    pub fn new(
        id: u32,
        vm_scheduler: VmScheduler,
        io_provisioner: Box<dyn IoProvisioner>,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            id,
            vm_scheduler,
            io_provisioner,
            vms: IndexMap::new(),
            ctx,
        }
    }

    /// Checks whether the VM can be admitted without changing any ledger.
    pub fn can_allocate(&mut self, vm: &Vm) -> AllocationVerdict {
        if !self.io_provisioner.is_suitable(vm.id, vm.io_bandwidth(), vm.io_bandwidth()) {
            return AllocationVerdict::NotEnoughIoBandwidth;
        }
        if vm.current_requested_io() > 0. && self.vm_scheduler.io_capacity() <= 0. {
            return AllocationVerdict::NotEnoughIo;
        }
        if vm
            .current_requested_compute()
            .iter()
            .any(|&rate| rate > self.vm_scheduler.max_available_core_compute())
            || vm.current_requested_total_compute() > self.vm_scheduler.available_compute()
        {
            return AllocationVerdict::NotEnoughCompute;
        }
        AllocationVerdict::Success
    }

    /// Admits the VM, allocating flat I/O bandwidth, then I/O share, then cores.
    /// If any step fails, the steps already done are rolled back and the VM is returned.
    pub fn add_vm(&mut self, mut vm: Vm) -> Result<(), RejectedVm> {
        let verdict = self.allocate(&vm);
        if verdict != AllocationVerdict::Success {
            log_debug!(self.ctx, "vm #{} rejected: {}", vm.id, verdict);
            return Err(RejectedVm { vm, verdict });
        }
        vm.scheduler_mut().set_host_id(Some(self.id));
        log_info!(self.ctx, "vm #{} allocated on host #{}", vm.id, self.id);
        self.vms.insert(vm.id, vm);
        Ok(())
    }

    fn allocate(&mut self, vm: &Vm) -> AllocationVerdict {
        if !self.io_provisioner.allocate(vm.id, vm.io_bandwidth(), vm.io_bandwidth()) {
            return AllocationVerdict::NotEnoughIoBandwidth;
        }
        if !self.vm_scheduler.allocate_io(vm.id, vm.current_requested_io()) {
            self.io_provisioner.deallocate(vm.id);
            return AllocationVerdict::NotEnoughIo;
        }
        if !self.vm_scheduler.allocate_cores(vm.id, &vm.current_requested_compute()) {
            self.vm_scheduler.deallocate_io(vm.id);
            self.io_provisioner.deallocate(vm.id);
            return AllocationVerdict::NotEnoughCompute;
        }
        AllocationVerdict::Success
    }

    /// Removes the VM, releasing its entries in every ledger.
    pub fn remove_vm(&mut self, vm_id: u32) -> Option<Vm> {
        let mut vm = self.vms.shift_remove(&vm_id)?;
        self.vm_scheduler.deallocate_vm(vm_id);
        self.io_provisioner.deallocate(vm_id);
        vm.scheduler_mut().set_host_id(None);
        log_info!(self.ctx, "vm #{} removed from host #{}", vm_id, self.id);
        Some(vm)
    }

    pub fn remove_all_vms(&mut self) -> Vec<Vm> {
        self.vm_scheduler.deallocate_all();
        self.io_provisioner.deallocate_all();
        let mut vms: Vec<Vm> = self.vms.drain(..).map(|(_, vm)| vm).collect();
        for vm in vms.iter_mut() {
            vm.scheduler_mut().set_host_id(None);
        }
        vms
    }

    /// Reallocates capacity for the current demand of every VM, then advances their tasks to `time`.
    ///
    /// Returns the earliest next event over all VMs, or zero if none of them has running tasks.
    pub fn update_processing(&mut self, time: f64) -> f64 {
        self.vm_scheduler.deallocate_all_cores();
        for vm in self.vms.values() {
            if !self.vm_scheduler.allocate_io(vm.id, vm.current_requested_io()) {
                log_warn!(self.ctx, "can't allocate requested io for vm #{}", vm.id);
            }
            if !self.vm_scheduler.allocate_cores(vm.id, &vm.current_requested_compute()) {
                log_warn!(self.ctx, "can't allocate requested compute for vm #{}", vm.id);
            }
        }

        let mut next_event = f64::MAX;
        for vm in self.vms.values_mut() {
            let compute_share = self.vm_scheduler.allocated_compute(vm.id).cloned().unwrap_or_default();
            let io_share = self.vm_scheduler.allocated_io(vm.id);
            let vm_next_event = vm.update_processing(time, &compute_share, io_share);
            if vm_next_event > 0. {
                next_event = next_event.min(vm_next_event);
            }
        }
        self.ctx.log_host_utilization(HostUtilizationEntry {
            time,
            host_id: self.id,
            io_utilization: self.io_utilization(),
            io_unutilized: (self.io_capacity() - self.vm_scheduler.total_allocated_io()).max(0.).round() as u64,
            compute_utilization: self.compute_utilization(),
        });
        if next_event == f64::MAX {
            0.
        } else {
            next_event
        }
    }

    fn aggregate_history<F>(&self, capacity: f64, vm_history: F) -> Vec<f64>
    where
        F: Fn(&Vm) -> (Vec<f64>, f64),
    {
        let mut data = Vec::new();
        if capacity <= 0. {
            return data;
        }
        for vm in self.vms.values() {
            let (history, vm_capacity) = vm_history(vm);
            if data.len() < history.len() {
                data.resize(history.len(), 0.);
            }
            for (i, sample) in history.iter().enumerate() {
                data[i] += sample * vm_capacity / capacity;
            }
        }
        trim_zero_tail(&data)
    }

    /// Host compute utilization history aggregated from VM histories, most recent first.
    ///
    /// VM samples are weighted by the VM per-core compute.
    pub fn compute_utilization_history(&self) -> Vec<f64> {
        self.aggregate_history(self.total_compute(), |vm| {
            (vm.compute_history().samples(), vm.core_compute())
        })
    }

    pub fn io_utilization_history(&self) -> Vec<f64> {
        self.aggregate_history(self.io_capacity(), |vm| (vm.io_history().samples(), vm.io_capacity()))
    }

    pub fn requested_compute(&self) -> f64 {
        self.vms.values().map(|vm| vm.current_requested_total_compute()).sum()
    }

    pub fn requested_io(&self) -> f64 {
        self.vms.values().map(|vm| vm.current_requested_io()).sum()
    }

    pub fn compute_utilization(&self) -> f64 {
        self.requested_compute() / self.total_compute()
    }

    pub fn io_utilization(&self) -> f64 {
        if self.io_capacity() > 0. {
            self.requested_io() / self.io_capacity()
        } else {
            0.
        }
    }

    pub fn snapshot(&self, time: f64) -> HostSnapshot {
        let mut snapshot = HostSnapshot::new(self.id, time, self.total_compute(), self.io_capacity())
            .with_history(self.compute_utilization_history(), self.io_utilization_history());
        for vm in self.vms.values() {
            snapshot.add_vm(VmSnapshot {
                id: vm.id,
                total_compute: vm.total_compute(),
                io_capacity: vm.io_capacity(),
                requested_compute: vm.current_requested_total_compute(),
                requested_io: vm.current_requested_io(),
                migration_time: vm.migration_time(),
            });
        }
        snapshot
    }

    pub fn total_compute(&self) -> f64 {
        self.vm_scheduler.total_compute()
    }

    pub fn io_capacity(&self) -> f64 {
        self.vm_scheduler.io_capacity()
    }

    pub fn vm(&self, vm_id: u32) -> Option<&Vm> {
        self.vms.get(&vm_id)
    }

    pub fn vm_mut(&mut self, vm_id: u32) -> Option<&mut Vm> {
        self.vms.get_mut(&vm_id)
    }

    pub fn vms(&self) -> impl Iterator<Item = &Vm> {
        self.vms.values()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    pub fn is_idle(&self) -> bool {
        self.vms.values().all(|vm| vm.scheduler().is_empty())
    }

    pub fn vm_scheduler(&self) -> &VmScheduler {
        &self.vm_scheduler
    }

    pub fn io_provisioner(&self) -> &dyn IoProvisioner {
        self.io_provisioner.as_ref()
    }
}
