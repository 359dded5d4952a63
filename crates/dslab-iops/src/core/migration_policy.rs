//! Overload/underload evaluation and migration planning.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::context::SimulationContext;
use crate::core::decision_history::DecisionHistory;
use crate::core::host::Host;
use crate::core::logger::MigrationEntry;
use crate::core::monitoring::{HostSnapshot, VmSnapshot};
use crate::core::overload_detector::OverloadDetector;
use crate::core::vm::Vm;
use crate::core::vm_selection_policy::VmSelectionPolicy;
use crate::error::{Error, Result};
use crate::{log_debug, log_error, log_info, log_trace, log_warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostLoadState {
    Underloaded,
    Normal,
    Overloaded,
}

impl std::fmt::Display for HostLoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            HostLoadState::Underloaded => write!(f, "underloaded"),
            HostLoadState::Normal => write!(f, "normal"),
            HostLoadState::Overloaded => write!(f, "overloaded"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationReason {
    Overload,
    Consolidation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MigrationPlan {
    pub vm_id: u32,
    pub source_host: u32,
    pub target_host: u32,
    pub reason: MigrationReason,
}

/// Outcome of performing a batch of planned migrations.
#[derive(Default)]
pub struct MigrationReport {
    pub performed: usize,
    pub failed: Vec<MigrationPlan>,
    /// VMs that could be placed neither on the target nor back on the source.
    pub stranded: Vec<Vm>,
}

/// Decides which hosts are overloaded or underloaded and which VMs should move where.
///
/// Every overload decision taken through [`is_host_overloaded`](MigrationPolicy::is_host_overloaded) is recorded
/// into the decision history, whatever the outcome. Target selection uses the detector on projected host states
/// without recording.
pub struct MigrationPolicy {
    detector: Box<dyn OverloadDetector>,
    vm_selection: Box<dyn VmSelectionPolicy>,
    compute_weight: f64,
    io_weight: f64,
    underload_threshold: f64,
    history: DecisionHistory,
    ctx: SimulationContext,
}

impl MigrationPolicy {
    pub fn new(
        detector: Box<dyn OverloadDetector>,
        vm_selection: Box<dyn VmSelectionPolicy>,
        compute_weight: f64,
        io_weight: f64,
        underload_threshold: f64,
        ctx: SimulationContext,
    ) -> Result<Self> {
        if compute_weight < 0. {
            return Err(Error::invalid_parameter("compute_weight", compute_weight));
        }
        if io_weight < 0. {
            return Err(Error::invalid_parameter("io_weight", io_weight));
        }
        if !(0. ..=1.).contains(&underload_threshold) {
            return Err(Error::invalid_parameter("underload_threshold", underload_threshold));
        }
        Ok(Self {
            detector,
            vm_selection,
            compute_weight,
            io_weight,
            underload_threshold,
            history: DecisionHistory::new(),
            ctx,
        })
    }

    pub fn is_host_overloaded(&mut self, host: &HostSnapshot) -> bool {
        let decision = self.detector.detect(host);
        self.history.record(host.time, host.id, &decision);
        log_trace!(
            self.ctx,
            "host #{}: compute {:.3}/{:.3}, io {:.3}/{:.3}, fallback {}, overloaded {}",
            host.id,
            decision.compute_utilization,
            decision.compute_threshold,
            decision.io_utilization,
            decision.io_threshold,
            decision.used_fallback,
            decision.overloaded
        );
        decision.overloaded
    }

    pub fn classify(&mut self, host: &HostSnapshot) -> HostLoadState {
        if self.is_host_overloaded(host) {
            HostLoadState::Overloaded
        } else if !host.vms.is_empty()
            && host.weighted_utilization(self.compute_weight, self.io_weight) < self.underload_threshold
        {
            HostLoadState::Underloaded
        } else {
            HostLoadState::Normal
        }
    }

    pub fn evaluate(&mut self, hosts: &[HostSnapshot]) -> Vec<(u32, HostLoadState)> {
        hosts.iter().map(|host| (host.id, self.classify(host))).collect()
    }

    /// Returns the host that would be the most loaded (by weighted utilization) after receiving the VM, among hosts
    /// that fit the VM and would not become overloaded.
    fn find_target(
        &self,
        hosts: &IndexMap<u32, HostSnapshot>,
        vm: &VmSnapshot,
        excluded: &HashSet<u32>,
    ) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut best_utilization = f64::MIN;
        for (id, host) in hosts {
            if excluded.contains(id) || !host.fits(vm) {
                continue;
            }
            let mut projected = host.clone();
            projected.add_vm(vm.clone());
            if self.detector.detect(&projected).overloaded {
                continue;
            }
            let utilization = projected.weighted_utilization(self.compute_weight, self.io_weight);
            if utilization > best_utilization {
                best_utilization = utilization;
                result = Some(*id);
            }
        }
        result
    }

    /// Evaluates all hosts and plans migrations: VMs are first evicted from overloaded hosts until they are no longer
    /// overloaded, then underloaded hosts are drained entirely if all their VMs can be placed elsewhere.
    pub fn plan_migrations(&mut self, hosts: &[HostSnapshot]) -> Vec<MigrationPlan> {
        let states = self.evaluate(hosts);
        let mut projected: IndexMap<u32, HostSnapshot> = hosts.iter().map(|h| (h.id, h.clone())).collect();
        let overloaded: HashSet<u32> = states
            .iter()
            .filter(|(_, state)| *state == HostLoadState::Overloaded)
            .map(|(id, _)| *id)
            .collect();
        let mut plans = Vec::new();

        // select VMs to migrate from overloaded hosts ---------------------------------------------------------------

        let mut victims = Vec::<(VmSnapshot, u32)>::new();
        for (host_id, state) in states.iter() {
            if *state != HostLoadState::Overloaded {
                continue;
            }
            if let Some(host) = projected.get_mut(host_id) {
                while self.detector.detect(host).overloaded {
                    let vm = match self.vm_selection.select_vm(host).and_then(|id| host.remove_vm(id)) {
                        Some(vm) => vm,
                        None => break,
                    };
                    victims.push((vm, *host_id));
                }
            }
        }

        // place victims using best fit --------------------------------------------------------------------------------

        for (vm, source_host) in victims {
            let mut excluded = overloaded.clone();
            excluded.insert(source_host);
            let target = self.find_target(&projected, &vm, &excluded);
            match target.and_then(|id| projected.get_mut(&id)) {
                Some(target_state) => {
                    log_info!(
                        self.ctx,
                        "schedule migration of vm #{} from overloaded host #{} to host #{}",
                        vm.id,
                        source_host,
                        target_state.id
                    );
                    plans.push(MigrationPlan {
                        vm_id: vm.id,
                        source_host,
                        target_host: target_state.id,
                        reason: MigrationReason::Overload,
                    });
                    target_state.add_vm(vm);
                }
                None => {
                    log_warn!(self.ctx, "no target host for vm #{} from host #{}", vm.id, source_host);
                    if let Some(source_state) = projected.get_mut(&source_host) {
                        source_state.add_vm(vm);
                    }
                }
            }
        }

        // consolidate underloaded hosts ---------------------------------------------------------------------------

        let mut underloaded: Vec<u32> = states
            .iter()
            .filter(|(_, state)| *state == HostLoadState::Underloaded)
            .map(|(id, _)| *id)
            .collect();
        underloaded.sort_by(|a, b| {
            let load = |id: &u32| projected[id].weighted_utilization(self.compute_weight, self.io_weight);
            load(a).total_cmp(&load(b))
        });
        let mut targets: HashSet<u32> = plans.iter().map(|p: &MigrationPlan| p.target_host).collect();
        let mut drained = HashSet::<u32>::new();

        for host_id in underloaded {
            if targets.contains(&host_id) {
                continue;
            }
            let mut trial = projected.clone();
            let mut excluded: HashSet<u32> = overloaded.union(&drained).copied().collect();
            excluded.insert(host_id);
            let vms = trial[&host_id].vms.clone();
            let mut host_plans = Vec::new();
            for vm in vms {
                let target = match self.find_target(&trial, &vm, &excluded) {
                    Some(target) => target,
                    None => break,
                };
                if let Some(source_state) = trial.get_mut(&host_id) {
                    source_state.remove_vm(vm.id);
                }
                if let Some(target_state) = trial.get_mut(&target) {
                    target_state.add_vm(vm.clone());
                }
                host_plans.push(MigrationPlan {
                    vm_id: vm.id,
                    source_host: host_id,
                    target_host: target,
                    reason: MigrationReason::Consolidation,
                });
            }
            if host_plans.len() != projected[&host_id].vms.len() {
                log_debug!(self.ctx, "can't consolidate underloaded host #{}", host_id);
                continue;
            }
            log_info!(
                self.ctx,
                "schedule consolidation of underloaded host #{} ({} vms)",
                host_id,
                host_plans.len()
            );
            projected = trial;
            drained.insert(host_id);
            for plan in host_plans {
                targets.insert(plan.target_host);
                plans.push(plan);
            }
        }

        plans
    }

    /// Moves VMs between hosts according to the plans. A VM rejected by its target returns to its source.
    pub fn perform_migrations(&self, hosts: &mut [Host], plans: &[MigrationPlan]) -> MigrationReport {
        let mut report = MigrationReport::default();
        for plan in plans {
            let source = hosts.iter().position(|h| h.id == plan.source_host);
            let target = hosts.iter().position(|h| h.id == plan.target_host);
            let (source, target) = match (source, target) {
                (Some(source), Some(target)) => (source, target),
                _ => {
                    log_warn!(self.ctx, "unknown host in migration of vm #{}", plan.vm_id);
                    report.failed.push(plan.clone());
                    continue;
                }
            };
            let vm = match hosts[source].remove_vm(plan.vm_id) {
                Some(vm) => vm,
                None => {
                    log_warn!(self.ctx, "vm #{} is not on host #{}", plan.vm_id, plan.source_host);
                    report.failed.push(plan.clone());
                    continue;
                }
            };
            let time = self.ctx.time();
            let time_to_completion = vm.scheduler().time_to_completion(time);
            match hosts[target].add_vm(vm) {
                Ok(()) => {
                    self.ctx.log_migration(MigrationEntry {
                        time,
                        vm_id: plan.vm_id,
                        source_host: plan.source_host,
                        target_host: plan.target_host,
                        time_to_completion,
                    });
                    report.performed += 1;
                }
                Err(rejected) => {
                    log_warn!(
                        self.ctx,
                        "host #{} rejected vm #{}: {}",
                        plan.target_host,
                        plan.vm_id,
                        rejected.verdict
                    );
                    report.failed.push(plan.clone());
                    if let Err(stranded) = hosts[source].add_vm(rejected.vm) {
                        log_error!(self.ctx, "vm #{} can't return to host #{}", plan.vm_id, plan.source_host);
                        report.stranded.push(stranded.vm);
                    }
                }
            }
        }
        report
    }

    pub fn decision_history(&self) -> &DecisionHistory {
        &self.history
    }

    pub fn compute_weight(&self) -> f64 {
        self.compute_weight
    }

    pub fn io_weight(&self) -> f64 {
        self.io_weight
    }
}
