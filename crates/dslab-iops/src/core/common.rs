use crate::core::vm::Vm;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationVerdict {
    NotEnoughIoBandwidth,
    NotEnoughIo,
    NotEnoughCompute,
    Success,
}

impl std::fmt::Display for AllocationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AllocationVerdict::NotEnoughIoBandwidth => write!(f, "not enough io bandwidth"),
            AllocationVerdict::NotEnoughIo => write!(f, "not enough io"),
            AllocationVerdict::NotEnoughCompute => write!(f, "not enough compute"),
            AllocationVerdict::Success => write!(f, "success"),
        }
    }
}

/// VM returned by a host that could not admit it.
pub struct RejectedVm {
    pub vm: Vm,
    pub verdict: AllocationVerdict,
}

impl std::fmt::Debug for RejectedVm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "RejectedVm {{ vm: {}, verdict: {} }}", self.vm.id, self.verdict)
    }
}
