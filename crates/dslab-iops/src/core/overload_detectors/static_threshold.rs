//! Static threshold overload detector.

use crate::core::monitoring::HostSnapshot;
use crate::core::overload_detector::{OverloadDecision, OverloadDetector};
use crate::error::{Error, Result};

/// Host is overloaded if the requested compute or the requested I/O share of capacity exceeds the corresponding
/// threshold. Dimensions are checked independently.
#[derive(Clone)]
pub struct StaticThreshold {
    compute_threshold: f64,
    io_threshold: f64,
}

impl StaticThreshold {
    pub fn new(compute_threshold: f64, io_threshold: f64) -> Result<Self> {
        if !(0. ..=1.).contains(&compute_threshold) {
            return Err(Error::invalid_parameter("compute_threshold", compute_threshold));
        }
        if !(0. ..=1.).contains(&io_threshold) {
            return Err(Error::invalid_parameter("io_threshold", io_threshold));
        }
        Ok(Self {
            compute_threshold,
            io_threshold,
        })
    }
}

impl OverloadDetector for StaticThreshold {
    fn detect(&self, host: &HostSnapshot) -> OverloadDecision {
        let compute_utilization = host.compute_utilization();
        let io_utilization = host.io_utilization();
        OverloadDecision {
            overloaded: compute_utilization > self.compute_threshold || io_utilization > self.io_threshold,
            compute_utilization,
            io_utilization,
            compute_threshold: self.compute_threshold,
            io_threshold: self.io_threshold,
            used_fallback: false,
        }
    }
}
