//! I/O demand proportional to compute demand.

use crate::core::utilization_model::{UtilizationCache, UtilizationModel};
use crate::error::{Error, Result};

/// Rule-of-thumb model: a fixed number of I/O operations per million instructions.
///
/// `utilization = compute_utilization * compute_capacity * iops_per_mips / io_capacity`, limited to `[0, 1]`.
#[derive(Clone)]
pub struct IoRatioUtilization {
    iops_per_mips: f64,
    compute_utilization: f64,
    compute_capacity: f64,
    io_capacity: f64,
    cache: UtilizationCache,
}

impl IoRatioUtilization {
    pub fn new(iops_per_mips: f64) -> Result<Self> {
        if iops_per_mips < 0. {
            return Err(Error::invalid_parameter("iops_per_mips", iops_per_mips));
        }
        Ok(Self {
            iops_per_mips,
            compute_utilization: 0.,
            compute_capacity: 0.,
            io_capacity: 0.,
            cache: UtilizationCache::new(),
        })
    }

    pub fn iops_per_mips(&self) -> f64 {
        self.iops_per_mips
    }

    pub fn set_compute_utilization(&mut self, utilization: f64) {
        self.compute_utilization = utilization;
    }

    pub fn set_compute_capacity(&mut self, capacity: f64) {
        self.compute_capacity = capacity;
    }

    pub fn set_io_capacity(&mut self, capacity: f64) {
        self.io_capacity = capacity;
    }
}

impl UtilizationModel for IoRatioUtilization {
    fn utilization(&self, time: f64) -> f64 {
        self.cache.get_or_insert_with(time, || {
            if self.io_capacity <= 0. {
                return 0.;
            }
            let iops = self.compute_utilization * self.compute_capacity * self.iops_per_mips;
            (iops / self.io_capacity).clamp(0., 1.)
        })
    }

    fn cache(&self) -> &UtilizationCache {
        &self.cache
    }
}
