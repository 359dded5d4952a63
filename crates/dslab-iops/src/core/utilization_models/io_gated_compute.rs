//! Compute demand derated under I/O contention.

use crate::core::utilization_model::{UtilizationCache, UtilizationModel};
use crate::error::{Error, Result};

/// Wraps a compute model and multiplies its value by `factor` whenever the concurrent I/O utilization of the task
/// exceeds `cutoff`.
///
/// Both query kinds share one cache, so the first query for a timestamp fixes the value.
#[derive(Clone)]
pub struct IoGatedComputeUtilization {
    model: Box<dyn UtilizationModel>,
    cutoff: f64,
    factor: f64,
    cache: UtilizationCache,
}

impl IoGatedComputeUtilization {
    pub fn new(model: Box<dyn UtilizationModel>, cutoff: f64, factor: f64) -> Result<Self> {
        if !(0. ..=1.).contains(&cutoff) {
            return Err(Error::invalid_parameter("cutoff", cutoff));
        }
        if !(0. ..=1.).contains(&factor) {
            return Err(Error::invalid_parameter("factor", factor));
        }
        Ok(Self {
            model,
            cutoff,
            factor,
            cache: UtilizationCache::new(),
        })
    }
}

impl UtilizationModel for IoGatedComputeUtilization {
    fn utilization(&self, time: f64) -> f64 {
        self.cache.get_or_insert_with(time, || self.model.utilization(time))
    }

    fn utilization_under_io(&self, time: f64, io_utilization: f64) -> f64 {
        self.cache.get_or_insert_with(time, || {
            let utilization = self.model.utilization(time);
            if io_utilization > self.cutoff {
                utilization * self.factor
            } else {
                utilization
            }
        })
    }

    fn is_io_sensitive(&self) -> bool {
        true
    }

    fn cache(&self) -> &UtilizationCache {
        &self.cache
    }
}
