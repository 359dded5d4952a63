//! I/O demand issued in bursts correlated with compute demand.

use std::cell::Cell;

use crate::core::utilization_model::{UtilizationCache, UtilizationModel};
use crate::error::{Error, Result};

/// Compute utilization below which no I/O issue interval is derived.
const MIN_COMPUTE_UTILIZATION: f64 = 0.01;

/// Empirical I/O model parameterized by two traffic constants `a` and `b`.
///
/// The model counts the compute work (in MI) left until the next I/O issue. When the counter is exhausted, the
/// utilization at that time is taken from the underlying compute model and the counter is reset to
/// `(1 - b * u) / (a * u) * allocated_compute * u`, where `u` is the latest observed compute utilization.
/// Otherwise the task issues no I/O at that time.
#[derive(Clone)]
pub struct IoBurstUtilization {
    model: Box<dyn UtilizationModel>,
    a: f64,
    b: f64,
    compute_left: Cell<f64>,
    compute_utilization: f64,
    allocated_compute: f64,
    cache: UtilizationCache,
}

impl IoBurstUtilization {
    pub fn new(model: Box<dyn UtilizationModel>, a: f64, b: f64) -> Result<Self> {
        if a <= 0. {
            return Err(Error::invalid_parameter("a", a));
        }
        if b < 0. {
            return Err(Error::invalid_parameter("b", b));
        }
        Ok(Self {
            model,
            a,
            b,
            compute_left: Cell::new(0.),
            compute_utilization: 0.,
            allocated_compute: 0.,
            cache: UtilizationCache::new(),
        })
    }

    /// Compute work in MI to be done before the next I/O issue.
    pub fn compute_until_next_issue(&self) -> f64 {
        let u = self.compute_utilization;
        let mut interval = 0.;
        if u > MIN_COMPUTE_UTILIZATION {
            interval = (1. - self.b * u) / (self.a * u);
        }
        interval * self.allocated_compute * u
    }

    /// Accounts compute work in MI done since the last update.
    pub fn update_compute_left(&mut self, done: f64) {
        self.compute_left.set(self.compute_left.get() - done);
    }

    pub fn compute_left(&self) -> f64 {
        self.compute_left.get()
    }

    pub fn set_compute_utilization(&mut self, utilization: f64) {
        self.compute_utilization = utilization;
    }

    pub fn set_allocated_compute(&mut self, rate: f64) {
        self.allocated_compute = rate;
    }
}

impl UtilizationModel for IoBurstUtilization {
    fn utilization(&self, time: f64) -> f64 {
        if let Some(utilization) = self.cache.get(time) {
            return utilization;
        }
        let mut utilization = 0.;
        if self.compute_left.get() <= 0. {
            self.compute_left.set(self.compute_until_next_issue());
            utilization = self.model.utilization(time);
        }
        self.cache.insert(time, utilization);
        utilization
    }

    fn cache(&self) -> &UtilizationCache {
        &self.cache
    }
}
