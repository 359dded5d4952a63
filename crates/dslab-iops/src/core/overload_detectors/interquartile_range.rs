//! Interquartile range overload detector.

use crate::core::monitoring::HostSnapshot;
use crate::core::overload_detector::{OverloadDecision, OverloadDetector};
use crate::core::stats::{count_non_zero_beginning, iqr};
use crate::error::{Error, Result};

/// Minimal number of history samples (before the zero tail) needed in each dimension.
pub const MIN_HISTORY_SAMPLES: usize = 12;

/// Derives the threshold of each dimension from its history as `1 - safety * IQR` and compares the weighted sum of
/// current utilizations with the weighted sum of thresholds.
///
/// With insufficient history in any dimension the decision is taken by the fallback detector.
#[derive(Clone)]
pub struct InterQuartileRange {
    safety: f64,
    compute_weight: f64,
    io_weight: f64,
    fallback: Box<dyn OverloadDetector>,
}

impl InterQuartileRange {
    pub fn new(
        safety: f64,
        compute_weight: f64,
        io_weight: f64,
        fallback: Box<dyn OverloadDetector>,
    ) -> Result<Self> {
        if safety < 0. {
            return Err(Error::invalid_parameter("safety", safety));
        }
        if compute_weight < 0. {
            return Err(Error::invalid_parameter("compute_weight", compute_weight));
        }
        if io_weight < 0. {
            return Err(Error::invalid_parameter("io_weight", io_weight));
        }
        Ok(Self {
            safety,
            compute_weight,
            io_weight,
            fallback,
        })
    }

    fn threshold(&self, history: &[f64]) -> Option<f64> {
        if count_non_zero_beginning(history) < MIN_HISTORY_SAMPLES {
            return None;
        }
        Some(1. - self.safety * iqr(history))
    }
}

impl OverloadDetector for InterQuartileRange {
    fn detect(&self, host: &HostSnapshot) -> OverloadDecision {
        let thresholds = (self.threshold(&host.compute_history), self.threshold(&host.io_history));
        let (compute_threshold, io_threshold) = match thresholds {
            (Some(compute), Some(io)) => (compute, io),
            _ => {
                let mut decision = self.fallback.detect(host);
                decision.used_fallback = true;
                return decision;
            }
        };
        let compute_utilization = host.compute_utilization();
        let io_utilization = host.io_utilization();
        let utilization = self.compute_weight * compute_utilization + self.io_weight * io_utilization;
        let threshold = self.compute_weight * compute_threshold + self.io_weight * io_threshold;
        OverloadDecision {
            overloaded: utilization > threshold,
            compute_utilization,
            io_utilization,
            compute_threshold,
            io_threshold,
            used_fallback: false,
        }
    }
}
