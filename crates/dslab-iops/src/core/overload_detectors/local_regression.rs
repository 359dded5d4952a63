//! Local regression overload detector.

use crate::core::monitoring::HostSnapshot;
use crate::core::overload_detector::{OverloadDecision, OverloadDetector};
use crate::core::overload_detectors::interquartile_range::MIN_HISTORY_SAMPLES;
use crate::core::stats::{count_non_zero_beginning, robust_loess};
use crate::error::{Error, Result};

/// Number of the most recent samples the regression is fitted to.
pub const REGRESSION_WINDOW: usize = 10;

/// Predicts the utilization of each dimension at the time the slowest VM of the host could be migrated away, using
/// a robust local regression over the recent history. The prediction is multiplied by `safety`, and the host is
/// overloaded when the weighted sum of predictions reaches the weighted sum of full utilization.
///
/// Decisions carry the predicted utilizations and unit thresholds. With insufficient history in any dimension the
/// decision is taken by the fallback detector.
#[derive(Clone)]
pub struct LocalRegression {
    safety: f64,
    scheduling_interval: f64,
    compute_weight: f64,
    io_weight: f64,
    fallback: Box<dyn OverloadDetector>,
}

impl LocalRegression {
    pub fn new(
        safety: f64,
        scheduling_interval: f64,
        compute_weight: f64,
        io_weight: f64,
        fallback: Box<dyn OverloadDetector>,
    ) -> Result<Self> {
        if safety < 0. {
            return Err(Error::invalid_parameter("safety", safety));
        }
        if scheduling_interval <= 0. {
            return Err(Error::invalid_parameter("scheduling_interval", scheduling_interval));
        }
        if compute_weight < 0. {
            return Err(Error::invalid_parameter("compute_weight", compute_weight));
        }
        if io_weight < 0. {
            return Err(Error::invalid_parameter("io_weight", io_weight));
        }
        Ok(Self {
            safety,
            scheduling_interval,
            compute_weight,
            io_weight,
            fallback,
        })
    }

    fn predict(&self, history: &[f64], migration_intervals: f64) -> Option<f64> {
        if count_non_zero_beginning(history) < MIN_HISTORY_SAMPLES {
            return None;
        }
        let mut window: Vec<f64> = history.iter().take(REGRESSION_WINDOW).copied().collect();
        window.reverse();
        let (intercept, slope) = robust_loess(&window)?;
        Some(self.safety * (intercept + slope * (window.len() as f64 + migration_intervals)))
    }
}

impl OverloadDetector for LocalRegression {
    fn detect(&self, host: &HostSnapshot) -> OverloadDecision {
        let max_migration_time = host.vms.iter().map(|vm| vm.migration_time).fold(0., f64::max);
        let migration_intervals = if max_migration_time.is_finite() {
            (max_migration_time / self.scheduling_interval).ceil()
        } else {
            0.
        };
        let predictions = (
            self.predict(&host.compute_history, migration_intervals),
            self.predict(&host.io_history, migration_intervals),
        );
        let (compute_utilization, io_utilization) = match predictions {
            (Some(compute), Some(io)) => (compute, io),
            _ => {
                let mut decision = self.fallback.detect(host);
                decision.used_fallback = true;
                return decision;
            }
        };
        let utilization = self.compute_weight * compute_utilization + self.io_weight * io_utilization;
        OverloadDecision {
            overloaded: utilization >= self.compute_weight + self.io_weight,
            compute_utilization,
            io_utilization,
            compute_threshold: 1.,
            io_threshold: 1.,
            used_fallback: false,
        }
    }
}
