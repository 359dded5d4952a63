//! Bounded utilization history.

use std::collections::VecDeque;

use crate::core::stats::median;

/// Default number of samples kept in a history.
pub const HISTORY_LENGTH: usize = 30;

/// Most-recent-first sequence of utilization fractions, one per scheduling interval.
#[derive(Clone, Debug)]
pub struct UtilizationHistory {
    samples: VecDeque<f64>,
    max_length: usize,
}

impl Default for UtilizationHistory {
    fn default() -> Self {
        Self::new(HISTORY_LENGTH)
    }
}

impl UtilizationHistory {
    pub fn new(max_length: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_length),
            max_length,
        }
    }

    /// Prepends the sample, dropping the oldest one when the history is full.
    pub fn add(&mut self, sample: f64) {
        self.samples.push_front(sample);
        self.samples.truncate(self.max_length);
    }

    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        self.samples.get(i).copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Mean usage in absolute units (utilization scaled by `capacity`).
    pub fn mean(&self, capacity: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.;
        }
        self.samples.iter().map(|u| u * capacity).sum::<f64>() / self.samples.len() as f64
    }

    /// Variance of usage in absolute units.
    pub fn variance(&self, capacity: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.;
        }
        let mean = self.mean(capacity);
        self.samples.iter().map(|u| (u * capacity - mean).powi(2)).sum::<f64>() / self.samples.len() as f64
    }

    /// Median absolute deviation of the utilization fractions.
    ///
    /// Unlike `mean` and `variance`, the result is not scaled by capacity.
    pub fn mad(&self) -> f64 {
        let samples = self.samples();
        let m = median(&samples);
        let deviations: Vec<f64> = samples.iter().map(|u| (u - m).abs()).collect();
        median(&deviations)
    }
}
