//! Log of overload decisions kept for offline analysis.

use std::fs::File;

use serde::Serialize;

use crate::core::overload_detector::OverloadDecision;
use crate::error::Result;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DecisionRecord {
    pub time: f64,
    pub host_id: u32,
    pub compute_utilization: f64,
    pub io_utilization: f64,
    pub compute_threshold: f64,
    pub io_threshold: f64,
    pub used_fallback: bool,
    pub overloaded: bool,
}

#[derive(Default)]
pub struct DecisionHistory {
    records: Vec<DecisionRecord>,
}

impl DecisionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, time: f64, host_id: u32, decision: &OverloadDecision) {
        self.records.push(DecisionRecord {
            time,
            host_id,
            compute_utilization: decision.compute_utilization,
            io_utilization: decision.io_utilization,
            compute_threshold: decision.compute_threshold,
            io_threshold: decision.io_threshold,
            used_fallback: decision.used_fallback,
            overloaded: decision.overloaded,
        });
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    pub fn host_records(&self, host_id: u32) -> impl Iterator<Item = &DecisionRecord> {
        self.records.iter().filter(move |r| r.host_id == host_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
