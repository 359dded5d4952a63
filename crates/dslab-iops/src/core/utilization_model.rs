//! Resource utilization models.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Write};

use dyn_clone::{clone_trait_object, DynClone};
use indexmap::IndexMap;
use rand::prelude::*;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::core::config::options::{parse_config_value, Options};
use crate::core::utilization_models::io_gated_compute::IoGatedComputeUtilization;
use crate::error::{Error, Result};

/// A utilization model is a function of simulated time, which returns the fraction of resource capacity demanded by
/// a task at the moment.
///
/// Every model memoizes its results per exact timestamp: repeated queries for the same time return the cached value
/// and never recompute it. The cache lives as long as the model and is never pruned. It can be saved to and loaded
/// from a CSV stream with `time,utilization` records.
pub trait UtilizationModel: DynClone {
    fn utilization(&self, time: f64) -> f64;

    /// Returns utilization given the concurrent I/O utilization of the same task.
    /// Models that do not react to I/O contention ignore the second argument.
    fn utilization_under_io(&self, time: f64, _io_utilization: f64) -> f64 {
        self.utilization(time)
    }

    /// Whether [`utilization_under_io`](UtilizationModel::utilization_under_io) depends on I/O utilization.
    fn is_io_sensitive(&self) -> bool {
        false
    }

    fn cache(&self) -> &UtilizationCache;

    fn history(&self) -> Vec<(f64, f64)> {
        self.cache().entries()
    }

    fn save_history(&self, writer: &mut dyn Write) -> Result<()> {
        self.cache().save(writer)
    }

    /// Replaces the cache content with records read from the stream.
    fn load_history(&self, reader: &mut dyn Read) -> Result<()> {
        self.cache().load(reader)
    }

    fn save_history_to_file(&self, path: &str) -> Result<()> {
        let mut file = File::create(path)?;
        self.save_history(&mut file)
    }

    fn load_history_from_file(&self, path: &str) -> Result<()> {
        let mut file = File::open(path)?;
        self.load_history(&mut file)
    }
}

clone_trait_object!(UtilizationModel);

/// Creates a compute utilization model from a config string.
///
/// Supported values: `Full`, `Null`, `Constant[value=..]`, `Stochastic[seed=..]`,
/// `IoGated[cutoff=..,factor=..,seed=..]` (derates a stochastic model).
pub fn utilization_model_resolver(config_str: &str) -> Result<Box<dyn UtilizationModel>> {
    let (model_name, options_str) = parse_config_value(config_str);
    let options = Options::new(&model_name, &options_str);
    match model_name.as_str() {
        "Full" => Ok(Box::new(ConstantUtilization::full())),
        "Null" => Ok(Box::new(NullUtilization::new())),
        "Constant" => Ok(Box::new(ConstantUtilization::new(options.get("value")?)?)),
        "Stochastic" => Ok(Box::new(StochasticUtilization::new(options.get_or("seed", 123)?))),
        "IoGated" => {
            let inner = StochasticUtilization::new(options.get_or("seed", 123)?);
            Ok(Box::new(IoGatedComputeUtilization::new(
                Box::new(inner),
                options.get("cutoff")?,
                options.get("factor")?,
            )?))
        }
        _ => Err(Error::Config(format!("can't resolve utilization model: {}", config_str))),
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Serialize, Deserialize)]
struct CacheRecord {
    time: f64,
    utilization: f64,
}

/// Memoization table of utilization values keyed by the exact bits of the timestamp.
///
/// Uses interior mutability, so models can fill it from `&self` queries.
#[derive(Clone, Default)]
pub struct UtilizationCache {
    entries: RefCell<IndexMap<u64, f64>>,
}

impl UtilizationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, time: f64) -> Option<f64> {
        self.entries.borrow().get(&time.to_bits()).copied()
    }

    pub fn insert(&self, time: f64, utilization: f64) {
        self.entries.borrow_mut().insert(time.to_bits(), utilization);
    }

    /// Returns the cached value or computes, stores and returns a new one.
    pub fn get_or_insert_with<F>(&self, time: f64, f: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        if let Some(utilization) = self.get(time) {
            return utilization;
        }
        let utilization = f();
        self.insert(time, utilization);
        utilization
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Returns `(time, utilization)` pairs in insertion order.
    pub fn entries(&self) -> Vec<(f64, f64)> {
        self.entries
            .borrow()
            .iter()
            .map(|(time, utilization)| (f64::from_bits(*time), *utilization))
            .collect()
    }

    pub fn save(&self, writer: &mut dyn Write) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for (time, utilization) in self.entries() {
            wtr.serialize(CacheRecord { time, utilization })?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn load(&self, reader: &mut dyn Read) -> Result<()> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut entries = IndexMap::new();
        for record in rdr.deserialize() {
            let record: CacheRecord = record?;
            entries.insert(record.time.to_bits(), record.utilization);
        }
        *self.entries.borrow_mut() = entries;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Constant utilization, full demand by default.
#[derive(Clone)]
pub struct ConstantUtilization {
    value: f64,
    cache: UtilizationCache,
}

impl ConstantUtilization {
    pub fn new(value: f64) -> Result<Self> {
        if !(0. ..=1.).contains(&value) {
            return Err(Error::invalid_parameter("value", value));
        }
        Ok(Self {
            value,
            cache: UtilizationCache::new(),
        })
    }

    pub fn full() -> Self {
        Self {
            value: 1.,
            cache: UtilizationCache::new(),
        }
    }
}

impl UtilizationModel for ConstantUtilization {
    fn utilization(&self, time: f64) -> f64 {
        self.cache.get_or_insert_with(time, || self.value)
    }

    fn cache(&self) -> &UtilizationCache {
        &self.cache
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Zero demand. Replaces the model of a finished resource dimension.
#[derive(Clone, Default)]
pub struct NullUtilization {
    cache: UtilizationCache,
}

impl NullUtilization {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UtilizationModel for NullUtilization {
    fn utilization(&self, time: f64) -> f64 {
        self.cache.get_or_insert_with(time, || 0.)
    }

    fn cache(&self) -> &UtilizationCache {
        &self.cache
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Uniformly distributed random utilization, drawn once per timestamp.
#[derive(Clone)]
pub struct StochasticUtilization {
    rng: RefCell<Pcg64>,
    cache: UtilizationCache,
}

impl StochasticUtilization {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RefCell::new(Pcg64::seed_from_u64(seed)),
            cache: UtilizationCache::new(),
        }
    }
}

impl UtilizationModel for StochasticUtilization {
    fn utilization(&self, time: f64) -> f64 {
        self.cache
            .get_or_insert_with(time, || self.rng.borrow_mut().gen_range(0.0..1.0))
    }

    fn cache(&self) -> &UtilizationCache {
        &self.cache
    }
}
