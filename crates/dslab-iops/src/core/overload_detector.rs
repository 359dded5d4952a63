//! Host overload detection.

use dyn_clone::{clone_trait_object, DynClone};

use crate::core::config::options::{parse_config_value, Options};
use crate::core::monitoring::HostSnapshot;
use crate::core::overload_detectors::interquartile_range::InterQuartileRange;
use crate::core::overload_detectors::local_regression::LocalRegression;
use crate::core::overload_detectors::static_threshold::StaticThreshold;
use crate::error::{Error, Result};

/// Outcome of overload detection together with the values it was based on.
#[derive(Clone, Debug, PartialEq)]
pub struct OverloadDecision {
    pub overloaded: bool,
    pub compute_utilization: f64,
    pub io_utilization: f64,
    pub compute_threshold: f64,
    pub io_threshold: f64,
    /// Set when the detector deferred to its fallback.
    pub used_fallback: bool,
}

/// Trait for implementation of overload detection strategies.
///
/// Detection is a pure function of the host snapshot. The migration policy engine records each returned decision.
pub trait OverloadDetector: DynClone {
    fn detect(&self, host: &HostSnapshot) -> OverloadDecision;
}

clone_trait_object!(OverloadDetector);

/// Creates overload detector from a config string.
///
/// `compute_weight` and `io_weight` are used by the statistical detectors to combine dimensions.
pub fn overload_detector_resolver(
    config_str: &str,
    compute_weight: f64,
    io_weight: f64,
) -> Result<Box<dyn OverloadDetector>> {
    let (detector_name, options_str) = parse_config_value(config_str);
    let options = Options::new(&detector_name, &options_str);
    match detector_name.as_str() {
        "StaticThreshold" => Ok(Box::new(StaticThreshold::new(
            options.get_or("compute", 0.8)?,
            options.get_or("io", 0.8)?,
        )?)),
        "InterQuartileRange" => {
            let fallback = StaticThreshold::new(
                options.get_or("fallback_compute", 0.7)?,
                options.get_or("fallback_io", 0.7)?,
            )?;
            Ok(Box::new(InterQuartileRange::new(
                options.get_or("safety", 1.5)?,
                compute_weight,
                io_weight,
                Box::new(fallback),
            )?))
        }
        "LocalRegression" => {
            let fallback = StaticThreshold::new(
                options.get_or("fallback_compute", 0.7)?,
                options.get_or("fallback_io", 0.7)?,
            )?;
            Ok(Box::new(LocalRegression::new(
                options.get_or("safety", 1.2)?,
                options.get_or("scheduling_interval", 300.)?,
                compute_weight,
                io_weight,
                Box::new(fallback),
            )?))
        }
        _ => Err(Error::Config(format!("can't resolve overload detector: {}", config_str))),
    }
}
