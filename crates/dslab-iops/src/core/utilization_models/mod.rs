pub mod burst_coupled;
pub mod io_gated_compute;
pub mod ratio_coupled;

use crate::core::config::options::{parse_config_value, Options};
use crate::core::utilization_model::{NullUtilization, UtilizationCache, UtilizationModel};
use crate::core::utilization_models::burst_coupled::IoBurstUtilization;
use crate::core::utilization_models::ratio_coupled::IoRatioUtilization;
use crate::error::{Error, Result};

/// I/O model of a task, tagged by the way its demand is coupled to compute demand.
///
/// A finished I/O dimension is represented by `Finished`, which never demands I/O again.
#[derive(Clone)]
pub enum TaskIoModel {
    BurstCoupled(IoBurstUtilization),
    RatioCoupled(IoRatioUtilization),
    Finished(NullUtilization),
}

impl TaskIoModel {
    pub fn finished() -> Self {
        TaskIoModel::Finished(NullUtilization::new())
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TaskIoModel::Finished(_))
    }

    fn inner(&self) -> &dyn UtilizationModel {
        match self {
            TaskIoModel::BurstCoupled(model) => model,
            TaskIoModel::RatioCoupled(model) => model,
            TaskIoModel::Finished(model) => model,
        }
    }
}

impl UtilizationModel for TaskIoModel {
    fn utilization(&self, time: f64) -> f64 {
        self.inner().utilization(time)
    }

    fn cache(&self) -> &UtilizationCache {
        self.inner().cache()
    }
}

/// Creates a task I/O model from a config string.
///
/// Supported values: `BurstCoupled[a=..,b=..]` (bursts delegate to a copy of `compute_model`) and
/// `RatioCoupled[iops_per_mips=..]`.
pub fn task_io_model_resolver(
    config_str: &str,
    compute_model: &(dyn UtilizationModel + 'static),
) -> Result<TaskIoModel> {
    let (model_name, options_str) = parse_config_value(config_str);
    let options = Options::new(&model_name, &options_str);
    match model_name.as_str() {
        "BurstCoupled" => Ok(TaskIoModel::BurstCoupled(IoBurstUtilization::new(
            dyn_clone::clone_box(compute_model),
            options.get("a")?,
            options.get("b")?,
        )?)),
        "RatioCoupled" => Ok(TaskIoModel::RatioCoupled(IoRatioUtilization::new(
            options.get("iops_per_mips")?,
        )?)),
        _ => Err(Error::Config(format!("can't resolve task I/O model: {}", config_str))),
    }
}
