//! Error types.

use thiserror::Error;

/// Errors reported by component construction, configuration and persistence.
///
/// Allocation failures are not errors, they are reported as booleans or verdicts.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid value {value} for parameter {name}")]
    InvalidParameter { name: String, value: f64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("task #{task_id} has an I/O model incompatible with the scheduler coupling")]
    IncompatibleIoModel { task_id: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_parameter(name: &str, value: f64) -> Self {
        Error::InvalidParameter {
            name: name.to_string(),
            value,
        }
    }
}
