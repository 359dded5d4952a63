//! Config utils.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Parses config value string, which consists of two parts - name and options.
/// Example: StaticThreshold[compute=0.8,io=0.8] parts are name StaticThreshold and options string
/// "compute=0.8,io=0.8".
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.trim().to_string(), Some(r.to_string().replace(']', ""))),
        None => (config_str.trim().to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
///
/// # Examples
///
/// ```rust
/// use dslab_iops::core::config::options::parse_options;
///
/// let options = parse_options("compute=0.8,io=0.7");
/// assert_eq!(options.get("compute").unwrap(), "0.8");
/// assert_eq!(options.get("io").unwrap(), "0.7");
/// assert_eq!(options.get("safety"), None);
/// ```
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    options
}

/// Parsed options of a single config value.
pub struct Options {
    component: String,
    values: HashMap<String, String>,
}

impl Options {
    pub fn new(component: &str, options_str: &Option<String>) -> Self {
        Self {
            component: component.to_string(),
            values: options_str.as_deref().map(parse_options).unwrap_or_default(),
        }
    }

    /// Returns the parsed option value or `default` if the option is absent.
    pub fn get_or<T: FromStr>(&self, name: &str, default: T) -> Result<T> {
        match self.values.get(name) {
            Some(_) => self.get(name),
            None => Ok(default),
        }
    }

    /// Returns the parsed option value, failing if the option is absent or malformed.
    pub fn get<T: FromStr>(&self, name: &str) -> Result<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| Error::Config(format!("{}: missing option {}", self.component, name)))?;
        value
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{}: can't parse option {}={}", self.component, name, value)))
    }
}
