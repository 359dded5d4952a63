pub mod options;
pub mod policy_config;
