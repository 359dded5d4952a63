pub mod interquartile_range;
pub mod local_regression;
pub mod static_threshold;
