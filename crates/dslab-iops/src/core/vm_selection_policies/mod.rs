pub mod maximum_io_utilization;
pub mod maximum_weighted_utilization;
pub mod minimum_migration_time;
pub mod minimum_utilization;
pub mod random_selection;
