mod day_partition_planner;
mod device_workflow;
mod fleet_provisioner;
mod fleet_report;
mod run_reporter;
mod time_series_encoder;

pub use day_partition_planner::*;
pub use device_workflow::*;
pub use fleet_provisioner::*;
pub use fleet_report::*;
pub use run_reporter::*;
pub use time_series_encoder::*;
