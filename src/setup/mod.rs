pub mod ingest;
pub mod init;
pub mod init_types;

pub use init::{open_day, read_day_plan, setup, setup_with_plan};
pub use init_types::{DayPlan, WavePlan};
