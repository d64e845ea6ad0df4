pub mod config;
pub mod distance;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod fixtures;
pub mod hub;
pub mod report;
pub mod runner;
pub mod setup;
pub mod solver;

pub use config::PlannerConfig;
pub use error::{DispatchError, Result};
pub use hub::Hub;
