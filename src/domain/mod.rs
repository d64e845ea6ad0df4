pub mod address;
pub mod package;
pub mod registry;
pub mod types;
pub mod vehicle;
pub mod views;

pub use address::Address;
pub use package::{Package, Timeline};
pub use registry::PackageRegistry;
pub use types::*;
pub use vehicle::{DispatchOutcome, TravelEvent, Vehicle, VehicleState};
pub use views::{GroupView, PriorityView};
