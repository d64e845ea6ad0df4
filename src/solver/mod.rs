pub mod loading;
pub mod routing;

pub use loading::{build_manifest, load_vehicle, LoadSummary, SkipReason};
pub use routing::{calculate_route_distance, optimize_route, RoutePlan};
