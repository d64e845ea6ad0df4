pub mod fitness;

pub use fitness::{calculate_route_distance, dist_between};
