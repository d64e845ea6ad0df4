pub mod nearest_neighbor;
pub mod two_opt;

use tracing::{debug, info, span, Level};

use crate::distance::DistanceModel;
use crate::domain::types::{LocationId, Manifest, Route};
use crate::domain::vehicle::Vehicle;
use crate::error::Result;
pub use crate::evaluation::fitness::calculate_route_distance;

pub use nearest_neighbor::nearest_neighbor;
pub use two_opt::two_opt;

/// One optimized tier: the full path including its fixed endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedPath {
    pub path: Vec<LocationId>,
    pub construction_distance: f64,
    pub optimized_distance: f64,
    pub swaps: usize,
}

impl OptimizedPath {
    /// Stops strictly between the fixed endpoints.
    pub fn stops(&self, fixed_end: bool) -> Vec<LocationId> {
        let end = if fixed_end {
            self.path.len().saturating_sub(1)
        } else {
            self.path.len()
        };
        self.path.get(1..end).map(<[_]>::to_vec).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub priority: OptimizedPath,
    pub standard: OptimizedPath,
}

impl RoutePlan {
    pub fn route(&self) -> Route {
        Route {
            priority: self.priority.stops(false),
            standard: self.standard.stops(true),
        }
    }

    pub fn total_distance(&self) -> f64 {
        self.priority.optimized_distance + self.standard.optimized_distance
    }
}

/// Nearest neighbour from `start`, then 2-opt. With `return_to` the path ends
/// at that fixed location.
pub fn optimize_path(
    start: LocationId,
    stops: &[LocationId],
    return_to: Option<LocationId>,
    model: &DistanceModel,
) -> OptimizedPath {
    if stops.is_empty() {
        return OptimizedPath {
            path: Vec::new(),
            construction_distance: 0.0,
            optimized_distance: 0.0,
            swaps: 0,
        };
    }
    let mut path = nearest_neighbor(start, stops, model);
    path.extend(return_to);
    let construction_distance = calculate_route_distance(&path, model);
    let swaps = two_opt(&mut path, model, return_to.is_some());
    let optimized_distance = calculate_route_distance(&path, model);
    OptimizedPath {
        path,
        construction_distance,
        optimized_distance,
        swaps,
    }
}

fn manifest_stops(manifest: &Manifest, model: &DistanceModel) -> Result<Vec<LocationId>> {
    manifest.keys().map(|dest| model.resolve(dest)).collect()
}

/// Orders the vehicle's manifests and stores the resulting route on it. The
/// priority tier is an open path from the vehicle's location; the standard
/// tier starts where the priority tier ends and finishes at the depot.
pub fn optimize_route(vehicle: &mut Vehicle, model: &DistanceModel) -> Result<RoutePlan> {
    let span = span!(Level::INFO, "optimize", vehicle = vehicle.id().0);
    let _g = span.enter();

    let priority_stops = manifest_stops(&vehicle.manifest().priority, model)?;
    let standard_stops = manifest_stops(&vehicle.manifest().standard, model)?;

    let priority = optimize_path(vehicle.location(), &priority_stops, None, model);
    let standard_start = priority.path.last().copied().unwrap_or(vehicle.location());
    let standard = optimize_path(standard_start, &standard_stops, Some(model.depot()), model);

    debug!(
        "Priority tier: {} stops, {:.2} -> {:.2} miles after {} swaps",
        priority_stops.len(),
        priority.construction_distance,
        priority.optimized_distance,
        priority.swaps
    );
    debug!(
        "Standard tier: {} stops, {:.2} -> {:.2} miles after {} swaps",
        standard_stops.len(),
        standard.construction_distance,
        standard.optimized_distance,
        standard.swaps
    );

    let plan = RoutePlan { priority, standard };
    vehicle.set_route(plan.route());
    info!(
        "Vehicle {} route: {} stops, {:.2} miles planned",
        vehicle.id(),
        vehicle.route().len(),
        vehicle.planned_miles(model)
    );
    Ok(plan)
}
