use tracing::trace;

use crate::distance::DistanceModel;
use crate::domain::types::LocationId;
use crate::evaluation::fitness::dist_between;

/// Greedy construction from `start`. Returns `[start, ..stops]` in visiting
/// order. Equal distances go to the candidate that comes first in `stops`.
pub fn nearest_neighbor(
    start: LocationId,
    stops: &[LocationId],
    model: &DistanceModel,
) -> Vec<LocationId> {
    let mut route = Vec::with_capacity(stops.len() + 1);
    route.push(start);

    let mut unvisited: Vec<LocationId> = stops.to_vec();
    let mut current = start;
    while !unvisited.is_empty() {
        let mut best_idx = 0;
        let mut best_dist = dist_between(current, unvisited[0], model);
        for (idx, &candidate) in unvisited.iter().enumerate().skip(1) {
            let d = dist_between(current, candidate, model);
            if d < best_dist {
                best_idx = idx;
                best_dist = d;
            }
        }
        current = unvisited.remove(best_idx);
        trace!("nearest neighbour picked {} at {:.2}", current, best_dist);
        route.push(current);
    }
    route
}
