use itertools::Itertools;
use tracing::trace;

use crate::distance::DistanceModel;
use crate::domain::types::LocationId;
use crate::evaluation::fitness::calculate_route_distance;

const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// First-improvement 2-opt. Position 0 never moves; with `fixed_end` the last
/// position stays put as well. Every accepted reversal restarts the scan, and
/// the search ends after a full scan without a strict improvement.
///
/// Returns the number of reversals applied.
pub fn two_opt(route: &mut [LocationId], model: &DistanceModel, fixed_end: bool) -> usize {
    let last_movable = if fixed_end {
        route.len().saturating_sub(2)
    } else {
        route.len().saturating_sub(1)
    };
    if last_movable < 2 {
        return 0;
    }

    let mut best = calculate_route_distance(route, model);
    let mut swaps = 0;
    'scan: loop {
        for (i, j) in (1..=last_movable).tuple_combinations() {
            route[i..=j].reverse();
            let candidate = calculate_route_distance(route, model);
            if candidate < best - IMPROVEMENT_EPSILON {
                trace!("2-opt reversed {}..={}: {:.2} -> {:.2}", i, j, best, candidate);
                best = candidate;
                swaps += 1;
                continue 'scan;
            }
            route[i..=j].reverse();
        }
        break;
    }
    swaps
}
