use crate::distance::DistanceModel;
use crate::domain::types::LocationId;

/// Sum of consecutive leg distances along `route`. The path is taken as given:
/// no depot legs are added. Empty and single-stop routes cost nothing.
pub fn calculate_route_distance(route: &[LocationId], model: &DistanceModel) -> f64 {
    route
        .windows(2)
        .map(|leg| dist_between(leg[0], leg[1], model))
        .sum()
}

pub fn dist_between(from_loc: LocationId, to_loc: LocationId, model: &DistanceModel) -> f64 {
    model.distance(from_loc, to_loc)
}
