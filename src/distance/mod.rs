pub mod locations;
pub mod matrix;
pub mod model;

pub use locations::LocationTable;
pub use matrix::{floyd_warshall, ClosedDistanceMatrix, RawDistanceMatrix};
pub use model::DistanceModel;
