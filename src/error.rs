use crate::domain::types::{PackageId, PackageStatus, VehicleId};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown location: {0:?}")]
    UnknownLocation(String),
    #[error("unknown package: {0}")]
    UnknownPackage(PackageId),
    #[error("unknown vehicle: {0}")]
    UnknownVehicle(VehicleId),
    #[error("vehicle {vehicle} is at capacity ({capacity} packages), refusing package {package}")]
    CapacityExceeded {
        vehicle: VehicleId,
        package: PackageId,
        capacity: usize,
    },
    #[error("distance matrix is not square: {rows} rows for {locations} locations")]
    NonSquareMatrix { rows: usize, locations: usize },
    #[error("distance matrix is not closed: d[{i}][{j}] = {direct} > d[{i}][{k}] + d[{k}][{j}] = {via}")]
    UnclosedMatrix {
        i: usize,
        j: usize,
        k: usize,
        direct: f64,
        via: f64,
    },
    #[error("invalid distance {value} at ({row}, {col})")]
    InvalidDistance { row: usize, col: usize, value: f64 },
    #[error("package {package} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        package: PackageId,
        from: PackageStatus,
        to: PackageStatus,
    },
    #[error("vehicle {0} is not at the depot")]
    VehicleNotAtDepot(VehicleId),
    #[error("invalid deadline {0:?}")]
    InvalidDeadline(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
