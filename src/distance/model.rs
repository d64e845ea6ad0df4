use crate::distance::locations::LocationTable;
use crate::distance::matrix::{ClosedDistanceMatrix, RawDistanceMatrix};
use crate::domain::types::LocationId;
use crate::error::{DispatchError, Result};

/// Location set plus closed all-pairs distances. Routing only ever sees this
/// type, so an unclosed matrix cannot reach the optimizer.
#[derive(Debug, Clone)]
pub struct DistanceModel {
    locations: LocationTable,
    matrix: ClosedDistanceMatrix,
}

impl DistanceModel {
    pub fn new(locations: LocationTable, matrix: ClosedDistanceMatrix) -> Result<Self> {
        if locations.len() != matrix.size() || locations.is_empty() {
            return Err(DispatchError::NonSquareMatrix {
                rows: matrix.size(),
                locations: locations.len(),
            });
        }
        Ok(Self { locations, matrix })
    }

    /// Closes `raw` before building the model.
    pub fn from_raw(locations: LocationTable, raw: RawDistanceMatrix) -> Result<Self> {
        if locations.len() != raw.size() {
            return Err(DispatchError::NonSquareMatrix {
                rows: raw.size(),
                locations: locations.len(),
            });
        }
        Self::new(locations, raw.close())
    }

    pub fn distance_between(&self, a: &str, b: &str) -> Result<f64> {
        let from = self.locations.resolve(a)?;
        let to = self.locations.resolve(b)?;
        Ok(self.distance(from, to))
    }

    /// Lookup by ids handed out by this model's [`resolve`](Self::resolve).
    pub fn distance(&self, from: LocationId, to: LocationId) -> f64 {
        self.matrix.get(from.0, to.0)
    }

    pub fn resolve(&self, address: &str) -> Result<LocationId> {
        self.locations.resolve(address)
    }

    pub fn is_known(&self, address: &str) -> bool {
        self.locations.contains(address)
    }

    pub fn address(&self, id: LocationId) -> &str {
        self.locations.key(id)
    }

    pub fn depot(&self) -> LocationId {
        LocationId::DEPOT
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> DistanceModel {
        let locations = LocationTable::from_keys(["DEPOT".to_string(), "X".into(), "Y".into()]);
        let raw = RawDistanceMatrix::from_rows(vec![
            vec![0.0, 2.0, 5.0],
            vec![0.0, 0.0, 3.0],
            vec![0.0, 0.0, 0.0],
        ])
        .unwrap();
        DistanceModel::from_raw(locations, raw).unwrap()
    }

    #[test]
    fn lookup_is_symmetric() {
        let m = model();
        assert_eq!(m.distance_between("X", "Y").unwrap(), 3.0);
        assert_eq!(m.distance_between("Y", "X").unwrap(), 3.0);
        assert_eq!(m.distance_between("DEPOT", "DEPOT").unwrap(), 0.0);
    }

    #[test]
    fn unknown_location_is_surfaced() {
        let m = model();
        assert!(matches!(
            m.distance_between("X", "Z"),
            Err(DispatchError::UnknownLocation(a)) if a == "Z"
        ));
    }

    #[test]
    fn size_mismatch_rejected() {
        let locations = LocationTable::from_keys(["DEPOT".to_string()]);
        let raw = RawDistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        assert!(matches!(
            DistanceModel::from_raw(locations, raw),
            Err(DispatchError::NonSquareMatrix { rows: 2, locations: 1 })
        ));
    }
}
