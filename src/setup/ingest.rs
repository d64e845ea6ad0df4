use std::fs::File;
use std::io::Read;

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::distance::{LocationTable, RawDistanceMatrix};
use crate::domain::address::Address;
use crate::domain::package::Package;
use crate::domain::types::Deadline;
use crate::error::{DispatchError, Result};
use crate::setup::init_types::PackageRow;

/// Splits the single-cell form `"street\n(zipcode)"`.
fn split_address_cell(cell: &str) -> (String, String) {
    match cell.trim().rsplit_once('\n') {
        Some((street, zip)) => (
            street.trim().to_string(),
            zip.trim().trim_matches(|c| c == '(' || c == ')').to_string(),
        ),
        None => (cell.trim().to_string(), String::new()),
    }
}

/// Reads the location table. Rows are `street,zipcode` or a single
/// `"street\n(zipcode)"` cell; the first row is the depot.
pub fn read_locations<R: Read>(reader: R) -> Result<LocationTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut pairs: Vec<(String, String)> = Vec::new();
    for row in reader.records() {
        let record = row?;
        let (street, zip) = match (record.get(0), record.get(1)) {
            (Some(street), Some(zip)) if !zip.is_empty() => (street.to_string(), zip.to_string()),
            (Some(cell), _) if !cell.is_empty() => split_address_cell(cell),
            _ => continue,
        };
        pairs.push((street, zip));
    }
    debug!("Read {} locations", pairs.len());
    Ok(LocationTable::from_addresses(
        pairs.iter().map(|(s, z)| (s.as_str(), z.as_str())),
    ))
}

/// Reads a triangular distance table. Blank cells are unmeasured; a row may
/// stop early.
pub fn read_distances<R: Read>(reader: R) -> Result<RawDistanceMatrix> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut cells: Vec<Vec<Option<f64>>> = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let record = row?;
        let mut parsed = Vec::with_capacity(record.len());
        for (col_idx, raw) in record.iter().enumerate() {
            if raw.is_empty() {
                parsed.push(None);
                continue;
            }
            let value = raw.parse::<f64>().map_err(|_| DispatchError::InvalidDistance {
                row: row_idx,
                col: col_idx,
                value: f64::NAN,
            })?;
            parsed.push(Some(value));
        }
        while parsed.last() == Some(&None) {
            parsed.pop();
        }
        cells.push(parsed);
    }
    let size = cells.len();
    RawDistanceMatrix::from_triangular(&cells, size)
}

pub fn package_from_row(row: PackageRow) -> Result<Package> {
    let deadline: Deadline = row.deadline.parse()?;
    Ok(Package::new(
        row.id,
        Address::new(&row.street, &row.city, &row.state, &row.zipcode),
        deadline,
        row.mass,
        row.notes,
    ))
}

/// Reads the package table; the first row is a header.
pub fn read_packages<R: Read>(reader: R) -> Result<Vec<Package>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut packages = Vec::new();
    for row in reader.deserialize::<PackageRow>() {
        packages.push(package_from_row(row?)?);
    }
    debug!("Read {} packages", packages.len());
    Ok(packages)
}

pub fn read_locations_from_path(path: &str) -> Result<LocationTable> {
    let table = read_locations(File::open(path)?)?;
    info!("Loaded {} locations from {}", table.len(), path);
    Ok(table)
}

pub fn read_distances_from_path(path: &str) -> Result<RawDistanceMatrix> {
    let matrix = read_distances(File::open(path)?)?;
    info!("Loaded {}x{} distance table from {}", matrix.size(), matrix.size(), path);
    Ok(matrix)
}

pub fn read_packages_from_path(path: &str) -> Result<Vec<Package>> {
    let packages = read_packages(File::open(path)?)?;
    info!("Loaded {} packages from {}", packages.len(), path);
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UNREACHABLE_DISTANCE;
    use crate::domain::types::{LocationId, PackageId};
    use chrono::NaiveTime;

    #[test]
    fn locations_in_both_layouts() {
        let csv = "\"4001 South 700 East\n(84107)\"\n1060 Dalton Ave S,84104\n";
        let table = read_locations(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.key(LocationId(0)), "4001 S 700 E 84107");
        assert_eq!(table.resolve("1060 DALTON AVE S 84104").unwrap(), LocationId(1));
    }

    #[test]
    fn ragged_lower_triangle() {
        let csv = "0\n7.2,0\n3.8,7.1,0\n";
        let raw = read_distances(csv.as_bytes()).unwrap();
        assert_eq!(raw.size(), 3);
        assert_eq!(raw.get(0, 1), 7.2);
        assert_eq!(raw.get(1, 0), 7.2);
        assert_eq!(raw.get(2, 1), 7.1);
    }

    #[test]
    fn unmeasured_pairs_get_sentinel() {
        let csv = "0,,\n,0,\n1.5,,0\n";
        let raw = read_distances(csv.as_bytes()).unwrap();
        assert_eq!(raw.get(0, 2), 1.5);
        assert_eq!(raw.get(0, 1), UNREACHABLE_DISTANCE);
    }

    #[test]
    fn non_numeric_distance_rejected() {
        let csv = "0\nfar,0\n";
        assert!(matches!(
            read_distances(csv.as_bytes()),
            Err(DispatchError::InvalidDistance { row: 1, col: 0, .. })
        ));
    }

    #[test]
    fn packages_with_header() {
        let csv = "id,street,city,state,zipcode,deadline,mass,notes\n\
                   1,195 W Oakland Ave,Salt Lake City,UT,84115,10:30 AM,21,\n\
                   2,2530 S 500 East,Salt Lake City,UT,84106,EOD,44,Can only be on truck 2\n";
        let packages = read_packages(csv.as_bytes()).unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].id, PackageId(1));
        assert_eq!(
            packages[0].deadline,
            Deadline::At(NaiveTime::from_hms_opt(10, 30, 0).unwrap())
        );
        assert_eq!(packages[1].destination(), "2530 S 500 E 84106");
        assert_eq!(packages[1].notes, "Can only be on truck 2");
    }

    #[test]
    fn bad_deadline_rejected() {
        let csv = "id,street,city,state,zipcode,deadline,mass,notes\n1,1 A St,X,Y,1,noonish,1,\n";
        assert!(matches!(
            read_packages(csv.as_bytes()),
            Err(DispatchError::InvalidDeadline(_))
        ));
    }
}
