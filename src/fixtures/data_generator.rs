use chrono::NaiveTime;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::PlannerConfig;
use crate::distance::{DistanceModel, LocationTable, RawDistanceMatrix};
use crate::domain::address::Address;
use crate::domain::package::Package;
use crate::domain::registry::PackageRegistry;
use crate::domain::types::{Deadline, PackageId};
use crate::error::Result;
use crate::hub::Hub;

const FIXTURE_ZIP: &str = "84100";
const MAX_LEG_MILES: u32 = 30;

fn fixture_street(index: usize) -> String {
    if index == 0 {
        "1 DEPOT WAY".to_string()
    } else {
        format!("{} FIXTURE ST", index * 100)
    }
}

/// `(street, zipcode)` pairs for `size` locations; index 0 is the depot.
pub fn generate_locations(size: usize) -> Vec<(String, String)> {
    (0..size)
        .map(|i| (fixture_street(i), FIXTURE_ZIP.to_string()))
        .collect()
}

/// Whole-mile symmetric distances in `1..=30`.
pub fn generate_distance_rows(size: usize, seed: u64) -> Vec<Vec<f64>> {
    symmetric_rows(size, seed, |rng| f64::from(rng.gen_range(1..=MAX_LEG_MILES)))
}

/// Symmetric distances in tenths of a mile, `0.1..=15.0`, the precision of
/// the hub's distance table.
pub fn generate_fractional_distance_rows(size: usize, seed: u64) -> Vec<Vec<f64>> {
    symmetric_rows(size, seed, |rng| f64::from(rng.gen_range(1..=150u32)) / 10.0)
}

fn symmetric_rows(
    size: usize,
    seed: u64,
    mut leg: impl FnMut(&mut ChaCha8Rng) -> f64,
) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = vec![vec![0.0; size]; size];
    for i in 0..size {
        for j in (i + 1)..size {
            let d = leg(&mut rng);
            rows[i][j] = d;
            rows[j][i] = d;
        }
    }
    rows
}

pub fn generate_model(size: usize, seed: u64) -> Result<DistanceModel> {
    let pairs = generate_locations(size);
    let locations =
        LocationTable::from_addresses(pairs.iter().map(|(s, z)| (s.as_str(), z.as_str())));
    let raw = RawDistanceMatrix::from_rows(generate_distance_rows(size, seed))?;
    DistanceModel::from_raw(locations, raw)
}

fn random_deadline(rng: &mut ChaCha8Rng) -> Deadline {
    match rng.gen_range(0..6) {
        0 => Deadline::At(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)),
        1 | 2 => Deadline::At(NaiveTime::from_hms_opt(10, 30, 0).unwrap_or(NaiveTime::MIN)),
        _ => Deadline::EndOfDay,
    }
}

/// Packages `1..=count` bound for random non-depot locations.
pub fn generate_packages(count: usize, locations: usize, seed: u64) -> Vec<Package> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    (1..=count)
        .map(|id| {
            let dest = if locations > 1 {
                rng.gen_range(1..locations)
            } else {
                0
            };
            let deadline = random_deadline(&mut rng);
            let mass = f64::from(rng.gen_range(1..=90u32));
            Package::new(
                PackageId(id as u32),
                Address::new(&fixture_street(dest), "SALT LAKE CITY", "UT", FIXTURE_ZIP),
                deadline,
                mass,
                "",
            )
        })
        .collect()
}

/// A fresh hub on a random instance with the default planner config.
pub fn generate_hub(locations: usize, packages: usize, seed: u64) -> Result<Hub> {
    generate_hub_with(locations, packages, seed, PlannerConfig::default())
}

pub fn generate_hub_with(
    locations: usize,
    packages: usize,
    seed: u64,
    config: PlannerConfig,
) -> Result<Hub> {
    let model = generate_model(locations, seed)?;
    let registry = PackageRegistry::from_packages(generate_packages(packages, locations, seed));
    info!(
        "Generated instance: {} locations, {} packages, seed {}",
        locations, packages, seed
    );
    Ok(Hub::new(model, registry, config))
}
