use std::fs::File;
use std::io::BufReader;

use tracing::{debug, info, span, warn, Level};

use crate::config::constant::{
    DAY_PLAN_PATH, DISTANCE_CSV_PATH, LOCATION_CSV_PATH, PACKAGE_CSV_PATH,
};
use crate::config::PlannerConfig;
use crate::distance::DistanceModel;
use crate::domain::registry::PackageRegistry;
use crate::domain::types::PackageStatus;
use crate::error::Result;
use crate::hub::Hub;
use crate::setup::ingest::{
    read_distances_from_path, read_locations_from_path, read_packages_from_path,
};
use crate::setup::init_types::DayPlan;

/// Reads the day plan. A missing file means a plain day: everything checked
/// in at the start, one wave with every vehicle.
pub fn read_day_plan(path: &str) -> Result<DayPlan> {
    match File::open(path) {
        Ok(file) => {
            let plan: DayPlan = serde_json::from_reader(BufReader::new(file))?;
            info!("Loaded day plan with {} waves from {}", plan.waves.len(), path);
            Ok(plan)
        }
        Err(err) => {
            warn!("No day plan at {} ({}), running a single wave", path, err);
            Ok(DayPlan::default())
        }
    }
}

/// Reads the three tables and builds the hub.
pub fn setup(config: PlannerConfig) -> Result<Hub> {
    let span = span!(Level::INFO, "setup");
    let _g = span.enter();

    let locations = read_locations_from_path(LOCATION_CSV_PATH)?;
    let raw = read_distances_from_path(DISTANCE_CSV_PATH)?;
    let model = DistanceModel::from_raw(locations, raw)?;
    let registry = PackageRegistry::from_packages(read_packages_from_path(PACKAGE_CSV_PATH)?);
    Ok(Hub::new(model, registry, config))
}

pub fn setup_with_plan(config: PlannerConfig) -> Result<(Hub, DayPlan)> {
    let hub = setup(config)?;
    let plan = read_day_plan(DAY_PLAN_PATH)?;
    Ok((hub, plan))
}

/// Start-of-day scan plus the standing constraints from the plan.
pub fn open_day(hub: &mut Hub, plan: &DayPlan) -> Result<()> {
    let start = hub.config().day_start;
    let ids: Vec<_> = hub.registry().all_packages().iter().map(|p| p.id).collect();
    for id in ids {
        if plan.held.contains(&id) {
            debug!("Package {} has not arrived yet", id);
            continue;
        }
        let status_override = plan
            .address_invalid
            .contains(&id)
            .then_some(PackageStatus::AddressInvalid);
        hub.check_in(id, start, status_override)?;
    }
    for restriction in &plan.restrictions {
        hub.restrict_to_vehicle(restriction.package, restriction.vehicle)?;
    }
    for binding in &plan.bindings {
        hub.bind_packages(binding.iter().copied())?;
    }
    info!(
        "Day opened at {}: {} packages ready, {} held",
        start.format("%H:%M"),
        hub.registry().ready_pool().len(),
        plan.held.len()
    );
    Ok(())
}
