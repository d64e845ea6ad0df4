use chrono::NaiveTime;

use hub_dispatch::config::PlannerConfig;
use hub_dispatch::distance::DistanceModel;
use hub_dispatch::domain::{PackageId, PackageRegistry, PackageStatus, VehicleId};
use hub_dispatch::fixtures::data_generator::generate_hub;
use hub_dispatch::hub::Hub;
use hub_dispatch::report::DayReport;
use hub_dispatch::runner::run_day;
use hub_dispatch::setup::ingest::{read_distances, read_locations, read_packages};
use hub_dispatch::setup::DayPlan;

const LOCATIONS: &str = include_str!("../data/locations.csv");
const DISTANCES: &str = include_str!("../data/distances.csv");
const PACKAGES: &str = include_str!("../data/packages.csv");
const PLAN: &str = include_str!("../data/day_plan.json");

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn sample_hub(config: PlannerConfig) -> Hub {
    let locations = read_locations(LOCATIONS.as_bytes()).unwrap();
    let raw = read_distances(DISTANCES.as_bytes()).unwrap();
    let model = DistanceModel::from_raw(locations, raw).unwrap();
    let registry = PackageRegistry::from_packages(read_packages(PACKAGES.as_bytes()).unwrap());
    Hub::new(model, registry, config)
}

fn sample_plan() -> DayPlan {
    serde_json::from_str(PLAN).unwrap()
}

#[test]
fn sample_day_delivers_everything_on_time() {
    let mut hub = sample_hub(PlannerConfig::default());
    run_day(&mut hub, &sample_plan()).unwrap();

    let report = DayReport::from_hub(&hub);
    assert!(report.undelivered.is_empty(), "undelivered: {:?}", report.undelivered);
    assert!(report.late.is_empty(), "late: {:?}", report.late);
    assert_eq!(report.delivered, 12);
    assert!(report.all_on_time());
    assert!(report.total_miles > 0.0);
    assert_eq!(
        report.total_miles,
        report.vehicles.iter().map(|v| v.miles).sum::<f64>()
    );
}

#[test]
fn sample_day_honours_constraints() {
    let mut hub = sample_hub(PlannerConfig::default());
    run_day(&mut hub, &sample_plan()).unwrap();
    let registry = hub.registry();

    // Restricted to truck 2.
    assert_eq!(registry.lookup(PackageId(3)).unwrap().vehicle(), Some(VehicleId(2)));
    // Bound packages travel together.
    let ten = registry.lookup(PackageId(10)).unwrap();
    let eleven = registry.lookup(PackageId(11)).unwrap();
    assert_eq!(ten.vehicle(), eleven.vehicle());
    assert_eq!(ten.timeline().loaded, eleven.timeline().loaded);
    // Late arrival leaves after it arrives.
    let six = registry.lookup(PackageId(6)).unwrap();
    assert_eq!(six.timeline().checked_in, Some(t(9, 5)));
    assert!(six.timeline().loaded.unwrap() >= t(9, 5));
    // Corrected address is delivered to the new destination after the fix.
    let nine = registry.lookup(PackageId(9)).unwrap();
    assert_eq!(nine.destination(), "410 S STATE ST 84111");
    assert!(nine.timeline().loaded.unwrap() >= t(10, 20));
    assert_eq!(nine.status(), PackageStatus::Delivered);
}

#[test]
fn snapshot_reconstructs_earlier_statuses() {
    let mut hub = sample_hub(PlannerConfig::default());
    run_day(&mut hub, &sample_plan()).unwrap();
    let snapshot = hub.registry().snapshot_at(t(7, 59));
    assert_eq!(snapshot[&PackageStatus::NotArrived].len(), 12);

    let at_nine = hub.registry().snapshot_at(t(9, 0));
    assert!(at_nine[&PackageStatus::NotArrived].contains(&PackageId(6)));
    assert!(at_nine[&PackageStatus::Delivered].contains(&PackageId(4)));
}

#[test]
fn deferring_bound_packages_moves_them_off_the_first_wave() {
    let config = PlannerConfig {
        defer_bound_on_first_wave: true,
        ..PlannerConfig::default()
    };
    let mut hub = sample_hub(config);
    run_day(&mut hub, &sample_plan()).unwrap();
    let registry = hub.registry();
    let ten = registry.lookup(PackageId(10)).unwrap();
    let eleven = registry.lookup(PackageId(11)).unwrap();
    assert!(ten.timeline().loaded.unwrap() > t(8, 0));
    assert_eq!(ten.vehicle(), eleven.vehicle());
    assert_eq!(ten.status(), PackageStatus::Delivered);
}

#[test]
fn planless_day_clears_a_generated_pool() {
    let mut hub = generate_hub(12, 40, 11).unwrap();
    run_day(&mut hub, &DayPlan::default()).unwrap();
    let report = DayReport::from_hub(&hub);
    assert!(report.undelivered.is_empty());
    assert!(hub.waves_dispatched() >= 2);
    for vehicle in hub.vehicles() {
        assert!(vehicle.is_at_depot());
        assert!(vehicle.packages().is_empty());
    }
}
