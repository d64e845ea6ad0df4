pub mod units;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, span, Level};

use crate::config::PlannerConfig;
use crate::domain::registry::PackageRegistry;
use crate::domain::types::{PackageId, VehicleId, VehicleManifest};
use crate::domain::vehicle::Vehicle;
use crate::domain::views::GroupView;
use crate::error::{DispatchError, Result};

pub use units::{load_unit_of, LoadUnit};

/// Why a load unit stayed in the pool for this pass. None of these are
/// errors; the unit waits for a later pass or another vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    RestrictedToOtherVehicle(VehicleId),
    MemberNotReady(PackageId),
    DeferredFirstWave,
    InsufficientCapacity { needed: usize, remaining: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadSummary {
    pub loaded: Vec<PackageId>,
    pub skipped: Vec<(PackageId, SkipReason)>,
    pub remaining_capacity: usize,
}

/// Candidate order for one pass: tier one, tier two, groups smallest first,
/// binding sets, then everything else in id order.
fn precedence(
    registry: &mut PackageRegistry,
    config: &PlannerConfig,
) -> (Vec<PackageId>, GroupView) {
    let priority =
        registry.compute_delivery_priority(config.tier_one_deadline, config.tier_two_deadline);
    let groups = registry.compute_delivery_groups();

    let mut order: Vec<PackageId> = Vec::with_capacity(registry.ready_pool().len());
    order.extend(&priority.tier_one);
    order.extend(&priority.tier_two);
    for (_, ids) in groups.by_size() {
        order.extend(ids);
    }
    for (_, members) in registry.binding_sets() {
        order.extend(members.iter().filter(|id| registry.is_ready(**id)));
    }
    order.extend(registry.ready_pool());

    let mut seen = BTreeSet::new();
    order.retain(|id| seen.insert(*id));
    (order, groups)
}

fn check_unit(
    unit: &LoadUnit,
    vehicle: &Vehicle,
    registry: &PackageRegistry,
    config: &PlannerConfig,
    first_wave: bool,
) -> Result<Option<SkipReason>> {
    for id in &unit.members {
        if !registry.is_ready(*id) {
            return Ok(Some(SkipReason::MemberNotReady(*id)));
        }
        let package = registry.lookup(*id)?;
        if !package.allowed_on(vehicle.id()) {
            if let Some(only) = package.vehicle_restriction {
                return Ok(Some(SkipReason::RestrictedToOtherVehicle(only)));
            }
        }
    }
    if unit.bound && first_wave && config.defer_bound_on_first_wave {
        return Ok(Some(SkipReason::DeferredFirstWave));
    }
    if unit.len() > vehicle.remaining_capacity() {
        return Ok(Some(SkipReason::InsufficientCapacity {
            needed: unit.len(),
            remaining: vehicle.remaining_capacity(),
        }));
    }
    Ok(None)
}

/// Fills `vehicle` from the ready pool and rebuilds its manifests.
///
/// Groups and binding sets load whole or not at all. Whatever is not taken
/// stays in the pool; running out of room ends the pass normally.
pub fn load_vehicle(
    vehicle: &mut Vehicle,
    registry: &mut PackageRegistry,
    config: &PlannerConfig,
    first_wave: bool,
) -> Result<LoadSummary> {
    let span = span!(Level::INFO, "load", vehicle = vehicle.id().0, first_wave);
    let _g = span.enter();

    if !vehicle.is_at_depot() {
        return Err(DispatchError::VehicleNotAtDepot(vehicle.id()));
    }

    let (order, groups) = precedence(registry, config);
    debug!("{} ready packages in precedence order", order.len());

    let mut summary = LoadSummary::default();
    let mut settled: BTreeSet<PackageId> = BTreeSet::new();
    for seed in order {
        if vehicle.remaining_capacity() == 0 {
            debug!("Vehicle {} is full", vehicle.id());
            break;
        }
        if settled.contains(&seed) {
            continue;
        }
        let unit = load_unit_of(seed, registry, &groups)?;
        settled.extend(&unit.members);

        if let Some(reason) = check_unit(&unit, vehicle, registry, config, first_wave)? {
            debug!("Skipping {:?} for vehicle {}: {:?}", unit.members, vehicle.id(), reason);
            summary.skipped.extend(unit.members.iter().map(|id| (*id, reason)));
            continue;
        }

        for id in &unit.members {
            vehicle.load_package(*id)?;
            registry.take_from_pool(*id);
            registry.lookup_mut(*id)?.mark_loaded(vehicle.id(), vehicle.clock())?;
            summary.loaded.push(*id);
        }
    }

    vehicle.set_manifest(build_manifest(vehicle.packages(), registry)?);
    summary.remaining_capacity = vehicle.remaining_capacity();
    info!(
        "Vehicle {} loaded {} packages ({} on board, {} free)",
        vehicle.id(),
        summary.loaded.len(),
        vehicle.packages().len(),
        summary.remaining_capacity
    );
    Ok(summary)
}

/// Splits `packages` by destination. A destination is priority when any
/// package bound for it has a clock deadline.
pub fn build_manifest(
    packages: &BTreeSet<PackageId>,
    registry: &PackageRegistry,
) -> Result<VehicleManifest> {
    let mut by_destination: BTreeMap<String, (bool, BTreeSet<PackageId>)> = BTreeMap::new();
    for id in packages {
        let package = registry.lookup(*id)?;
        let entry = by_destination.entry(package.destination()).or_default();
        entry.0 |= package.deadline.is_timed();
        entry.1.insert(*id);
    }

    let mut manifest = VehicleManifest::default();
    for (destination, (timed, ids)) in by_destination {
        if timed {
            manifest.priority.insert(destination, ids);
        } else {
            manifest.standard.insert(destination, ids);
        }
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address::Address;
    use crate::domain::package::Package;
    use crate::domain::types::{Deadline, LocationId, PackageStatus, Route};
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn pkg(id: u32, street: &str, deadline: Deadline) -> Package {
        Package::new(
            PackageId(id),
            Address::new(street, "LA", "CA", "90001"),
            deadline,
            1.0,
            "",
        )
    }

    fn ready(packages: Vec<Package>) -> PackageRegistry {
        let ids: Vec<PackageId> = packages.iter().map(|p| p.id).collect();
        let mut registry = PackageRegistry::from_packages(packages);
        for id in ids {
            registry.admit(id).unwrap();
        }
        registry
    }

    fn truck(id: u32, capacity: usize) -> Vehicle {
        Vehicle::new(VehicleId(id), capacity, 18.0, t(8, 0))
    }

    #[test]
    fn deadlines_load_before_standard() {
        let mut registry = ready(vec![
            pkg(1, "1 A St", Deadline::EndOfDay),
            pkg(2, "2 B St", Deadline::At(t(10, 30))),
            pkg(3, "3 C St", Deadline::At(t(9, 0))),
        ]);
        let mut vehicle = truck(1, 2);
        let summary =
            load_vehicle(&mut vehicle, &mut registry, &PlannerConfig::default(), false).unwrap();
        assert_eq!(summary.loaded, vec![PackageId(3), PackageId(2)]);
        assert_eq!(summary.remaining_capacity, 0);
        assert!(registry.is_ready(PackageId(1)));
        assert_eq!(vehicle.manifest().priority.len(), 2);
        assert!(vehicle.manifest().standard.is_empty());
        assert_eq!(
            registry.lookup(PackageId(3)).unwrap().status(),
            PackageStatus::Loaded
        );
    }

    #[test]
    fn group_skipped_when_it_does_not_fit() {
        let mut registry = ready(vec![
            pkg(1, "1 A St", Deadline::EndOfDay),
            pkg(2, "1 A St", Deadline::EndOfDay),
            pkg(3, "1 A St", Deadline::EndOfDay),
            pkg(4, "2 B St", Deadline::EndOfDay),
        ]);
        let mut vehicle = truck(1, 2);
        let summary =
            load_vehicle(&mut vehicle, &mut registry, &PlannerConfig::default(), false).unwrap();
        assert_eq!(summary.loaded, vec![PackageId(4)]);
        assert!(summary
            .skipped
            .iter()
            .any(|(_, r)| matches!(r, SkipReason::InsufficientCapacity { needed: 3, .. })));
        for id in 1..=3 {
            assert!(registry.is_ready(PackageId(id)));
        }
    }

    #[test]
    fn tier_one_pulls_its_whole_group() {
        let mut registry = ready(vec![
            pkg(1, "1 A St", Deadline::At(t(9, 0))),
            pkg(2, "1 A St", Deadline::EndOfDay),
            pkg(3, "2 B St", Deadline::EndOfDay),
        ]);
        let mut vehicle = truck(1, 3);
        let summary =
            load_vehicle(&mut vehicle, &mut registry, &PlannerConfig::default(), false).unwrap();
        assert_eq!(summary.loaded, vec![PackageId(1), PackageId(2), PackageId(3)]);
        let dests = &vehicle.manifest().priority["1 A ST 90001"];
        assert_eq!(dests.len(), 2);
    }

    #[test]
    fn restricted_package_waits_for_its_vehicle() {
        let mut registry = ready(vec![pkg(1, "1 A St", Deadline::At(t(9, 0)))]);
        registry.restrict_to_vehicle(PackageId(1), VehicleId(2)).unwrap();
        let config = PlannerConfig::default();

        let mut first = truck(1, 4);
        let summary = load_vehicle(&mut first, &mut registry, &config, false).unwrap();
        assert!(summary.loaded.is_empty());
        assert_eq!(
            summary.skipped,
            vec![(PackageId(1), SkipReason::RestrictedToOtherVehicle(VehicleId(2)))]
        );

        let mut second = truck(2, 4);
        let summary = load_vehicle(&mut second, &mut registry, &config, false).unwrap();
        assert_eq!(summary.loaded, vec![PackageId(1)]);
    }

    #[test]
    fn restriction_on_one_member_holds_back_the_bound_set() {
        let mut registry = ready(vec![
            pkg(1, "1 A St", Deadline::EndOfDay),
            pkg(2, "2 B St", Deadline::EndOfDay),
            pkg(3, "3 C St", Deadline::EndOfDay),
        ]);
        registry
            .bind_packages([PackageId(1), PackageId(2), PackageId(3)])
            .unwrap();
        registry.restrict_to_vehicle(PackageId(2), VehicleId(2)).unwrap();
        let config = PlannerConfig::default();

        let mut first = truck(1, 8);
        let summary = load_vehicle(&mut first, &mut registry, &config, false).unwrap();
        assert!(summary.loaded.is_empty());
        assert!(first.packages().is_empty());
        assert_eq!(summary.skipped.len(), 3);
        assert!(summary
            .skipped
            .iter()
            .all(|(_, r)| *r == SkipReason::RestrictedToOtherVehicle(VehicleId(2))));
        assert_eq!(registry.ready_pool().len(), 3);

        let mut second = truck(2, 8);
        let summary = load_vehicle(&mut second, &mut registry, &config, false).unwrap();
        assert_eq!(summary.loaded, vec![PackageId(1), PackageId(2), PackageId(3)]);
        assert!(registry.ready_pool().is_empty());
    }

    #[test]
    fn bound_set_with_missing_member_waits() {
        let mut registry = ready(vec![
            pkg(1, "1 A St", Deadline::EndOfDay),
            pkg(2, "2 B St", Deadline::EndOfDay),
        ]);
        registry.insert(pkg(3, "3 C St", Deadline::EndOfDay));
        registry
            .bind_packages([PackageId(1), PackageId(2), PackageId(3)])
            .unwrap();
        let mut vehicle = truck(1, 8);
        let summary =
            load_vehicle(&mut vehicle, &mut registry, &PlannerConfig::default(), false).unwrap();
        assert!(summary.loaded.is_empty());
        assert!(summary
            .skipped
            .iter()
            .all(|(_, r)| *r == SkipReason::MemberNotReady(PackageId(3))));
    }

    #[test]
    fn first_wave_policy_defers_bound_sets() {
        let build = || {
            let mut registry = ready(vec![
                pkg(1, "1 A St", Deadline::EndOfDay),
                pkg(2, "2 B St", Deadline::EndOfDay),
                pkg(3, "3 C St", Deadline::EndOfDay),
            ]);
            registry.bind_packages([PackageId(1), PackageId(2)]).unwrap();
            registry
        };
        let deferring = PlannerConfig {
            defer_bound_on_first_wave: true,
            ..PlannerConfig::default()
        };

        let mut registry = build();
        let mut vehicle = truck(1, 8);
        let summary = load_vehicle(&mut vehicle, &mut registry, &deferring, true).unwrap();
        assert_eq!(summary.loaded, vec![PackageId(3)]);

        let mut registry = build();
        let mut vehicle = truck(1, 8);
        let summary = load_vehicle(&mut vehicle, &mut registry, &deferring, false).unwrap();
        assert_eq!(summary.loaded.len(), 3);

        let mut registry = build();
        let mut vehicle = truck(1, 8);
        let summary =
            load_vehicle(&mut vehicle, &mut registry, &PlannerConfig::default(), true).unwrap();
        assert_eq!(summary.loaded.len(), 3);
    }

    #[test]
    fn refuses_vehicle_away_from_depot() {
        let mut registry = ready(vec![pkg(1, "1 A St", Deadline::EndOfDay)]);
        let mut vehicle = truck(1, 4);
        vehicle.load_package(PackageId(1)).unwrap();
        vehicle.set_route(Route {
            priority: vec![],
            standard: vec![LocationId(1)],
        });
        registry.take_from_pool(PackageId(1));
        registry
            .lookup_mut(PackageId(1))
            .unwrap()
            .mark_loaded(VehicleId(1), t(8, 0))
            .unwrap();
        vehicle.begin_route(&mut registry).unwrap();
        assert!(matches!(
            load_vehicle(&mut vehicle, &mut registry, &PlannerConfig::default(), false),
            Err(DispatchError::VehicleNotAtDepot(VehicleId(1)))
        ));
    }
}
