use std::collections::BTreeSet;

use proptest::prelude::*;

use hub_dispatch::distance::{floyd_warshall, ClosedDistanceMatrix, RawDistanceMatrix};
use hub_dispatch::domain::{LocationId, PackageId, PackageStatus, VehicleId};
use hub_dispatch::config::PlannerConfig;
use hub_dispatch::fixtures::data_generator::{
    generate_distance_rows, generate_fractional_distance_rows, generate_hub_with, generate_model,
};
use hub_dispatch::solver::routing::{calculate_route_distance, nearest_neighbor, two_opt};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn closure_is_symmetric_and_metric(size in 2usize..9, seed in any::<u64>()) {
        let raw = RawDistanceMatrix::from_rows(generate_distance_rows(size, seed)).unwrap();
        let closed = raw.close();
        for i in 0..size {
            prop_assert_eq!(closed.get(i, i), 0.0);
            for j in 0..size {
                prop_assert_eq!(closed.get(i, j), closed.get(j, i));
                for k in 0..size {
                    prop_assert!(closed.get(i, j) <= closed.get(i, k) + closed.get(k, j));
                }
            }
        }
    }

    #[test]
    fn closure_is_idempotent(size in 2usize..9, seed in any::<u64>()) {
        let closed = RawDistanceMatrix::from_rows(generate_distance_rows(size, seed))
            .unwrap()
            .close();
        let mut again = closed.rows().to_vec();
        prop_assert_eq!(floyd_warshall(&mut again), 0);
        prop_assert_eq!(again.as_slice(), closed.rows());
        prop_assert!(ClosedDistanceMatrix::from_closed_rows(again).is_ok());
    }

    #[test]
    fn fractional_closure_is_metric_and_stable(size in 3usize..13, seed in any::<u64>()) {
        let closed = RawDistanceMatrix::from_rows(generate_fractional_distance_rows(size, seed))
            .unwrap()
            .close();
        for i in 0..size {
            for j in 0..size {
                prop_assert_eq!(closed.get(i, j), closed.get(j, i));
                for k in 0..size {
                    prop_assert!(closed.get(i, j) <= closed.get(i, k) + closed.get(k, j));
                }
            }
        }
        let mut again = closed.rows().to_vec();
        prop_assert_eq!(floyd_warshall(&mut again), 0);
        prop_assert!(ClosedDistanceMatrix::from_closed_rows(again).is_ok());
    }

    #[test]
    fn two_opt_never_worse_than_construction(
        size in 3usize..10,
        seed in any::<u64>(),
        fixed_end in any::<bool>(),
    ) {
        let model = generate_model(size, seed).unwrap();
        let stops: Vec<LocationId> = (1..size).map(LocationId).collect();
        let mut route = nearest_neighbor(model.depot(), &stops, &model);
        if fixed_end {
            route.push(model.depot());
        }
        let constructed = calculate_route_distance(&route, &model);
        two_opt(&mut route, &model, fixed_end);
        prop_assert!(calculate_route_distance(&route, &model) <= constructed);
        prop_assert_eq!(route[0], model.depot());
        if fixed_end {
            prop_assert_eq!(route.last().copied(), Some(model.depot()));
        }
        let visited: BTreeSet<LocationId> =
            route.iter().copied().filter(|l| *l != model.depot()).collect();
        prop_assert_eq!(visited.len(), stops.len());
    }

    #[test]
    fn tiny_routes_are_left_alone(seed in any::<u64>()) {
        let model = generate_model(3, seed).unwrap();
        let mut route = vec![model.depot(), LocationId(1)];
        prop_assert_eq!(two_opt(&mut route, &model, false), 0);
        prop_assert_eq!(route, vec![model.depot(), LocationId(1)]);
    }

    #[test]
    fn loading_respects_capacity_and_bindings(
        packages in 4usize..40,
        seed in any::<u64>(),
        capacity in 1usize..12,
        bound in prop::collection::btree_set(1u32..40, 2..5),
    ) {
        let config = PlannerConfig {
            vehicle_capacity: capacity,
            ..PlannerConfig::default()
        };
        let mut hub = generate_hub_with(8, packages, seed, config).unwrap();
        let start = hub.config().day_start;
        for id in 1..=packages as u32 {
            hub.check_in(PackageId(id), start, None).unwrap();
        }
        let bound: Vec<PackageId> = bound
            .into_iter()
            .filter(|id| (*id as usize) <= packages)
            .map(PackageId)
            .collect();
        if bound.len() >= 2 {
            hub.bind_packages(bound.iter().copied()).unwrap();
        }

        for n in 1..=2u32 {
            hub.prepare_vehicle(VehicleId(n), None).unwrap();
        }
        hub.load_ready_vehicles().unwrap();

        let one = hub.vehicle(VehicleId(1)).unwrap().packages().clone();
        let two = hub.vehicle(VehicleId(2)).unwrap().packages().clone();
        prop_assert!(one.len() <= capacity);
        prop_assert!(two.len() <= capacity);
        prop_assert!(one.is_disjoint(&two));

        if bound.len() >= 2 {
            let on_one = bound.iter().filter(|id| one.contains(id)).count();
            let on_two = bound.iter().filter(|id| two.contains(id)).count();
            prop_assert!(on_one == 0 || on_one == bound.len());
            prop_assert!(on_two == 0 || on_two == bound.len());
        }

        for id in one.iter().chain(two.iter()) {
            prop_assert!(!hub.registry().is_ready(*id));
            prop_assert_eq!(hub.registry().lookup(*id).unwrap().status(), PackageStatus::Loaded);
        }
        prop_assert_eq!(
            hub.registry().ready_pool().len() + one.len() + two.len(),
            packages
        );
    }
}
