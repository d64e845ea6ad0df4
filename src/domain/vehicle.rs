use std::collections::BTreeSet;

use chrono::{NaiveTime, TimeDelta};
use tracing::{debug, info, warn};

use crate::distance::DistanceModel;
use crate::domain::registry::PackageRegistry;
use crate::domain::types::{LocationId, PackageId, PackageStatus, Route, VehicleId, VehicleManifest};
use crate::error::{DispatchError, Result};
use crate::evaluation::fitness::calculate_route_distance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    AtDepot,
    Dispatched,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TravelEvent {
    Departed {
        at: NaiveTime,
        packages: usize,
    },
    Leg {
        from: LocationId,
        to: LocationId,
        miles: f64,
        arrived_at: NaiveTime,
    },
    Delivered {
        package: PackageId,
        at: NaiveTime,
        on_time: bool,
    },
    Returned {
        at: NaiveTime,
        route_miles: f64,
    },
}

/// Outcome of [`Vehicle::run_route`].
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Nothing to deliver; readiness was reset.
    Idle,
    Completed {
        delivered: Vec<PackageId>,
        route_miles: f64,
        returned_at: NaiveTime,
    },
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    id: VehicleId,
    capacity: usize,
    speed_mph: f64,
    state: VehicleState,
    ready_for_dispatch: bool,
    location: LocationId,
    clock: NaiveTime,
    first_departure: Option<NaiveTime>,
    total_miles: f64,
    route_miles: f64,
    packages: BTreeSet<PackageId>,
    manifest: VehicleManifest,
    route: Route,
    next_stop: usize,
    delivered_this_route: Vec<PackageId>,
    travel_log: Vec<TravelEvent>,
}

impl Vehicle {
    pub fn new(id: VehicleId, capacity: usize, speed_mph: f64, clock: NaiveTime) -> Self {
        Self {
            id,
            capacity,
            speed_mph,
            state: VehicleState::AtDepot,
            ready_for_dispatch: false,
            location: LocationId::DEPOT,
            clock,
            first_departure: None,
            total_miles: 0.0,
            route_miles: 0.0,
            packages: BTreeSet::new(),
            manifest: VehicleManifest::default(),
            route: Route::default(),
            next_stop: 0,
            delivered_this_route: Vec::new(),
            travel_log: Vec::new(),
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.packages.len())
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn is_at_depot(&self) -> bool {
        self.state == VehicleState::AtDepot
    }

    pub fn is_ready_for_dispatch(&self) -> bool {
        self.ready_for_dispatch
    }

    pub fn set_ready_for_dispatch(&mut self, ready: bool) {
        self.ready_for_dispatch = ready;
    }

    pub fn location(&self) -> LocationId {
        self.location
    }

    pub fn clock(&self) -> NaiveTime {
        self.clock
    }

    /// Moves the clock forward to `at`; never backwards.
    pub fn wait_until(&mut self, at: NaiveTime) {
        if at > self.clock {
            self.clock = at;
        }
    }

    pub fn first_departure(&self) -> Option<NaiveTime> {
        self.first_departure
    }

    pub fn total_miles(&self) -> f64 {
        self.total_miles
    }

    pub fn packages(&self) -> &BTreeSet<PackageId> {
        &self.packages
    }

    pub fn manifest(&self) -> &VehicleManifest {
        &self.manifest
    }

    pub fn set_manifest(&mut self, manifest: VehicleManifest) {
        self.manifest = manifest;
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn set_route(&mut self, route: Route) {
        self.route = route;
        self.next_stop = 0;
    }

    pub fn travel_log(&self) -> &[TravelEvent] {
        &self.travel_log
    }

    /// Puts the package on board. Loading past capacity is a caller bug and
    /// is refused.
    pub fn load_package(&mut self, package: PackageId) -> Result<()> {
        if self.remaining_capacity() == 0 {
            warn!(
                "Vehicle {} reached capacity while loading package {}",
                self.id, package
            );
            return Err(DispatchError::CapacityExceeded {
                vehicle: self.id,
                package,
                capacity: self.capacity,
            });
        }
        self.packages.insert(package);
        Ok(())
    }

    /// Planned miles for the current route, including the return leg.
    pub fn planned_miles(&self, model: &DistanceModel) -> f64 {
        let path: Vec<LocationId> = std::iter::once(self.location)
            .chain(self.route.stops())
            .chain(std::iter::once(model.depot()))
            .collect();
        calculate_route_distance(&path, model)
    }

    fn add_travel_time(&mut self, miles: f64) {
        let ms = (miles / self.speed_mph * 3_600_000.0).round() as i64;
        self.clock = self.clock + TimeDelta::try_milliseconds(ms).unwrap_or(TimeDelta::zero());
    }

    /// `AtDepot -> Dispatched`. Returns `false` and resets readiness when there
    /// is nothing to deliver.
    pub fn begin_route(&mut self, registry: &mut PackageRegistry) -> Result<bool> {
        if self.state != VehicleState::AtDepot {
            return Err(DispatchError::VehicleNotAtDepot(self.id));
        }
        self.ready_for_dispatch = false;
        if self.packages.is_empty() || self.route.is_empty() {
            if !self.packages.is_empty() {
                warn!(
                    "Vehicle {} has {} packages but no route, staying at depot",
                    self.id,
                    self.packages.len()
                );
            }
            return Ok(false);
        }

        for id in &self.packages {
            registry.lookup_mut(*id)?.mark_out_for_delivery(self.id, self.clock)?;
        }
        self.state = VehicleState::Dispatched;
        self.first_departure.get_or_insert(self.clock);
        self.route_miles = 0.0;
        self.next_stop = 0;
        self.delivered_this_route.clear();
        self.travel_log.push(TravelEvent::Departed {
            at: self.clock,
            packages: self.packages.len(),
        });
        info!(
            "Vehicle {} left the depot at {} with {} packages and {} stops",
            self.id,
            self.clock.format("%H:%M"),
            self.packages.len(),
            self.route.len()
        );
        Ok(true)
    }

    /// Drives to the next stop and delivers what is deliverable there.
    /// Returns `None` once the route is exhausted.
    pub fn advance(
        &mut self,
        registry: &mut PackageRegistry,
        model: &DistanceModel,
    ) -> Result<Option<LocationId>> {
        if self.state != VehicleState::Dispatched {
            return Ok(None);
        }
        let Some(stop) = self.route.stops().nth(self.next_stop) else {
            return Ok(None);
        };
        self.next_stop += 1;

        let from = self.location;
        let miles = model.distance(from, stop);
        self.total_miles += miles;
        self.route_miles += miles;
        self.add_travel_time(miles);
        self.location = stop;
        if miles > 0.0 {
            self.travel_log.push(TravelEvent::Leg {
                from,
                to: stop,
                miles,
                arrived_at: self.clock,
            });
        }
        debug!(
            "Vehicle {} reached {} ({:.1} miles) at {}",
            self.id,
            model.address(stop),
            miles,
            self.clock.format("%H:%M")
        );

        let destination = model.address(stop);
        let due: Vec<PackageId> = self
            .manifest
            .packages_for(destination)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        for id in due {
            let package = registry.lookup_mut(id)?;
            if package.status() != PackageStatus::OutForDelivery {
                continue;
            }
            let on_time = package.mark_delivered(self.id, self.clock)?;
            if !on_time {
                warn!("Package {} delivered late at {}", id, self.clock.format("%H:%M"));
            }
            self.packages.remove(&id);
            self.delivered_this_route.push(id);
            self.travel_log.push(TravelEvent::Delivered {
                package: id,
                at: self.clock,
                on_time,
            });
        }
        self.manifest.priority.remove(destination);
        self.manifest.standard.remove(destination);
        Ok(Some(stop))
    }

    /// `Dispatched -> AtDepot`, driving the final leg if needed.
    pub fn return_to_depot(&mut self, model: &DistanceModel) {
        let depot = model.depot();
        if self.location != depot {
            let miles = model.distance(self.location, depot);
            self.total_miles += miles;
            self.route_miles += miles;
            self.add_travel_time(miles);
            self.travel_log.push(TravelEvent::Leg {
                from: self.location,
                to: depot,
                miles,
                arrived_at: self.clock,
            });
            self.location = depot;
        }
        self.route = Route::default();
        self.next_stop = 0;
        self.manifest.clear();
        self.state = VehicleState::AtDepot;
        self.ready_for_dispatch = false;
        self.travel_log.push(TravelEvent::Returned {
            at: self.clock,
            route_miles: self.route_miles,
        });
        info!(
            "Vehicle {} returned to the depot at {} after {:.1} miles",
            self.id,
            self.clock.format("%H:%M"),
            self.route_miles
        );
    }

    /// Runs a whole dispatch wave: begin, every stop, return.
    pub fn run_route(
        &mut self,
        registry: &mut PackageRegistry,
        model: &DistanceModel,
    ) -> Result<DispatchOutcome> {
        if !self.begin_route(registry)? {
            return Ok(DispatchOutcome::Idle);
        }
        while self.advance(registry, model)?.is_some() {}
        self.return_to_depot(model);
        Ok(DispatchOutcome::Completed {
            delivered: std::mem::take(&mut self.delivered_this_route),
            route_miles: self.route_miles,
            returned_at: self.clock,
        })
    }
}
