use chrono::NaiveTime;
use tracing::{info, span, warn, Level};

use crate::config::PlannerConfig;
use crate::distance::DistanceModel;
use crate::domain::address::Address;
use crate::domain::registry::PackageRegistry;
use crate::domain::types::{BindingSetId, PackageId, PackageStatus, VehicleId};
use crate::domain::vehicle::{DispatchOutcome, Vehicle};
use crate::error::{DispatchError, Result};
use crate::solver::loading::{load_vehicle, LoadSummary};
use crate::solver::routing::{optimize_route, RoutePlan};

/// One business day at the depot: the distance model, every package, and the
/// fleet. All pipeline stages go through here so the ready pool has a single
/// owner.
#[derive(Debug, Clone)]
pub struct Hub {
    model: DistanceModel,
    registry: PackageRegistry,
    vehicles: Vec<Vehicle>,
    config: PlannerConfig,
    waves_dispatched: usize,
}

fn find_vehicle_mut(vehicles: &mut [Vehicle], id: VehicleId) -> Result<&mut Vehicle> {
    vehicles
        .iter_mut()
        .find(|v| v.id() == id)
        .ok_or(DispatchError::UnknownVehicle(id))
}

impl Hub {
    /// Vehicles are numbered from 1 and start the day at the depot.
    pub fn new(model: DistanceModel, registry: PackageRegistry, config: PlannerConfig) -> Self {
        let vehicles = (1..=config.vehicle_count)
            .map(|n| {
                Vehicle::new(
                    VehicleId(n as u32),
                    config.vehicle_capacity,
                    config.speed_mph,
                    config.day_start,
                )
            })
            .collect();
        info!(
            "Hub opened with {} locations, {} packages, {} vehicles",
            model.len(),
            registry.len(),
            config.vehicle_count
        );
        Self {
            model,
            registry,
            vehicles,
            config,
            waves_dispatched: 0,
        }
    }

    pub fn model(&self) -> &DistanceModel {
        &self.model
    }

    pub fn registry(&self) -> &PackageRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn waves_dispatched(&self) -> usize {
        self.waves_dispatched
    }

    pub fn vehicle(&self, id: VehicleId) -> Result<&Vehicle> {
        self.vehicles
            .iter()
            .find(|v| v.id() == id)
            .ok_or(DispatchError::UnknownVehicle(id))
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Result<&mut Vehicle> {
        find_vehicle_mut(&mut self.vehicles, id)
    }

    /// Scans a package in. Without an override it becomes ready when its
    /// destination is a known location and address-invalid otherwise.
    pub fn check_in(
        &mut self,
        id: PackageId,
        at: NaiveTime,
        status_override: Option<PackageStatus>,
    ) -> Result<PackageStatus> {
        let destination = self.registry.lookup(id)?.destination();
        let status = match status_override {
            Some(status) => status,
            None if self.model.is_known(&destination) => PackageStatus::ReadyForDispatch,
            None => {
                warn!("Package {} has an unknown destination {:?}", id, destination);
                PackageStatus::AddressInvalid
            }
        };
        match status {
            PackageStatus::ReadyForDispatch => self.registry.admit(id)?,
            PackageStatus::AddressInvalid => self.registry.mark_address_invalid(id)?,
            other => self.registry.lookup_mut(id)?.set_status(other, None)?,
        }
        self.registry.lookup_mut(id)?.mark_checked_in(at);
        Ok(status)
    }

    /// Replaces the destination and re-admits the package to the pool. Fails
    /// without touching the package when the new address is not a location.
    pub fn correct_address(
        &mut self,
        id: PackageId,
        street: &str,
        city: &str,
        state: &str,
        zipcode: &str,
    ) -> Result<()> {
        let address = Address::new(street, city, state, zipcode);
        self.model.resolve(&address.key())?;
        let package = self.registry.lookup_mut(id)?;
        if !package.status().can_transition_to(PackageStatus::ReadyForDispatch) {
            return Err(DispatchError::InvalidTransition {
                package: id,
                from: package.status(),
                to: PackageStatus::ReadyForDispatch,
            });
        }
        info!("Package {} address corrected to {}", id, address);
        package.update_address(address);
        self.registry.admit(id)
    }

    pub fn restrict_to_vehicle(&mut self, id: PackageId, vehicle: VehicleId) -> Result<()> {
        self.vehicle(vehicle)?;
        self.registry.restrict_to_vehicle(id, vehicle)
    }

    pub fn bind_packages(
        &mut self,
        ids: impl IntoIterator<Item = PackageId>,
    ) -> Result<BindingSetId> {
        self.registry.bind_packages(ids)
    }

    /// Marks a vehicle ready, holding it at the depot until `not_before`.
    pub fn prepare_vehicle(&mut self, id: VehicleId, not_before: Option<NaiveTime>) -> Result<()> {
        let vehicle = self.vehicle_mut(id)?;
        if let Some(at) = not_before {
            vehicle.wait_until(at);
        }
        vehicle.set_ready_for_dispatch(true);
        Ok(())
    }

    pub fn load_vehicle(&mut self, id: VehicleId) -> Result<LoadSummary> {
        let first_wave = self.waves_dispatched == 0;
        let vehicle = find_vehicle_mut(&mut self.vehicles, id)?;
        load_vehicle(vehicle, &mut self.registry, &self.config, first_wave)
    }

    pub fn optimize_route(&mut self, id: VehicleId) -> Result<RoutePlan> {
        let vehicle = find_vehicle_mut(&mut self.vehicles, id)?;
        optimize_route(vehicle, &self.model)
    }

    pub fn dispatch(&mut self, id: VehicleId) -> Result<DispatchOutcome> {
        let span = span!(Level::INFO, "dispatch", vehicle = id.0);
        let _g = span.enter();
        let vehicle = find_vehicle_mut(&mut self.vehicles, id)?;
        let outcome = vehicle.run_route(&mut self.registry, &self.model)?;
        if matches!(outcome, DispatchOutcome::Completed { .. }) {
            self.waves_dispatched += 1;
        }
        Ok(outcome)
    }

    fn ready_vehicle_ids(&self) -> Vec<VehicleId> {
        self.vehicles
            .iter()
            .filter(|v| v.is_at_depot() && v.is_ready_for_dispatch())
            .map(Vehicle::id)
            .collect()
    }

    /// Loads every ready vehicle in id order. Each pass sees the pool left by
    /// the previous vehicle. First-wave status is fixed for the whole batch.
    pub fn load_ready_vehicles(&mut self) -> Result<Vec<(VehicleId, LoadSummary)>> {
        let first_wave = self.waves_dispatched == 0;
        let mut summaries = Vec::new();
        for id in self.ready_vehicle_ids() {
            let vehicle = find_vehicle_mut(&mut self.vehicles, id)?;
            if vehicle.remaining_capacity() == 0 {
                continue;
            }
            let summary = load_vehicle(vehicle, &mut self.registry, &self.config, first_wave)?;
            summaries.push((id, summary));
        }
        Ok(summaries)
    }

    pub fn optimize_ready_vehicles(&mut self) -> Result<Vec<(VehicleId, RoutePlan)>> {
        let mut plans = Vec::new();
        for id in self.ready_vehicle_ids() {
            plans.push((id, self.optimize_route(id)?));
        }
        Ok(plans)
    }

    pub fn dispatch_ready_vehicles(&mut self) -> Result<Vec<(VehicleId, DispatchOutcome)>> {
        let mut outcomes = Vec::new();
        for id in self.ready_vehicle_ids() {
            outcomes.push((id, self.dispatch(id)?));
        }
        Ok(outcomes)
    }

    pub fn total_miles(&self) -> f64 {
        self.vehicles.iter().map(Vehicle::total_miles).sum()
    }
}
