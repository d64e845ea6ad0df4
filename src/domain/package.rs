use std::fmt;

use chrono::NaiveTime;

use crate::domain::address::Address;
use crate::domain::types::{
    BindingSetId, Deadline, GroupId, PackageId, PackageStatus, PriorityTier, VehicleId,
};
use crate::error::{DispatchError, Result};

/// Clock times at which a package reached each stage of its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeline {
    pub checked_in: Option<NaiveTime>,
    pub loaded: Option<NaiveTime>,
    pub out_for_delivery: Option<NaiveTime>,
    pub delivered: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub id: PackageId,
    pub address: Address,
    pub deadline: Deadline,
    pub mass_kg: f64,
    pub notes: String,
    pub vehicle_restriction: Option<VehicleId>,
    pub delivery_group: Option<GroupId>,
    pub priority: Option<PriorityTier>,
    pub binding: Option<BindingSetId>,
    status: PackageStatus,
    status_note: Option<String>,
    vehicle: Option<VehicleId>,
    delivered_on_time: Option<bool>,
    timeline: Timeline,
}

impl Package {
    pub fn new(
        id: PackageId,
        address: Address,
        deadline: Deadline,
        mass_kg: f64,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id,
            address,
            deadline,
            mass_kg,
            notes: notes.into(),
            vehicle_restriction: None,
            delivery_group: None,
            priority: None,
            binding: None,
            status: PackageStatus::NotArrived,
            status_note: None,
            vehicle: None,
            delivered_on_time: None,
            timeline: Timeline::default(),
        }
    }

    pub fn destination(&self) -> String {
        self.address.key()
    }

    pub fn status(&self) -> PackageStatus {
        self.status
    }

    pub fn status_note(&self) -> Option<&str> {
        self.status_note.as_deref()
    }

    pub fn vehicle(&self) -> Option<VehicleId> {
        self.vehicle
    }

    pub fn delivered_on_time(&self) -> Option<bool> {
        self.delivered_on_time
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Whether the package may go on `vehicle` given its restriction.
    pub fn allowed_on(&self, vehicle: VehicleId) -> bool {
        self.vehicle_restriction.map_or(true, |only| only == vehicle)
    }

    pub fn set_status(&mut self, next: PackageStatus, note: Option<String>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DispatchError::InvalidTransition {
                package: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.status_note = note;
        Ok(())
    }

    pub fn mark_checked_in(&mut self, at: NaiveTime) {
        self.timeline.checked_in = Some(at);
    }

    pub fn mark_loaded(&mut self, vehicle: VehicleId, at: NaiveTime) -> Result<()> {
        self.set_status(
            PackageStatus::Loaded,
            Some(format!("Loaded on truck {vehicle} at {}", at.format("%H:%M"))),
        )?;
        self.vehicle = Some(vehicle);
        self.timeline.loaded = Some(at);
        Ok(())
    }

    pub fn mark_out_for_delivery(&mut self, vehicle: VehicleId, at: NaiveTime) -> Result<()> {
        self.set_status(
            PackageStatus::OutForDelivery,
            Some(format!("Out for delivery on truck {vehicle} at {}", at.format("%H:%M"))),
        )?;
        self.timeline.out_for_delivery = Some(at);
        Ok(())
    }

    /// Returns whether the delivery met the deadline.
    pub fn mark_delivered(&mut self, vehicle: VehicleId, at: NaiveTime) -> Result<bool> {
        self.set_status(
            PackageStatus::Delivered,
            Some(format!("Delivered by truck {vehicle} at {}", at.format("%H:%M"))),
        )?;
        let on_time = self.deadline.is_met_by(at);
        self.timeline.delivered = Some(at);
        self.delivered_on_time = Some(on_time);
        Ok(on_time)
    }

    pub fn update_address(&mut self, address: Address) {
        self.address = address;
    }

    /// Status kind the package had at clock time `at`, rebuilt from its timeline.
    pub fn status_at(&self, at: NaiveTime) -> PackageStatus {
        let reached = |stage: Option<NaiveTime>| stage.is_some_and(|t| t <= at);
        let tl = &self.timeline;
        if reached(tl.delivered) {
            PackageStatus::Delivered
        } else if reached(tl.out_for_delivery) {
            PackageStatus::OutForDelivery
        } else if reached(tl.loaded) {
            PackageStatus::Loaded
        } else if reached(tl.checked_in) {
            if self.status == PackageStatus::AddressInvalid {
                PackageStatus::AddressInvalid
            } else {
                PackageStatus::ReadyForDispatch
            }
        } else {
            PackageStatus::NotArrived
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}, Address: {}, Mass(kg): {}, Deadline: {}, Status: {}",
            self.id,
            self.address,
            self.mass_kg,
            self.deadline,
            self.status_note().unwrap_or(self.status.description())
        )
    }
}
