use std::error::Error;

use chrono::NaiveTime;
use colored::*;
use csv::Writer;

use crate::domain::types::{PackageId, PackageStatus, VehicleId};
use crate::domain::vehicle::TravelEvent;
use crate::hub::Hub;

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleReport {
    pub id: VehicleId,
    pub miles: f64,
    pub first_departure: Option<NaiveTime>,
    pub clock: NaiveTime,
    pub deliveries: usize,
    pub travel_log: Vec<TravelEvent>,
}

/// End-of-day summary of mileage and delivery outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub vehicles: Vec<VehicleReport>,
    pub total_miles: f64,
    pub delivered: usize,
    pub undelivered: Vec<PackageId>,
    pub late: Vec<PackageId>,
}

impl DayReport {
    pub fn from_hub(hub: &Hub) -> Self {
        let vehicles = hub
            .vehicles()
            .iter()
            .map(|v| VehicleReport {
                id: v.id(),
                miles: v.total_miles(),
                first_departure: v.first_departure(),
                clock: v.clock(),
                deliveries: v
                    .travel_log()
                    .iter()
                    .filter(|e| matches!(e, TravelEvent::Delivered { .. }))
                    .count(),
                travel_log: v.travel_log().to_vec(),
            })
            .collect();

        let mut delivered = 0;
        let mut undelivered = Vec::new();
        let mut late = Vec::new();
        for package in hub.registry().all_packages() {
            if package.status() != PackageStatus::Delivered {
                undelivered.push(package.id);
                continue;
            }
            delivered += 1;
            if package.delivered_on_time() == Some(false) {
                late.push(package.id);
            }
        }

        Self {
            vehicles,
            total_miles: hub.total_miles(),
            delivered,
            undelivered,
            late,
        }
    }

    pub fn all_on_time(&self) -> bool {
        self.undelivered.is_empty() && self.late.is_empty()
    }

    pub fn print(&self) {
        println!("{}", "Vehicle report".bold());
        for vehicle in &self.vehicles {
            println!("Vehicle {}:", vehicle.id);
            for event in &vehicle.travel_log {
                println!("  {}", describe(event));
            }
            println!(
                "  {} deliveries, {:.1} miles, back at {}",
                vehicle.deliveries,
                vehicle.miles,
                vehicle.clock.format("%H:%M")
            );
        }
        println!(
            "{}",
            format!("Total distance traveled by all vehicles: {:.1} miles", self.total_miles).bold()
        );

        if self.all_on_time() {
            println!("{}", format!("All {} packages delivered on time", self.delivered).green());
            return;
        }
        if !self.undelivered.is_empty() {
            println!(
                "{}",
                format!("Not delivered: {:?}", self.undelivered).red()
            );
        }
        if !self.late.is_empty() {
            println!("{}", format!("Delivered late: {:?}", self.late).yellow());
        }
    }
}

fn describe(event: &TravelEvent) -> String {
    match event {
        TravelEvent::Departed { at, packages } => {
            format!("{} left the depot with {} packages", at.format("%H:%M"), packages)
        }
        TravelEvent::Leg {
            from,
            to,
            miles,
            arrived_at,
        } => format!(
            "{} arrived at location {} from {} ({:.1} miles)",
            arrived_at.format("%H:%M"),
            to,
            from,
            miles
        ),
        TravelEvent::Delivered { package, at, on_time } => format!(
            "{} delivered package {}{}",
            at.format("%H:%M"),
            package,
            if *on_time { "" } else { " (late)" }
        ),
        TravelEvent::Returned { at, route_miles } => format!(
            "{} returned to the depot after {:.1} miles",
            at.format("%H:%M"),
            route_miles
        ),
    }
}

fn clock_cell(t: Option<NaiveTime>) -> String {
    t.map(|t| t.format("%H:%M:%S").to_string()).unwrap_or_default()
}

/// One row per package with its final status and timeline.
pub fn save_to_csv(hub: &Hub, filename: &str) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_path(filename)?;

    wtr.write_record([
        "id",
        "address",
        "deadline",
        "status",
        "vehicle",
        "checked_in",
        "loaded",
        "delivered",
        "on_time",
    ])?;

    for package in hub.registry().all_packages() {
        let timeline = package.timeline();
        wtr.write_record([
            package.id.to_string(),
            package.address.to_string(),
            package.deadline.to_string(),
            package.status().to_string(),
            package.vehicle().map(|v| v.to_string()).unwrap_or_default(),
            clock_cell(timeline.checked_in),
            clock_cell(timeline.loaded),
            clock_cell(timeline.delivered),
            package
                .delivered_on_time()
                .map(|b| b.to_string())
                .unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
