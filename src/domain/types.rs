use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub u32);

/// Row/column of a location in the distance matrix. The depot is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId(pub usize);

impl LocationId {
    pub const DEPOT: LocationId = LocationId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingSetId(pub usize);

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Delivery deadline: a clock time or end of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deadline {
    At(NaiveTime),
    EndOfDay,
}

impl Deadline {
    pub fn time(&self) -> Option<NaiveTime> {
        match self {
            Deadline::At(t) => Some(*t),
            Deadline::EndOfDay => None,
        }
    }

    pub fn is_timed(&self) -> bool {
        matches!(self, Deadline::At(_))
    }

    /// On time means delivered at or before the deadline. EOD is always met.
    pub fn is_met_by(&self, delivered_at: NaiveTime) -> bool {
        match self {
            Deadline::At(deadline) => delivered_at <= *deadline,
            Deadline::EndOfDay => true,
        }
    }
}

impl FromStr for Deadline {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.eq_ignore_ascii_case("EOD") {
            return Ok(Deadline::EndOfDay);
        }
        ["%I:%M %p", "%I:%M:%S %p", "%H:%M", "%H:%M:%S"]
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(&raw.to_uppercase(), fmt).ok())
            .map(Deadline::At)
            .ok_or_else(|| DispatchError::InvalidDeadline(raw.to_string()))
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deadline::At(t) => write!(f, "{}", t.format("%H:%M")),
            Deadline::EndOfDay => write!(f, "EOD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PackageStatus {
    NotArrived,
    ReadyForDispatch,
    Loaded,
    OutForDelivery,
    Delivered,
    AddressInvalid,
}

impl PackageStatus {
    pub fn can_transition_to(self, next: PackageStatus) -> bool {
        use PackageStatus::*;
        matches!(
            (self, next),
            (NotArrived, NotArrived)
                | (NotArrived, ReadyForDispatch)
                | (NotArrived, AddressInvalid)
                | (ReadyForDispatch, ReadyForDispatch)
                | (ReadyForDispatch, AddressInvalid)
                | (AddressInvalid, AddressInvalid)
                | (AddressInvalid, ReadyForDispatch)
                | (ReadyForDispatch, Loaded)
                | (Loaded, OutForDelivery)
                | (OutForDelivery, Delivered)
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            PackageStatus::NotArrived => "Not Yet Arrived",
            PackageStatus::ReadyForDispatch => "Ready For Dispatch",
            PackageStatus::Loaded => "Loaded on Truck",
            PackageStatus::OutForDelivery => "Out For Delivery",
            PackageStatus::Delivered => "Delivered",
            PackageStatus::AddressInvalid => "Incorrect Address",
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriorityTier {
    One,
    Two,
}

/// Destination address key -> packages bound for it.
pub type Manifest = BTreeMap<String, BTreeSet<PackageId>>;

/// What a vehicle carries for one dispatch wave.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleManifest {
    /// Destinations holding at least one deadline-bearing package.
    pub priority: Manifest,
    pub standard: Manifest,
}

impl VehicleManifest {
    pub fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.standard.is_empty()
    }

    pub fn package_count(&self) -> usize {
        self.priority
            .values()
            .chain(self.standard.values())
            .map(BTreeSet::len)
            .sum()
    }

    pub fn packages_for(&self, destination: &str) -> Option<&BTreeSet<PackageId>> {
        self.priority
            .get(destination)
            .or_else(|| self.standard.get(destination))
    }

    pub fn clear(&mut self) {
        self.priority.clear();
        self.standard.clear();
    }
}

/// Ordered stops for one dispatch wave. Priority stops are visited first; the
/// return to the depot is implied after the last standard stop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub priority: Vec<LocationId>,
    pub standard: Vec<LocationId>,
}

impl Route {
    pub fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.standard.is_empty()
    }

    pub fn stops(&self) -> impl Iterator<Item = LocationId> + '_ {
        self.priority.iter().chain(self.standard.iter()).copied()
    }

    pub fn len(&self) -> usize {
        self.priority.len() + self.standard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn parses_deadlines() {
        assert_eq!("EOD".parse::<Deadline>().unwrap(), Deadline::EndOfDay);
        assert_eq!("9:00 AM".parse::<Deadline>().unwrap(), Deadline::At(t(9, 0)));
        assert_eq!("10:30 am".parse::<Deadline>().unwrap(), Deadline::At(t(10, 30)));
        assert_eq!("13:05".parse::<Deadline>().unwrap(), Deadline::At(t(13, 5)));
        assert!(matches!(
            "soon".parse::<Deadline>(),
            Err(DispatchError::InvalidDeadline(_))
        ));
    }

    #[test]
    fn deadline_met_is_inclusive() {
        let d = Deadline::At(t(10, 30));
        assert!(d.is_met_by(t(10, 30)));
        assert!(d.is_met_by(t(9, 0)));
        assert!(!d.is_met_by(NaiveTime::from_hms_opt(10, 30, 1).unwrap()));
        assert!(Deadline::EndOfDay.is_met_by(t(23, 59)));
    }

    #[test]
    fn address_invalid_only_from_pre_load_states() {
        use PackageStatus::*;
        assert!(NotArrived.can_transition_to(AddressInvalid));
        assert!(ReadyForDispatch.can_transition_to(AddressInvalid));
        assert!(!Loaded.can_transition_to(AddressInvalid));
        assert!(!OutForDelivery.can_transition_to(AddressInvalid));
        assert!(!Delivered.can_transition_to(AddressInvalid));
        assert!(!NotArrived.can_transition_to(Delivered));
    }

    #[test]
    fn manifest_counts_both_tiers() {
        let mut m = VehicleManifest::default();
        m.priority
            .entry("A".into())
            .or_default()
            .extend([PackageId(1), PackageId(2)]);
        m.standard.entry("B".into()).or_default().insert(PackageId(3));
        assert_eq!(m.package_count(), 3);
        assert!(m.packages_for("B").unwrap().contains(&PackageId(3)));
        m.clear();
        assert!(m.is_empty());
    }
}
