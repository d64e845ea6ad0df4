use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};

use crate::domain::types::{PackageId, VehicleId};

/// One row of the package table.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageRow {
    pub id: PackageId,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub deadline: String,
    pub mass: f64,
    #[serde(default)]
    pub notes: String,
}

fn clock<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| {
        NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(serde::de::Error::custom)
    })
    .transpose()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Restriction {
    pub package: PackageId,
    pub vehicle: VehicleId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressCorrection {
    pub package: PackageId,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
}

/// One load, optimize and dispatch round.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WavePlan {
    #[serde(default)]
    pub name: String,
    /// Clock time the wave starts; vehicles wait at the depot until then.
    #[serde(default, deserialize_with = "clock")]
    pub at: Option<NaiveTime>,
    pub vehicles: Vec<VehicleId>,
    #[serde(default)]
    pub check_ins: Vec<PackageId>,
    #[serde(default)]
    pub corrections: Vec<AddressCorrection>,
    /// Run the wave only while tier one packages are still waiting.
    #[serde(default)]
    pub only_if_tier_one_pending: bool,
}

/// Everything about the day that is not in the three tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayPlan {
    /// Packages that have not arrived at the start of the day.
    #[serde(default)]
    pub held: Vec<PackageId>,
    /// Packages known to carry a wrong address at check-in.
    #[serde(default)]
    pub address_invalid: Vec<PackageId>,
    #[serde(default)]
    pub restrictions: Vec<Restriction>,
    #[serde(default)]
    pub bindings: Vec<Vec<PackageId>>,
    #[serde(default)]
    pub waves: Vec<WavePlan>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_plan() {
        let json = r#"{
            "held": [6, 25],
            "address_invalid": [9],
            "restrictions": [{"package": 3, "vehicle": 2}],
            "bindings": [[13, 14, 15]],
            "waves": [
                {"name": "morning", "at": "08:00", "vehicles": [1]},
                {"at": "10:20", "vehicles": [2], "check_ins": [6],
                 "corrections": [{"package": 9, "street": "410 S State St",
                                  "city": "Salt Lake City", "state": "UT", "zipcode": "84111"}]}
            ]
        }"#;
        let plan: DayPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.held, vec![PackageId(6), PackageId(25)]);
        assert_eq!(plan.restrictions[0].vehicle, VehicleId(2));
        assert_eq!(plan.bindings[0].len(), 3);
        assert_eq!(plan.waves[0].at, NaiveTime::from_hms_opt(8, 0, 0));
        assert_eq!(plan.waves[1].corrections[0].package, PackageId(9));
        assert!(!plan.waves[1].only_if_tier_one_pending);
    }

    #[test]
    fn rejects_bad_clock() {
        let json = r#"{"waves": [{"at": "8 o'clock", "vehicles": [1]}]}"#;
        assert!(serde_json::from_str::<DayPlan>(json).is_err());
    }
}
