use std::env;

use chrono::NaiveTime;
use dotenv::dotenv;
use tracing::{info, warn};

pub mod constant {
    pub(crate) const VEHICLE_COUNT: usize = 2;
    pub(crate) const VEHICLE_CAPACITY: usize = 16;
    pub(crate) const VEHICLE_SPEED_MPH: f64 = 18.0;
    /// (hour, minute) upper bound of the tier 1 deadline class.
    pub(crate) const TIER_ONE_DEADLINE: (u32, u32) = (9, 0);
    pub(crate) const TIER_TWO_DEADLINE: (u32, u32) = (10, 30);
    pub(crate) const DAY_START: (u32, u32) = (8, 0);
    pub(crate) const SEED: u64 = 64;
    pub(crate) const LOCATION_CSV_PATH: &str = "data/locations.csv";
    pub(crate) const DISTANCE_CSV_PATH: &str = "data/distances.csv";
    pub(crate) const PACKAGE_CSV_PATH: &str = "data/packages.csv";
    pub(crate) const DAY_PLAN_PATH: &str = "data/day_plan.json";
    pub(crate) const REPORT_CSV_PATH: &str = "package_report.csv";
}

/// Stand-in for a pair with no measured distance. Finite so closure arithmetic
/// never produces infinities or NaN.
pub const UNREACHABLE_DISTANCE: f64 = 1.0e9;

/// Runtime knobs for loading, routing and dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub vehicle_count: usize,
    pub vehicle_capacity: usize,
    pub speed_mph: f64,
    pub tier_one_deadline: NaiveTime,
    pub tier_two_deadline: NaiveTime,
    pub day_start: NaiveTime,
    /// Keep bound packages off the first dispatch wave of the day.
    pub defer_bound_on_first_wave: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            vehicle_count: constant::VEHICLE_COUNT,
            vehicle_capacity: constant::VEHICLE_CAPACITY,
            speed_mph: constant::VEHICLE_SPEED_MPH,
            tier_one_deadline: hm(constant::TIER_ONE_DEADLINE),
            tier_two_deadline: hm(constant::TIER_TWO_DEADLINE),
            day_start: hm(constant::DAY_START),
            defer_bound_on_first_wave: false,
        }
    }
}

impl PlannerConfig {
    /// Defaults overridden by `HUB_*` variables from the process environment or `.env`.
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();
        let config = Self {
            vehicle_count: env_or("HUB_VEHICLE_COUNT", defaults.vehicle_count, |v| v.parse().ok()),
            vehicle_capacity: env_or("HUB_VEHICLE_CAPACITY", defaults.vehicle_capacity, |v| {
                v.parse().ok()
            }),
            speed_mph: env_or("HUB_SPEED_MPH", defaults.speed_mph, |v| {
                v.parse::<f64>().ok().filter(|s| *s > 0.0 && s.is_finite())
            }),
            tier_one_deadline: env_or("HUB_TIER_ONE_DEADLINE", defaults.tier_one_deadline, |v| {
                NaiveTime::parse_from_str(v, "%H:%M").ok()
            }),
            tier_two_deadline: env_or("HUB_TIER_TWO_DEADLINE", defaults.tier_two_deadline, |v| {
                NaiveTime::parse_from_str(v, "%H:%M").ok()
            }),
            day_start: env_or("HUB_DAY_START", defaults.day_start, |v| {
                NaiveTime::parse_from_str(v, "%H:%M").ok()
            }),
            defer_bound_on_first_wave: env_or(
                "HUB_DEFER_BOUND_ON_FIRST_WAVE",
                defaults.defer_bound_on_first_wave,
                |v| v.parse().ok(),
            ),
        };
        info!("Planner config: {:?}", config);
        config
    }
}

fn env_or<T: Copy + std::fmt::Debug>(
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    match env::var(key) {
        Ok(raw) => parse(raw.trim()).unwrap_or_else(|| {
            warn!("{key}={raw:?} could not be parsed, using default {default:?}");
            default
        }),
        Err(_) => default,
    }
}

pub(crate) fn hm((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = PlannerConfig::default();
        assert_eq!(config.vehicle_capacity, 16);
        assert_eq!(config.tier_one_deadline, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(config.tier_two_deadline, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert!(!config.defer_bound_on_first_wave);
    }

    #[test]
    fn env_or_falls_back_on_garbage() {
        env::set_var("HUB_TEST_ENV_OR_GARBAGE", "not-a-number");
        let value = env_or("HUB_TEST_ENV_OR_GARBAGE", 7usize, |v| v.parse().ok());
        assert_eq!(value, 7);
        env::set_var("HUB_TEST_ENV_OR_GOOD", " 12 ");
        let value = env_or("HUB_TEST_ENV_OR_GOOD", 7usize, |v| v.parse().ok());
        assert_eq!(value, 12);
    }
}
