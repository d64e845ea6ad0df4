use std::error::Error;
use std::path::Path;

use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::constant::{LOCATION_CSV_PATH, REPORT_CSV_PATH, SEED};
use crate::config::PlannerConfig;
use crate::domain::types::VehicleId;
use crate::domain::vehicle::DispatchOutcome;
use crate::domain::views::classify;
use crate::domain::PriorityTier;
use crate::error::Result;
use crate::fixtures::data_generator::generate_hub_with;
use crate::hub::Hub;
use crate::report::{save_to_csv, DayReport};
use crate::setup::init_types::{DayPlan, WavePlan};
use crate::setup::{open_day, setup_with_plan};

/// Initialize tracing and environment
fn init_tracing_and_env() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            fmt::layer()
                .with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE)
                .pretty(),
        )
        .init();

    dotenv::dotenv().ok();
    Ok(())
}

fn tier_one_pending(hub: &Hub) -> bool {
    let config = hub.config();
    hub.registry().ready_packages().any(|p| {
        classify(p.deadline, config.tier_one_deadline, config.tier_two_deadline)
            == Some(PriorityTier::One)
    })
}

/// Applies the wave's arrivals and corrections, then load, optimize and
/// dispatch for its vehicles. Returns whether the wave ran.
pub fn run_wave(hub: &mut Hub, wave: &WavePlan) -> Result<bool> {
    let span = span!(Level::INFO, "wave", name = wave.name.as_str());
    let _g = span.enter();

    if wave.only_if_tier_one_pending && !tier_one_pending(hub) {
        info!("No tier one packages waiting, skipping wave");
        return Ok(false);
    }

    let at = wave.at.unwrap_or(hub.config().day_start);
    for id in &wave.check_ins {
        hub.check_in(*id, at, None)?;
    }
    for correction in &wave.corrections {
        hub.correct_address(
            correction.package,
            &correction.street,
            &correction.city,
            &correction.state,
            &correction.zipcode,
        )?;
    }
    for vehicle in &wave.vehicles {
        hub.prepare_vehicle(*vehicle, wave.at)?;
    }

    hub.load_ready_vehicles()?;
    hub.optimize_ready_vehicles()?;
    for (id, outcome) in hub.dispatch_ready_vehicles()? {
        match outcome {
            DispatchOutcome::Idle => debug!("Vehicle {} had nothing to deliver", id),
            DispatchOutcome::Completed {
                delivered,
                route_miles,
                returned_at,
            } => info!(
                "Vehicle {} delivered {} packages over {:.1} miles, back at {}",
                id,
                delivered.len(),
                route_miles,
                returned_at.format("%H:%M")
            ),
        }
    }
    Ok(true)
}

/// Opens the day and runs every wave in order. Without planned waves, the
/// whole fleet goes out as often as it takes to clear the pool.
pub fn run_day(hub: &mut Hub, plan: &DayPlan) -> Result<()> {
    open_day(hub, plan)?;
    if plan.waves.is_empty() {
        let wave = WavePlan {
            name: "all".to_string(),
            vehicles: hub.vehicles().iter().map(|v| v.id()).collect::<Vec<VehicleId>>(),
            ..WavePlan::default()
        };
        // Repeat until the pool is empty or a wave moves nothing.
        loop {
            let before = hub.registry().ready_pool().len();
            run_wave(hub, &wave)?;
            let after = hub.registry().ready_pool().len();
            if after == 0 || after == before {
                break;
            }
        }
    } else {
        for wave in &plan.waves {
            run_wave(hub, wave)?;
        }
    }

    let left = hub.registry().ready_pool().len();
    if left > 0 {
        warn!("{} packages still waiting at the depot at end of day", left);
    }
    Ok(())
}

pub fn run() -> std::result::Result<(), Box<dyn Error>> {
    init_tracing_and_env()?;
    let config = PlannerConfig::from_env();

    let (mut hub, plan) = if Path::new(LOCATION_CSV_PATH).exists() {
        setup_with_plan(config)?
    } else {
        warn!(
            "No location table at {}, falling back to a generated instance",
            LOCATION_CSV_PATH
        );
        (generate_hub_with(27, 40, SEED, config)?, DayPlan::default())
    };

    run_day(&mut hub, &plan)?;

    let report = DayReport::from_hub(&hub);
    report.print();
    save_to_csv(&hub, REPORT_CSV_PATH)?;
    info!("Package report written to {}", REPORT_CSV_PATH);
    Ok(())
}
