//! The result accumulator: drives the day simulator across the horizon.
//!
//! Days are simulated strictly in order; each day's builder call receives
//! the already-emitted series as its prior-day history. A day that fails
//! internally is skipped with a warning, so the final series may be shorter
//! than the horizon — callers check length, not assume it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sim_core::{
    Answer, DayResult, DemandSample, FittedDistribution, SimulationRun, TimeUnit,
};
use sim_equations::EquationCatalog;
use tracing::{info, warn};

use crate::day::simulate_day;
use crate::demand::DemandModel;
use crate::state;

/// Run-level configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of periods to simulate.
    pub horizon: usize,
    #[serde(default)]
    pub time_unit: TimeUnit,
    /// Seed for the run's deterministic RNG.
    pub rng_seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { horizon: 30, time_unit: TimeUnit::Days, rng_seed: 42 }
    }
}

/// Cooperative cancellation: checked between day iterations, so no partial
/// day ever needs rollback.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Run a full simulation and return the owning record.
///
/// The returned run's day series holds at most `config.horizon` entries;
/// skipped days and cancellation shorten it.
pub fn run_simulation(
    config: &SimulationConfig,
    catalog: &EquationCatalog,
    answers: &[Answer],
    sample: &DemandSample,
    fitted: FittedDistribution,
    cancel: Option<&CancelToken>,
) -> SimulationRun {
    let model = DemandModel::new(sample, fitted.dist);
    let mut run = SimulationRun::new(sample.clone(), fitted, config.horizon, config.time_unit);
    let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
    info!(
        horizon = config.horizon,
        family = fitted.dist.family(),
        "starting simulation run"
    );

    for day_index in 0..config.horizon {
        if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
            info!(day = day_index, "run cancelled, stopping");
            break;
        }
        let vars = state::build(answers, sample, day_index, run.days());
        match simulate_day(catalog, &model, vars, day_index, &mut rng) {
            Ok(day) => {
                if let Err(e) = run.push_day(day) {
                    warn!(day = day_index, error = %e, "could not append day");
                    break;
                }
            }
            Err(e) => {
                warn!(day = day_index, error = %e, "day simulation failed, skipping");
            }
        }
    }
    info!(emitted = run.days().len(), "simulation run finished");
    run
}

/// Aggregate totals downstream reporting reads off a finished run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub days: usize,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub mean_demand: f64,
    pub mean_utilization: f64,
}

/// Summarize an accumulated day series.
pub fn summarize(days: &[DayResult]) -> RunSummary {
    let n = days.len();
    let mut total_revenue = 0.0;
    let mut total_profit = 0.0;
    let mut demand = 0.0;
    let mut utilization = 0.0;
    for day in days {
        total_revenue += day.get("IT").unwrap_or(0.0);
        total_profit += day.get("GT").unwrap_or(0.0);
        demand += day.get("DE").unwrap_or(0.0);
        utilization += day.get("FU").unwrap_or(0.0);
    }
    let denom = n.max(1) as f64;
    RunSummary {
        days: n,
        total_revenue,
        total_profit,
        mean_demand: demand / denom,
        mean_utilization: utilization / denom,
    }
}
