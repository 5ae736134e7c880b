//! One simulated day.
//!
//! Phases: predict demand, resolve equations, apply fallback formulas for
//! the business-critical outputs the equation graph did not produce, then
//! validate and clamp for physical and financial plausibility. Every day
//! therefore emits a complete KPI set even over an incomplete catalog, and
//! consistency violations are corrected with a logged warning, never an
//! abort.

use std::collections::BTreeMap;

use rand::Rng;
use sim_core::{DayResult, VarCode, VarValue, VariableMap};
use sim_equations::{resolve, EquationCatalog};
use thiserror::Error;
use tracing::{debug, warn};

use crate::demand::DemandModel;

/// Internal failures of one day's simulation. The accumulator skips the
/// day and keeps the run alive.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("non-finite demand prediction on day {0}")]
    BadDemand(usize),
}

/// Business-critical outputs that must exist on every emitted day, with
/// their closed-form fallbacks, in dependency order.
const FALLBACK_OUTPUTS: &[&str] = &[
    "TCAE", "TPV", "TPPRO", "IT", "CTAI", "GO", "GG", "TG", "GT", "FU", "PE", "NR", "IPF", "MB",
    "RI", "DI", "RTI", "PM", "NCM",
];

/// Sales are flagged as a consistency violation above this multiple of
/// production.
const SALES_OVER_PRODUCTION_WARN: f64 = 1.1;

/// Allowed profit-margin band; total cost is clamped back to it.
const MARGIN_MIN: f64 = -0.3;
const MARGIN_MAX: f64 = 0.8;

fn get(map: &VariableMap, code: &str) -> Option<f64> {
    map.get(&VarCode::from(code)).map(|v| v.scalar())
}

fn set(map: &mut VariableMap, code: &str, value: f64) {
    map.insert(VarCode::from(code), VarValue::Scalar(value));
}

/// Simulate one day over an initial variable state.
pub fn simulate_day(
    catalog: &EquationCatalog,
    model: &DemandModel,
    mut vars: VariableMap,
    day_index: usize,
    rng: &mut impl Rng,
) -> Result<DayResult, SimError> {
    // Predict demand. Rolling stats default to the historical anchors when
    // the builder had no window to compute them from.
    let seasonality = get(&vars, "FS").unwrap_or(1.0);
    let rolling_mean = get(&vars, "DPH").unwrap_or(model.historical_mean());
    let rolling_std = get(&vars, "DSD").unwrap_or(0.0);
    let demand = model.predict(day_index, seasonality, rolling_mean, rolling_std, rng);
    if !demand.is_finite() || demand <= 0.0 {
        return Err(SimError::BadDemand(day_index));
    }
    set(&mut vars, "DE", demand);
    if get(&vars, "DPH").is_none() {
        // No trailing window existed; fall back to the day's own demand.
        set(&mut vars, "DPH", demand);
        set(&mut vars, "DSD", 0.0);
        set(&mut vars, "CVD", 0.0);
    }

    // Resolve the equation graph once, in area-priority order.
    let resolution = resolve(catalog, &vars);
    if !resolution.unresolved.is_empty() {
        debug!(
            day = day_index,
            unresolved = resolution.unresolved.len(),
            "equations parked; fallbacks will cover business-critical outputs"
        );
    }
    for (code, value) in &resolution.solved {
        set(&mut vars, code.as_str(), *value);
    }

    apply_fallbacks(&mut vars);
    validate_and_clamp(&mut vars, day_index);

    let mut variables = BTreeMap::new();
    for (code, value) in &vars {
        variables.insert(code.0.clone(), value.scalar());
    }
    Ok(DayResult {
        day: day_index,
        demand_mean: get(&vars, "DPH").unwrap_or(demand),
        demand_std: get(&vars, "DSD").unwrap_or(0.0),
        variables,
    })
}

/// Closed-form fallbacks for outputs the equation graph failed to produce.
/// Each formula only reads inputs and earlier fallbacks, so the pass is a
/// single ordered sweep.
fn apply_fallbacks(vars: &mut VariableMap) {
    for output in FALLBACK_OUTPUTS {
        if get(vars, output).is_some() {
            continue;
        }
        let value = fallback_value(vars, output);
        debug!(output = *output, value, "fallback formula applied");
        set(vars, output, value);
    }
}

fn fallback_value(vars: &VariableMap, output: &str) -> f64 {
    let de = get(vars, "DE").unwrap_or(0.0);
    let pvp = get(vars, "PVP").unwrap_or(0.0);
    match output {
        "TCAE" => {
            let vpc = get(vars, "VPC").unwrap_or(1.0).max(1e-6);
            let served = de / vpc;
            match get(vars, "CPD") {
                Some(cpd) => served.min(cpd),
                None => served,
            }
        }
        "TPV" => {
            let vpc = get(vars, "VPC").unwrap_or(1.0);
            let offered = get(vars, "TCAE").unwrap_or(0.0) * vpc;
            let capped = match get(vars, "CPROD") {
                Some(cprod) => offered.min(0.9 * cprod),
                None => offered,
            };
            capped.min(de).max(0.0)
        }
        "TPPRO" => {
            let tpv = get(vars, "TPV").unwrap_or(0.0);
            let planned = get(vars, "CP").unwrap_or(0.0);
            let wanted = (tpv * 1.05).max(planned);
            match get(vars, "CPROD") {
                Some(cprod) => wanted.min(cprod),
                None => wanted,
            }
        }
        "IT" => get(vars, "TPV").unwrap_or(0.0) * pvp,
        "CTAI" => {
            let ci = get(vars, "CI").unwrap_or(0.0);
            get(vars, "TPPRO").unwrap_or(0.0) * ci
        }
        "GO" => {
            let labor = get(vars, "NE").unwrap_or(1.0) * get(vars, "SB").unwrap_or(0.0) / 30.0;
            labor + 0.1 * get(vars, "IT").unwrap_or(0.0)
        }
        "GG" => get(vars, "CF").unwrap_or(0.0) + 0.05 * get(vars, "IT").unwrap_or(0.0),
        "TG" => {
            get(vars, "CTAI").unwrap_or(0.0)
                + get(vars, "GO").unwrap_or(0.0)
                + get(vars, "GG").unwrap_or(0.0)
        }
        "GT" => get(vars, "IT").unwrap_or(0.0) - get(vars, "TG").unwrap_or(0.0),
        "FU" => {
            let cprod = get(vars, "CPROD").unwrap_or(0.0);
            if cprod > 0.0 {
                get(vars, "TPPRO").unwrap_or(0.0) / cprod
            } else {
                0.0
            }
        }
        "PE" => {
            let unit_margin = pvp - get(vars, "CI").unwrap_or(0.0);
            if unit_margin > 0.0 {
                (get(vars, "GO").unwrap_or(0.0) + get(vars, "GG").unwrap_or(0.0)) / unit_margin
            } else {
                0.0
            }
        }
        "NR" => {
            get(vars, "DPH").unwrap_or(de) * get(vars, "TE").unwrap_or(3.0)
                + get(vars, "SS").unwrap_or(0.0)
        }
        "IPF" => {
            let produced = get(vars, "TPPRO").unwrap_or(0.0);
            let sold = get(vars, "TPV").unwrap_or(0.0);
            (produced - sold).max(0.0) + get(vars, "SS").unwrap_or(0.0)
        }
        "MB" => {
            let it = get(vars, "IT").unwrap_or(0.0);
            if it > 0.0 {
                (it - get(vars, "CTAI").unwrap_or(0.0)) / it
            } else {
                0.0
            }
        }
        "RI" => get(vars, "TPV").unwrap_or(0.0) / get(vars, "IPF").unwrap_or(0.0).max(1.0),
        "DI" => get(vars, "IPF").unwrap_or(0.0) / get(vars, "DPH").unwrap_or(de).max(1.0),
        "RTI" => get(vars, "GT").unwrap_or(0.0) / get(vars, "TG").unwrap_or(0.0).max(1.0),
        "PM" => {
            let tpv = get(vars, "TPV").unwrap_or(0.0);
            if de > 0.0 {
                (tpv / de).clamp(0.0, 1.0)
            } else {
                0.0
            }
        }
        "NCM" => get(vars, "GM").unwrap_or(0.0) / (10.0 * pvp).max(1.0),
        _ => 0.0,
    }
}

/// Enforce physical and financial plausibility. All corrections are
/// recoverable; each logs a warning and the day continues.
fn validate_and_clamp(vars: &mut VariableMap, day_index: usize) {
    // Production never exceeds capacity.
    if let (Some(tppro), Some(cprod)) = (get(vars, "TPPRO"), get(vars, "CPROD")) {
        if tppro > cprod {
            warn!(day = day_index, tppro, cprod, "production capped at capacity");
            set(vars, "TPPRO", cprod);
        }
    }

    // Sales never exceed production; beyond a 10% overshoot this is a
    // consistency violation rather than rounding noise.
    if let (Some(tpv), Some(tppro)) = (get(vars, "TPV"), get(vars, "TPPRO")) {
        if tpv > tppro {
            if tpv > SALES_OVER_PRODUCTION_WARN * tppro {
                warn!(day = day_index, tpv, tppro, "sales capped at production");
            } else {
                debug!(day = day_index, tpv, tppro, "sales trimmed to production");
            }
            set(vars, "TPV", tppro);
        }
    }

    // Revenue identity: IT == TPV * PVP within 1%.
    if let (Some(it), Some(tpv), Some(pvp)) = (get(vars, "IT"), get(vars, "TPV"), get(vars, "PVP"))
    {
        let expected = tpv * pvp;
        if (it - expected).abs() > 0.01 * it.abs().max(f64::EPSILON) {
            warn!(day = day_index, it, expected, "revenue identity corrected");
            set(vars, "IT", expected);
            if let Some(tg) = get(vars, "TG") {
                set(vars, "GT", expected - tg);
            }
        }
    }

    // Profit margin stays within the allowed band; total cost is clamped
    // back to the bound.
    if let Some(it) = get(vars, "IT") {
        if it > 0.0 {
            let gt = get(vars, "GT").unwrap_or(0.0);
            let margin = gt / it;
            if margin < MARGIN_MIN {
                warn!(day = day_index, margin, "extreme loss margin, cost clamped");
                set(vars, "TG", (1.0 - MARGIN_MIN) * it);
                set(vars, "GT", MARGIN_MIN * it);
            } else if margin > MARGIN_MAX {
                warn!(day = day_index, margin, "implausible margin, cost clamped");
                set(vars, "TG", (1.0 - MARGIN_MAX) * it);
                set(vars, "GT", MARGIN_MAX * it);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{Area, DemandSample, Distribution, Equation};

    fn sample() -> DemandSample {
        DemandSample::new(vec![
            513.0, 820.0, 648.0, 720.0, 649.0, 414.0, 704.0, 814.0, 647.0, 934.0, 483.0, 882.0,
            220.0, 419.0, 254.0, 781.0, 674.0, 498.0, 518.0, 948.0, 983.0, 154.0, 649.0, 625.0,
            865.0, 800.0, 848.0, 783.0, 218.0, 906.0,
        ])
        .unwrap()
    }

    fn model() -> DemandModel {
        let s = sample();
        let (m, sd) = sim_stats::moments(s.values());
        DemandModel::new(&s, Distribution::Normal { mean: m, std_dev: sd })
    }

    fn base_vars() -> VariableMap {
        let mut vars = VariableMap::new();
        set(&mut vars, "PVP", 15.5);
        set(&mut vars, "VPC", 3.0);
        set(&mut vars, "CPD", 85.0);
        set(&mut vars, "CPROD", 900.0);
        set(&mut vars, "CI", 5.0);
        set(&mut vars, "NE", 2.0);
        set(&mut vars, "SB", 950.0);
        set(&mut vars, "FS", 1.0);
        set(&mut vars, "TE", 3.0);
        set(&mut vars, "SS", 100.0);
        set(&mut vars, "GM", 40.0);
        set(&mut vars, "DPH", 650.5);
        set(&mut vars, "DSD", 229.0);
        vars
    }

    fn empty_catalog() -> EquationCatalog {
        EquationCatalog::compile(vec![]).unwrap()
    }

    #[test]
    fn every_business_critical_output_is_emitted() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let day = simulate_day(&empty_catalog(), &model(), base_vars(), 0, &mut rng).unwrap();
        for output in FALLBACK_OUTPUTS {
            assert!(day.get(output).is_some(), "missing {output}");
        }
        assert!(day.demand_mean > 0.0);
    }

    #[test]
    fn capacity_invariants_hold_after_validation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for day_index in 0..50 {
            let day =
                simulate_day(&empty_catalog(), &model(), base_vars(), day_index, &mut rng).unwrap();
            let tpv = day.get("TPV").unwrap();
            let tppro = day.get("TPPRO").unwrap();
            let cprod = day.get("CPROD").unwrap();
            assert!(tpv <= tppro + 1e-9, "day {day_index}: TPV {tpv} > TPPRO {tppro}");
            assert!(tppro <= cprod + 1e-9, "day {day_index}: TPPRO {tppro} > CPROD {cprod}");
        }
    }

    #[test]
    fn revenue_identity_holds_after_validation() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for day_index in 0..50 {
            let day =
                simulate_day(&empty_catalog(), &model(), base_vars(), day_index, &mut rng).unwrap();
            let it = day.get("IT").unwrap();
            if it > 0.0 {
                let expected = day.get("TPV").unwrap() * day.get("PVP").unwrap();
                assert!((it - expected).abs() <= 0.01 * it + 1e-9);
            }
        }
    }

    #[test]
    fn margin_stays_in_the_allowed_band() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        for day_index in 0..50 {
            let day =
                simulate_day(&empty_catalog(), &model(), base_vars(), day_index, &mut rng).unwrap();
            let it = day.get("IT").unwrap();
            if it > 0.0 {
                let margin = day.get("GT").unwrap() / it;
                assert!(
                    (MARGIN_MIN - 1e-9..=MARGIN_MAX + 1e-9).contains(&margin),
                    "day {day_index}: margin {margin}"
                );
            }
        }
    }

    #[test]
    fn oversold_state_is_corrected_not_fatal() {
        let catalog = EquationCatalog::compile(vec![Equation {
            area: Area::Sales,
            output: VarCode::from("TPV"),
            expression: "CPROD * 5".to_string(),
            depends: vec![VarCode::from("CPROD")],
        }])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let day = simulate_day(&catalog, &model(), base_vars(), 0, &mut rng).unwrap();
        assert!(day.get("TPV").unwrap() <= day.get("TPPRO").unwrap() + 1e-9);
    }

    #[test]
    fn equation_outputs_survive_into_the_result() {
        // IT parked on the first pass is still present via its fallback.
        let catalog = EquationCatalog::compile(vec![Equation {
            area: Area::Accounting,
            output: VarCode::from("IT"),
            expression: "TPV * PVP".to_string(),
            depends: vec![VarCode::from("TPV"), VarCode::from("PVP")],
        }])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let day = simulate_day(&catalog, &model(), base_vars(), 0, &mut rng).unwrap();
        let it = day.get("IT").unwrap();
        let expected = day.get("TPV").unwrap() * day.get("PVP").unwrap();
        assert!((it - expected).abs() <= 0.01 * it.max(f64::EPSILON) + 1e-9);
    }

    proptest! {
        #[test]
        fn clamps_always_restore_the_invariants(
            tpv in 0.0f64..10_000.0,
            tppro in 0.0f64..5_000.0,
            cprod in 1.0f64..4_000.0,
            gt in -20_000.0f64..20_000.0,
        ) {
            let mut vars = VariableMap::new();
            set(&mut vars, "TPV", tpv);
            set(&mut vars, "TPPRO", tppro);
            set(&mut vars, "CPROD", cprod);
            set(&mut vars, "PVP", 15.5);
            set(&mut vars, "IT", tpv * 15.5);
            set(&mut vars, "TG", tpv * 15.5 - gt);
            set(&mut vars, "GT", gt);
            validate_and_clamp(&mut vars, 0);
            let tpv = get(&vars, "TPV").unwrap();
            let tppro = get(&vars, "TPPRO").unwrap();
            prop_assert!(tpv <= tppro + 1e-9);
            prop_assert!(tppro <= cprod + 1e-9);
            let it = get(&vars, "IT").unwrap();
            if it > 0.0 {
                let margin = get(&vars, "GT").unwrap() / it;
                prop_assert!((-0.3 - 1e-9..=0.8 + 1e-9).contains(&margin));
            }
        }
    }

    #[test]
    fn missing_rolling_stats_backfill_from_the_day() {
        let mut vars = base_vars();
        vars.remove(&VarCode::from("DPH"));
        vars.remove(&VarCode::from("DSD"));
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let day = simulate_day(&empty_catalog(), &model(), vars, 3, &mut rng).unwrap();
        assert_eq!(day.get("DPH"), day.get("DE"));
        assert_eq!(day.get("DSD"), Some(0.0));
    }
}
