//! Variable state construction for one simulated day.
//!
//! Answers map into variables two ways: a directly attached code always
//! wins; otherwise the question text is matched against a static phrase
//! catalog. Secondary variables are derived with explicit fallback
//! formulas, and a small set of essential defaults fills what remains —
//! defaults never overwrite questionnaire or derived values.

use sim_core::{catalog, Answer, DayResult, DemandSample, VarCode, VarValue, VariableMap};
use sim_stats::moments;
use tracing::debug;

/// Trailing window of prior simulated days feeding the rolling statistics.
pub const TRAILING_WINDOW: usize = 7;

/// Static phrase catalog for question-text matching. Every keyword in an
/// entry must appear in the lowercased question; first match wins.
const PHRASES: &[(&[&str], &str)] = &[
    (&["precio", "competencia"], "PC"),
    (&["precio", "venta"], "PVP"),
    (&["clientes", "día"], "CPD"),
    (&["ventas", "cliente"], "VPC"),
    (&["demanda", "histórica"], "DH"),
    (&["capacidad", "producción"], "CPROD"),
    (&["cantidad", "planificada"], "CP"),
    (&["costo", "insumo"], "CI"),
    (&["costos", "fijos"], "CF"),
    (&["empleados"], "NE"),
    (&["salario"], "SB"),
    (&["estacionalidad"], "FS"),
    (&["tiempo", "entrega"], "TE"),
    (&["stock", "seguridad"], "SS"),
    (&["marketing"], "GM"),
    (&["inventario", "insumos"], "II"),
];

/// Essential-only defaults for variables with no source data.
const DEFAULTS: &[(&str, f64)] = &[
    ("FS", 1.0),   // seasonality factor
    ("TE", 3.0),   // lead time, days
    ("SS", 100.0), // safety stock, units
    ("NE", 1.0),
    ("SB", 950.0),
    ("GM", 0.0),
];

/// Match a question against the phrase catalog.
fn match_question(question: &str) -> Option<&'static str> {
    let lowered = question.to_lowercase();
    PHRASES
        .iter()
        .find(|(keywords, _)| keywords.iter().all(|k| lowered.contains(k)))
        .map(|(_, code)| *code)
}

fn scalar(map: &VariableMap, code: &str) -> Option<f64> {
    map.get(&VarCode::from(code)).map(|v| v.scalar())
}

fn set(map: &mut VariableMap, code: &str, value: f64) {
    map.insert(VarCode::from(code), VarValue::Scalar(value));
}

fn set_if_missing(map: &mut VariableMap, code: &str, value: f64) {
    map.entry(VarCode::from(code))
        .or_insert(VarValue::Scalar(value));
}

/// Build the initial variable map for one simulated day.
///
/// `prior_days` is the history of already-emitted days; it is only read,
/// never mutated, and day 0 seeds its rolling statistics from the full
/// historical sample instead.
pub fn build(
    answers: &[Answer],
    sample: &DemandSample,
    day_index: usize,
    prior_days: &[DayResult],
) -> VariableMap {
    let mut map = VariableMap::new();

    // Directly coded answers first: these always win.
    for answer in answers {
        if let Some(code) = &answer.code {
            ingest(&mut map, code, answer);
        }
    }
    // Text-matched answers fill codes not already present.
    for answer in answers.iter() {
        if let Some(code) = match_question(&answer.question) {
            let code = VarCode::from(code);
            if !map.contains_key(&code) {
                ingest(&mut map, &code, answer);
            }
        }
    }

    derive_secondary(&mut map, sample, day_index, prior_days);

    for (code, value) in DEFAULTS {
        set_if_missing(&mut map, code, *value);
    }
    map
}

fn ingest(map: &mut VariableMap, code: &VarCode, answer: &Answer) {
    if !catalog::is_known(code.as_str()) {
        // Unknown codes are carried opaquely.
        debug!(code = %code, "code outside the catalog, passing through");
    }
    if code.as_str() == "DH" {
        if let Some(series) = answer.answer.to_series() {
            map.insert(code.clone(), VarValue::Series(series));
        }
    } else if let Some(value) = answer.answer.to_scalar() {
        map.insert(code.clone(), VarValue::Scalar(value));
    } else {
        debug!(code = %code, "answer had no numeric content");
    }
}

fn derive_secondary(
    map: &mut VariableMap,
    sample: &DemandSample,
    day_index: usize,
    prior_days: &[DayResult],
) {
    if !map.contains_key(&VarCode::from("DH")) {
        map.insert(
            VarCode::from("DH"),
            VarValue::Series(sample.values().to_vec()),
        );
    }

    rolling_statistics(map, sample, day_index, prior_days);

    // Expected demand defaults to the rolling historical mean.
    if scalar(map, "DE").is_none() {
        if let Some(dph) = scalar(map, "DPH") {
            set(map, "DE", dph);
        }
    }

    // Units per customer: demand over customers, else a price-tier guess.
    if scalar(map, "VPC").is_none() {
        let derived = match (scalar(map, "DE"), scalar(map, "CPD")) {
            (Some(de), Some(cpd)) if cpd > 0.0 => de / cpd,
            _ => match scalar(map, "PVP") {
                Some(pvp) if pvp < 5.0 => 10.0,
                Some(pvp) if pvp < 20.0 => 3.0,
                Some(_) => 1.0,
                None => 1.0,
            },
        };
        set(map, "VPC", derived);
    }

    // Customers per day back-derives from demand when absent.
    if scalar(map, "CPD").is_none() {
        if let (Some(de), Some(vpc)) = (scalar(map, "DE"), scalar(map, "VPC")) {
            if vpc > 0.0 {
                set(map, "CPD", de / vpc);
            }
        }
    }

    // Production capacity: 1.2x the planned quantity, else headroom over
    // expected demand.
    if scalar(map, "CPROD").is_none() {
        let derived = match (scalar(map, "CP"), scalar(map, "DE")) {
            (Some(cp), _) => Some(1.2 * cp),
            (None, Some(de)) => Some(1.5 * de),
            _ => None,
        };
        if let Some(v) = derived {
            set(map, "CPROD", v);
        }
    }

    // Unit input cost tracks the sale price when not answered.
    if scalar(map, "CI").is_none() {
        if let Some(pvp) = scalar(map, "PVP") {
            set(map, "CI", 0.35 * pvp);
        }
    }
}

/// Rolling demand statistics: the full historical sample on day 0, a
/// bounded trailing window of simulated days afterwards. With no usable
/// window the codes stay unset and the day simulator backfills them from
/// the day's own demand.
fn rolling_statistics(
    map: &mut VariableMap,
    sample: &DemandSample,
    day_index: usize,
    prior_days: &[DayResult],
) {
    let (mean, std) = if day_index == 0 {
        moments(sample.values())
    } else {
        let window: Vec<f64> = prior_days
            .iter()
            .rev()
            .take(TRAILING_WINDOW)
            .filter_map(|d| d.get("DE").or(Some(d.demand_mean)))
            .collect();
        if window.is_empty() {
            return;
        }
        moments(&window)
    };
    set_if_missing(map, "DPH", mean);
    set_if_missing(map, "DSD", std);
    let cvd = if mean > 0.0 { std / mean } else { 0.0 };
    set_if_missing(map, "CVD", cvd);
}
