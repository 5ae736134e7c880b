//! Questionnaire answer values and free-text numeric parsing.
//!
//! Raw answers arrive as numbers, booleans, numeric lists or free text
//! ("€1.234,56", "15%", "Sí", "[513, 820, 648]"). Parsing is total: an
//! answer with no numeric content reads as `None`, meaning "value absent,
//! use a default" — never an error.

use serde::{Deserialize, Serialize};

/// Closed representation of a raw questionnaire answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// A yes/no style answer.
    Bool(bool),
    /// A plain numeric answer.
    Number(f64),
    /// A numeric list, e.g. a demand history.
    List(Vec<f64>),
    /// Anything else; parsed lazily on read.
    Text(String),
}

impl AnswerValue {
    /// Numeric reading of the answer. Booleans map to 1.0/0.0 and lists
    /// collapse to their mean.
    pub fn to_scalar(&self) -> Option<f64> {
        match self {
            AnswerValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            AnswerValue::Number(n) => n.is_finite().then_some(*n),
            AnswerValue::List(xs) => mean_of(xs),
            AnswerValue::Text(s) => parse_scalar_text(s),
        }
    }

    /// Series reading of the answer, used for list-typed variables such as
    /// the demand history. A lone number reads as a one-element series.
    pub fn to_series(&self) -> Option<Vec<f64>> {
        match self {
            AnswerValue::Bool(_) => None,
            AnswerValue::Number(n) => n.is_finite().then(|| vec![*n]),
            AnswerValue::List(xs) => (!xs.is_empty()).then(|| xs.clone()),
            AnswerValue::Text(s) => parse_series_text(s),
        }
    }
}

fn mean_of(xs: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = xs.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    Some(finite.iter().sum::<f64>() / finite.len() as f64)
}

/// Parse a scalar out of free text: boolean tokens, currency symbols,
/// percent signs, thousands separators and decimal commas are handled.
/// A list in a scalar slot collapses to its mean.
pub fn parse_scalar_text(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Some(b) = parse_bool_token(t) {
        return Some(if b { 1.0 } else { 0.0 });
    }
    let percent = t.contains('%');
    if let Some(v) = first_number(t) {
        return Some(if percent { v / 100.0 } else { v });
    }
    parse_series_text(t).as_deref().and_then(mean_of)
}

/// Parse a numeric series out of free text. Accepts bracketed, comma,
/// semicolon or whitespace delimited lists; unparseable fragments are
/// skipped. `None` when nothing numeric remains.
pub fn parse_series_text(s: &str) -> Option<Vec<f64>> {
    let inner = s
        .trim()
        .trim_start_matches(['[', '('])
        .trim_end_matches([']', ')']);
    let values: Vec<f64> = inner
        .split([',', ';', '\n', '\t', ' '])
        .filter(|p| !p.trim().is_empty())
        .filter_map(|p| first_number(p.trim()))
        .collect();
    (!values.is_empty()).then_some(values)
}

fn parse_bool_token(t: &str) -> Option<bool> {
    let lowered = t.trim_end_matches('.').to_lowercase();
    match lowered.as_str() {
        "sí" | "si" | "yes" | "true" | "verdadero" => Some(true),
        "no" | "false" | "falso" => Some(false),
        _ => None,
    }
}

/// First maximal run of digit/sign/separator characters that contains a
/// digit, normalized and parsed. Currency symbols and units around the
/// number fall away naturally.
fn first_number(t: &str) -> Option<f64> {
    let mut run = String::new();
    for c in t.chars() {
        if c.is_ascii_digit() || matches!(c, '.' | ',' | '+' | '-') {
            run.push(c);
        } else if run.chars().any(|r| r.is_ascii_digit()) {
            break;
        } else {
            run.clear();
        }
    }
    if !run.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    normalize_separators(&run).parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reduce mixed `.`/`,` notation to a plain decimal string.
///
/// When both separators appear, the one occurring last is the decimal mark.
/// A lone comma is a decimal mark unless it is followed by exactly three
/// digits (thousands grouping); repeated separators always group thousands.
fn normalize_separators(raw: &str) -> String {
    let has_dot = raw.contains('.');
    let has_comma = raw.contains(',');
    if has_dot && has_comma {
        if raw.rfind(',') > raw.rfind('.') {
            raw.replace('.', "").replace(',', ".")
        } else {
            raw.replace(',', "")
        }
    } else if has_comma {
        let commas = raw.matches(',').count();
        let trailing = raw.rsplit(',').next().map(str::len).unwrap_or(0);
        if commas == 1 && trailing != 3 {
            raw.replace(',', ".")
        } else {
            raw.replace(',', "")
        }
    } else if raw.matches('.').count() > 1 {
        raw.replace('.', "")
    } else {
        raw.to_string()
    }
}
