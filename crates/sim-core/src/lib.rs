#![deny(warnings)]

//! Core domain models and invariants for the business performance simulator.
//!
//! This crate defines the serializable types shared across the simulation —
//! variable codes, questionnaire answers, equations, demand samples and the
//! per-day result records — with validation helpers guaranteeing the basic
//! invariants: demand values are strictly positive, equations declare at
//! most five dependents, and a run never emits more days than its horizon.

pub mod catalog;
pub mod distribution;
pub mod value;

pub use distribution::{Distribution, DistributionSpec, FittedDistribution};
pub use value::AnswerValue;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Short mnemonic identifier for a business KPI, e.g. "PVP", "TPV", "IT".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarCode(pub String);

impl VarCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VarCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VarCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Business area grouping equations; the area defines resolution priority.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Area {
    Sales,
    Production,
    Accounting,
    InputInventory,
    FinishedGoodsInventory,
    Distribution,
    Procurement,
    Marketing,
    Competition,
    HumanResources,
    /// Any area outside the fixed priority list; resolved last, in catalog
    /// order.
    Other(String),
}

impl Area {
    /// Fixed resolution priority. Lower resolves first; `Other` areas all
    /// share the lowest priority and keep their catalog order.
    pub fn priority(&self) -> usize {
        match self {
            Area::Sales => 0,
            Area::Production => 1,
            Area::Accounting => 2,
            Area::InputInventory => 3,
            Area::FinishedGoodsInventory => 4,
            Area::Distribution => 5,
            Area::Procurement => 6,
            Area::Marketing => 7,
            Area::Competition => 8,
            Area::HumanResources => 9,
            Area::Other(_) => usize::MAX,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Area::Sales => "sales",
            Area::Production => "production",
            Area::Accounting => "accounting",
            Area::InputInventory => "input-inventory",
            Area::FinishedGoodsInventory => "finished-goods-inventory",
            Area::Distribution => "distribution",
            Area::Procurement => "procurement",
            Area::Marketing => "marketing",
            Area::Competition => "competition",
            Area::HumanResources => "human-resources",
            Area::Other(s) => s,
        }
    }
}

impl From<String> for Area {
    fn from(s: String) -> Self {
        match s.as_str() {
            "sales" => Area::Sales,
            "production" => Area::Production,
            "accounting" => Area::Accounting,
            "input-inventory" => Area::InputInventory,
            "finished-goods-inventory" => Area::FinishedGoodsInventory,
            "distribution" => Area::Distribution,
            "procurement" => Area::Procurement,
            "marketing" => Area::Marketing,
            "competition" => Area::Competition,
            "human-resources" => Area::HumanResources,
            _ => Area::Other(s),
        }
    }
}

impl From<Area> for String {
    fn from(a: Area) -> Self {
        a.as_str().to_string()
    }
}

/// One answered questionnaire item for a business instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Answer {
    /// Direct variable mapping, when the questionnaire declares one. Direct
    /// mappings always win over question-text matching.
    #[serde(default)]
    pub code: Option<VarCode>,
    pub question: String,
    pub answer: AnswerValue,
}

/// Maximum number of variable dependents one equation may declare.
pub const MAX_EQUATION_DEPENDS: usize = 5;

/// One business equation from the read-only configuration catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Equation {
    pub area: Area,
    pub output: VarCode,
    /// Right-hand-side arithmetic expression over the dependents.
    pub expression: String,
    #[serde(default)]
    pub depends: Vec<VarCode>,
}

/// Validate one equation record.
pub fn validate_equation(eq: &Equation) -> Result<(), CoreError> {
    if eq.output.as_str().trim().is_empty() {
        return Err(CoreError::EmptyOutput);
    }
    if eq.expression.trim().is_empty() {
        return Err(CoreError::EmptyExpression(eq.output.0.clone()));
    }
    if eq.depends.len() > MAX_EQUATION_DEPENDS {
        return Err(CoreError::TooManyDependents(eq.output.0.clone()));
    }
    Ok(())
}

/// Value held in one variable slot. Almost every variable is scalar; the
/// demand history ("DH") carries a series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Scalar(f64),
    Series(Vec<f64>),
}

impl VarValue {
    /// Scalar reading; a series collapses to its mean.
    pub fn scalar(&self) -> f64 {
        match self {
            VarValue::Scalar(v) => *v,
            VarValue::Series(xs) => {
                if xs.is_empty() {
                    0.0
                } else {
                    xs.iter().sum::<f64>() / xs.len() as f64
                }
            }
        }
    }

    pub fn series(&self) -> Option<&[f64]> {
        match self {
            VarValue::Series(xs) => Some(xs),
            VarValue::Scalar(_) => None,
        }
    }
}

impl From<f64> for VarValue {
    fn from(v: f64) -> Self {
        VarValue::Scalar(v)
    }
}

/// Per-day variable state. Built fresh each simulated day and never shared
/// across days by reference.
pub type VariableMap = BTreeMap<VarCode, VarValue>;

/// Sample size below which a data-quality warning is emitted.
pub const RECOMMENDED_SAMPLE_LEN: usize = 30;

/// Historical demand observations. Strictly positive once parsed, immutable
/// thereafter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandSample(Vec<f64>);

impl DemandSample {
    /// Build a sample, discarding non-finite and non-positive values with a
    /// warning. Errors only when nothing usable remains.
    pub fn new(values: Vec<f64>) -> Result<Self, CoreError> {
        let total = values.len();
        let kept: Vec<f64> = values
            .into_iter()
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        if kept.len() < total {
            warn!(discarded = total - kept.len(), "dropped non-positive demand values");
        }
        if kept.is_empty() {
            return Err(CoreError::NoHistoricalDemand);
        }
        if kept.len() < RECOMMENDED_SAMPLE_LEN {
            warn!(
                len = kept.len(),
                "historical demand sample below recommended size"
            );
        }
        Ok(Self(kept))
    }

    /// Parse a sample from a raw questionnaire answer (bracketed string,
    /// delimited string or native list).
    pub fn from_answer(value: &AnswerValue) -> Result<Self, CoreError> {
        let series = value.to_series().ok_or(CoreError::NoHistoricalDemand)?;
        Self::new(series)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last observed value, used to anchor early simulated days.
    pub fn last(&self) -> f64 {
        self.0.last().copied().unwrap_or(1.0)
    }
}

/// Calendar unit one simulated step represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeUnit {
    Days,
    Weeks,
    Months,
}

impl Default for TimeUnit {
    fn default() -> Self {
        TimeUnit::Days
    }
}

/// Immutable output record of one simulated day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayResult {
    pub day: usize,
    pub demand_mean: f64,
    pub demand_std: f64,
    /// Full merged variable and equation-output map, flattened to scalars.
    pub variables: BTreeMap<String, f64>,
}

impl DayResult {
    pub fn get(&self, code: &str) -> Option<f64> {
        self.variables.get(code).copied()
    }
}

/// One simulation run binding sample, distribution, horizon and the
/// append-only day series.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationRun {
    pub sample: DemandSample,
    pub distribution: FittedDistribution,
    pub horizon: usize,
    pub time_unit: TimeUnit,
    days: Vec<DayResult>,
}

impl SimulationRun {
    pub fn new(
        sample: DemandSample,
        distribution: FittedDistribution,
        horizon: usize,
        time_unit: TimeUnit,
    ) -> Self {
        Self { sample, distribution, horizon, time_unit, days: Vec::with_capacity(horizon) }
    }

    /// Append one emitted day. The series grows monotonically and never
    /// beyond the declared horizon.
    pub fn push_day(&mut self, day: DayResult) -> Result<(), CoreError> {
        if self.days.len() >= self.horizon {
            return Err(CoreError::HorizonExceeded(self.horizon));
        }
        self.days.push(day);
        Ok(())
    }

    pub fn days(&self) -> &[DayResult] {
        &self.days
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// No usable historical demand could be parsed at all.
    #[error("no historical demand")]
    NoHistoricalDemand,
    /// Equation output code is blank.
    #[error("equation output code is empty")]
    EmptyOutput,
    /// Equation has no right-hand side.
    #[error("equation for {0} has an empty expression")]
    EmptyExpression(String),
    /// More dependents than the catalog permits.
    #[error("equation for {0} declares more than {MAX_EQUATION_DEPENDS} dependents")]
    TooManyDependents(String),
    /// Distribution parameters violate the family's constraints.
    #[error("invalid {0} distribution parameters")]
    InvalidDistribution(&'static str),
    /// Appending past the declared horizon.
    #[error("day series already holds {0} days")]
    HorizonExceeded(usize),
}
