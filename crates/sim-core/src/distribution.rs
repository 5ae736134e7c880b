//! Demand distribution records.
//!
//! A business owns a small catalog of candidate distributions; fitting
//! selects one per simulation and it is immutable thereafter.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Tagged distribution family with its shape parameters.
///
/// `LogNormal` carries linear-scale moments (the optimizer's output); the
/// log-space parameters are derived where sampling and CDFs need them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "kebab-case")]
pub enum Distribution {
    Normal { mean: f64, std_dev: f64 },
    Exponential { lambda: f64 },
    LogNormal { mean: f64, std_dev: f64 },
}

impl Distribution {
    /// Family name for reporting.
    pub fn family(&self) -> &'static str {
        match self {
            Distribution::Normal { .. } => "normal",
            Distribution::Exponential { .. } => "exponential",
            Distribution::LogNormal { .. } => "log-normal",
        }
    }

    /// Theoretical mean of the distribution.
    pub fn mean(&self) -> f64 {
        match self {
            Distribution::Normal { mean, .. } | Distribution::LogNormal { mean, .. } => *mean,
            Distribution::Exponential { lambda } => {
                if *lambda > 0.0 {
                    1.0 / lambda
                } else {
                    0.0
                }
            }
        }
    }

    /// Check the family's parameter validity constraints.
    pub fn validate(&self) -> Result<(), CoreError> {
        let ok = match self {
            Distribution::Normal { mean, std_dev } => {
                mean.is_finite() && std_dev.is_finite() && *std_dev > 0.0
            }
            Distribution::Exponential { lambda } => lambda.is_finite() && *lambda > 0.0,
            Distribution::LogNormal { mean, std_dev } => {
                mean.is_finite() && std_dev.is_finite() && *mean > 0.0 && *std_dev > 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(CoreError::InvalidDistribution(self.family()))
        }
    }
}

/// One pre-configured candidate in a business's distribution catalog.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionSpec {
    #[serde(flatten)]
    pub dist: Distribution,
    /// Inactive candidates are skipped by the fitter.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl DistributionSpec {
    pub fn new(dist: Distribution) -> Self {
        Self { dist, active: true }
    }
}

/// The fitter's winning candidate with its goodness-of-fit report.
///
/// `ks_statistic` and `ks_p_value` are floor-truncated to two decimals for
/// reporting; selection upstream uses the untruncated values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedDistribution {
    #[serde(flatten)]
    pub dist: Distribution,
    /// Candidate CDF evaluated at the historical sample mean.
    pub cdf_at_mean: f64,
    pub ks_statistic: f64,
    pub ks_p_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_constraints_per_family() {
        assert!(Distribution::Normal { mean: 650.0, std_dev: 230.0 }.validate().is_ok());
        assert!(Distribution::Normal { mean: 650.0, std_dev: 0.0 }.validate().is_err());
        assert!(Distribution::Exponential { lambda: 0.0015 }.validate().is_ok());
        assert!(Distribution::Exponential { lambda: -1.0 }.validate().is_err());
        assert!(Distribution::LogNormal { mean: 650.0, std_dev: 230.0 }.validate().is_ok());
        assert!(Distribution::LogNormal { mean: -650.0, std_dev: 230.0 }.validate().is_err());
    }

    #[test]
    fn exponential_mean_is_reciprocal_rate() {
        let d = Distribution::Exponential { lambda: 0.002 };
        assert!((d.mean() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn spec_serde_roundtrip_with_family_tag() {
        let spec = DistributionSpec::new(Distribution::Normal { mean: 650.5, std_dev: 229.9 });
        let s = serde_json::to_string(&spec).unwrap();
        assert!(s.contains("\"family\":\"normal\""));
        let back: DistributionSpec = serde_json::from_str(&s).unwrap();
        assert_eq!(back, spec);
        assert!(back.active);
    }
}
