//! Distribution fitting.
//!
//! The fitter smooths the historical sample with a Gaussian kernel density
//! estimate, refines Normal parameters by minimizing squared error against
//! the smoothed density (Nelder–Mead, not closed-form), then ranks every
//! active candidate by the p-value of a one-sample Kolmogorov–Smirnov test
//! of the sample mean against the candidate CDF. Highest p-value wins; ties
//! keep the first candidate encountered.

use sim_core::{DemandSample, Distribution, DistributionSpec, FittedDistribution};
use statrs::distribution::{
    Continuous, ContinuousCDF, Exp, LogNormal as StatsLogNormal, Normal as StatsNormal,
};
use thiserror::Error;
use tracing::debug;

use crate::moments;

/// Fitting failures. Both are recoverable: the caller supplies a
/// moment-fitted Normal via [`moment_normal`].
#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    /// No active candidate improved on an initial p-value of 0.0.
    #[error("no distribution fits")]
    NoDistributionFits,
}

/// Smoothed density of a sample over an even evaluation grid.
#[derive(Clone, Debug)]
pub struct SmoothedDensity {
    pub xs: Vec<f64>,
    pub density: Vec<f64>,
}

/// Gaussian kernel density estimate with Silverman's bandwidth.
pub fn kernel_density(sample: &[f64], points: usize) -> SmoothedDensity {
    let n = sample.len();
    let (m, sd) = moments(sample);
    let h = if sd > 0.0 {
        1.06 * sd * (n as f64).powf(-0.2)
    } else {
        (0.1 * m.abs()).max(1.0)
    };
    let lo = sample.iter().copied().fold(f64::INFINITY, f64::min) - h;
    let hi = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max) + h;
    let step = (hi - lo) / (points.max(2) - 1) as f64;
    let norm = 1.0 / (n as f64 * h * (2.0 * std::f64::consts::PI).sqrt());
    let mut xs = Vec::with_capacity(points);
    let mut density = Vec::with_capacity(points);
    for i in 0..points {
        let x = lo + step * i as f64;
        let d: f64 = sample
            .iter()
            .map(|xi| (-0.5 * ((x - xi) / h).powi(2)).exp())
            .sum();
        xs.push(x);
        density.push(norm * d);
    }
    SmoothedDensity { xs, density }
}

/// Sum of squared error between the smoothed density and a Normal pdf.
fn normal_sse(grid: &SmoothedDensity, mean: f64, std_dev: f64) -> f64 {
    if !mean.is_finite() || !(std_dev > 0.0) {
        return f64::INFINITY;
    }
    let normal = match StatsNormal::new(mean, std_dev) {
        Ok(n) => n,
        Err(_) => return f64::INFINITY,
    };
    grid.xs
        .iter()
        .zip(&grid.density)
        .map(|(x, d)| (normal.pdf(*x) - d).powi(2))
        .sum()
}

/// Local Nelder–Mead refinement of (mean, std dev) against the smoothed
/// density, seeded with the moment estimates.
pub fn refine_normal(seed_mean: f64, seed_sd: f64, grid: &SmoothedDensity) -> (f64, f64) {
    let f = |p: [f64; 2]| normal_sse(grid, p[0], p[1]);
    let scale = [seed_sd.max(1.0), (seed_sd * 0.5).max(0.5)];
    let mut simplex = [
        [seed_mean, seed_sd],
        [seed_mean + scale[0], seed_sd],
        [seed_mean, seed_sd + scale[1]],
    ];
    let mut values = simplex.map(f);
    for _ in 0..200 {
        // Order best..worst.
        let mut idx = [0usize, 1, 2];
        idx.sort_by(|a, b| values[*a].partial_cmp(&values[*b]).unwrap_or(std::cmp::Ordering::Equal));
        simplex = [simplex[idx[0]], simplex[idx[1]], simplex[idx[2]]];
        values = [values[idx[0]], values[idx[1]], values[idx[2]]];
        if (values[2] - values[0]).abs() < 1e-12 {
            break;
        }
        let centroid = [
            (simplex[0][0] + simplex[1][0]) / 2.0,
            (simplex[0][1] + simplex[1][1]) / 2.0,
        ];
        let reflect = |t: f64| {
            [
                centroid[0] + t * (centroid[0] - simplex[2][0]),
                centroid[1] + t * (centroid[1] - simplex[2][1]),
            ]
        };
        let xr = reflect(1.0);
        let fr = f(xr);
        if fr < values[0] {
            let xe = reflect(2.0);
            let fe = f(xe);
            if fe < fr {
                simplex[2] = xe;
                values[2] = fe;
            } else {
                simplex[2] = xr;
                values[2] = fr;
            }
        } else if fr < values[1] {
            simplex[2] = xr;
            values[2] = fr;
        } else {
            let xc = reflect(-0.5);
            let fc = f(xc);
            if fc < values[2] {
                simplex[2] = xc;
                values[2] = fc;
            } else {
                // Shrink toward the best vertex.
                for i in 1..3 {
                    simplex[i] = [
                        simplex[0][0] + 0.5 * (simplex[i][0] - simplex[0][0]),
                        simplex[0][1] + 0.5 * (simplex[i][1] - simplex[0][1]),
                    ];
                    values[i] = f(simplex[i]);
                }
            }
        }
    }
    let best = values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let [m, sd] = simplex[best];
    if m.is_finite() && sd.is_finite() && sd > 0.0 {
        (m, sd)
    } else {
        (seed_mean, seed_sd)
    }
}

/// Candidate CDF at a point. Degenerate parameters evaluate to 0.0.
pub fn cdf(dist: &Distribution, x: f64) -> f64 {
    match dist {
        Distribution::Normal { mean, std_dev } => StatsNormal::new(*mean, *std_dev)
            .map(|d| d.cdf(x))
            .unwrap_or(0.0),
        Distribution::Exponential { lambda } => {
            Exp::new(*lambda).map(|d| d.cdf(x)).unwrap_or(0.0)
        }
        Distribution::LogNormal { mean, std_dev } => log_space_params(*mean, *std_dev)
            .and_then(|(mu, sigma)| StatsLogNormal::new(mu, sigma).ok())
            .map(|d| d.cdf(x))
            .unwrap_or(0.0),
    }
}

/// Log-space (location, scale) for a LogNormal carrying linear moments.
pub(crate) fn log_space_params(mean: f64, std_dev: f64) -> Option<(f64, f64)> {
    if !(mean > 0.0) || !(std_dev > 0.0) {
        return None;
    }
    let sigma2 = (1.0 + (std_dev / mean).powi(2)).ln();
    Some((mean.ln() - sigma2 / 2.0, sigma2.sqrt()))
}

/// One-sample Kolmogorov–Smirnov statistic of a sample against a CDF.
pub fn ks_statistic(sample: &[f64], cdf: impl Fn(f64) -> f64) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let mut xs = sample.to_vec();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = xs.len() as f64;
    let mut d: f64 = 0.0;
    for (i, x) in xs.iter().enumerate() {
        let f = cdf(*x).clamp(0.0, 1.0);
        d = d.max((i as f64 + 1.0) / n - f).max(f - i as f64 / n);
    }
    d.clamp(0.0, 1.0)
}

/// Two-sided asymptotic KS p-value with the small-sample correction of the
/// effective sqrt(n) term.
pub fn ks_p_value(statistic: f64, n: usize) -> f64 {
    if n == 0 || statistic <= 0.0 {
        return 1.0;
    }
    if statistic >= 1.0 {
        return 0.0;
    }
    let sqrt_n = (n as f64).sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * statistic;
    let mut sum = 0.0;
    for k in 1..=100u32 {
        let term = (-2.0 * (k as f64 * lambda).powi(2)).exp();
        if k % 2 == 1 {
            sum += term;
        } else {
            sum -= term;
        }
        if term < 1e-10 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Moment-fitted Normal: the documented fallback when no candidate fits.
pub fn moment_normal(sample: &DemandSample) -> Distribution {
    let (m, sd) = moments(sample.values());
    Distribution::Normal {
        mean: m,
        std_dev: if sd > 0.0 { sd } else { (0.05 * m).max(1e-3) },
    }
}

fn floor2(v: f64) -> f64 {
    (v * 100.0).floor() / 100.0
}

/// Fit the best distribution to a historical demand sample.
///
/// Normal and Log-Normal candidates are instantiated with the optimized
/// (mean, std dev); Exponential keeps its stored rate. Goodness of fit is
/// the one-sample KS test between the sample mean and the candidate CDF.
/// The reported statistic and p-value are floor-truncated to two decimals;
/// selection uses the untruncated values.
pub fn fit(
    sample: &DemandSample,
    candidates: &[DistributionSpec],
) -> Result<FittedDistribution, FitError> {
    let (m, sd) = moments(sample.values());
    let (opt_mean, opt_sd) = if sd > 0.0 {
        let grid = kernel_density(sample.values(), 100);
        refine_normal(m, sd, &grid)
    } else {
        // Zero-variance sample: keep the seed parameters.
        (m, (0.05 * m).max(1e-3))
    };

    let mut best: Option<(f64, FittedDistribution)> = None;
    for spec in candidates.iter().filter(|s| s.active) {
        let dist = match spec.dist {
            Distribution::Normal { .. } => Distribution::Normal {
                mean: opt_mean,
                std_dev: opt_sd,
            },
            Distribution::Exponential { lambda } => Distribution::Exponential { lambda },
            Distribution::LogNormal { .. } => Distribution::LogNormal {
                mean: opt_mean,
                std_dev: opt_sd,
            },
        };
        if dist.validate().is_err() {
            debug!(family = dist.family(), "skipping degenerate candidate");
            continue;
        }
        let statistic = ks_statistic(&[m], |x| cdf(&dist, x));
        let p = ks_p_value(statistic, 1);
        debug!(family = dist.family(), statistic, p, "candidate scored");
        let improves = match &best {
            Some((best_p, _)) => p > *best_p,
            None => p > 0.0,
        };
        if improves {
            best = Some((
                p,
                FittedDistribution {
                    dist,
                    cdf_at_mean: cdf(&dist, m),
                    ks_statistic: floor2(statistic),
                    ks_p_value: floor2(p),
                },
            ));
        }
    }
    best.map(|(_, f)| f).ok_or(FitError::NoDistributionFits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::DemandSample;

    // 30-point demand history used across the engine's scenario tests.
    const SAMPLE: [f64; 30] = [
        513.0, 820.0, 648.0, 720.0, 649.0, 414.0, 704.0, 814.0, 647.0, 934.0, 483.0, 882.0, 220.0,
        419.0, 254.0, 781.0, 674.0, 498.0, 518.0, 948.0, 983.0, 154.0, 649.0, 625.0, 865.0, 800.0,
        848.0, 783.0, 218.0, 906.0,
    ];

    fn all_candidates() -> Vec<DistributionSpec> {
        let (m, sd) = moments(&SAMPLE);
        vec![
            DistributionSpec::new(Distribution::Normal { mean: m, std_dev: sd }),
            DistributionSpec::new(Distribution::Exponential { lambda: 1.0 / m }),
            DistributionSpec::new(Distribution::LogNormal { mean: m, std_dev: sd }),
        ]
    }

    #[test]
    fn kernel_density_integrates_to_one() {
        let grid = kernel_density(&SAMPLE, 200);
        let step = grid.xs[1] - grid.xs[0];
        let area: f64 = grid.density.iter().sum::<f64>() * step;
        assert!((area - 1.0).abs() < 0.05, "area = {area}");
    }

    #[test]
    fn refinement_stays_near_moment_seed() {
        let (m, sd) = moments(&SAMPLE);
        let grid = kernel_density(&SAMPLE, 100);
        let (rm, rsd) = refine_normal(m, sd, &grid);
        assert!(rsd > 0.0);
        assert!((rm - m).abs() < sd, "refined mean drifted: {rm} vs {m}");
    }

    #[test]
    fn ks_of_normal_at_its_own_mean() {
        let d = Distribution::Normal { mean: 650.0, std_dev: 200.0 };
        let statistic = ks_statistic(&[650.0], |x| cdf(&d, x));
        assert!((statistic - 0.5).abs() < 1e-9);
        let p = ks_p_value(statistic, 1);
        assert!(p > 0.5 && p < 1.0);
    }

    #[test]
    fn scenario_sample_selects_a_distribution() {
        let sample = DemandSample::new(SAMPLE.to_vec()).unwrap();
        let fitted = fit(&sample, &all_candidates()).unwrap();
        assert!((0.0..=1.0).contains(&fitted.ks_p_value));
        assert!((0.0..=1.0).contains(&fitted.ks_statistic));
        assert!((0.0..=1.0).contains(&fitted.cdf_at_mean));
    }

    #[test]
    fn fitting_is_deterministic() {
        let sample = DemandSample::new(SAMPLE.to_vec()).unwrap();
        let a = fit(&sample, &all_candidates()).unwrap();
        let b = fit(&sample, &all_candidates()).unwrap();
        assert_eq!(a.dist.family(), b.dist.family());
        assert_eq!(a, b);
    }

    #[test]
    fn reported_values_are_floor_truncated() {
        let sample = DemandSample::new(SAMPLE.to_vec()).unwrap();
        let fitted = fit(&sample, &all_candidates()).unwrap();
        for v in [fitted.ks_statistic, fitted.ks_p_value] {
            assert!(((v * 100.0) - (v * 100.0).round()).abs() < 1e-9);
        }
    }

    #[test]
    fn inactive_candidates_are_skipped() {
        let sample = DemandSample::new(SAMPLE.to_vec()).unwrap();
        let mut candidates = all_candidates();
        for c in &mut candidates {
            c.active = false;
        }
        assert_eq!(fit(&sample, &candidates), Err(FitError::NoDistributionFits));
    }

    #[test]
    fn zero_variance_sample_still_fits() {
        let sample = DemandSample::new(vec![500.0; 10]).unwrap();
        let fitted = fit(&sample, &all_candidates()).unwrap();
        assert!((0.0..=1.0).contains(&fitted.ks_p_value));
    }

    #[test]
    fn moment_normal_fallback_is_valid() {
        let sample = DemandSample::new(vec![500.0; 10]).unwrap();
        assert!(moment_normal(&sample).validate().is_ok());
    }

    proptest! {
        #[test]
        fn p_value_stays_in_unit_interval(d in 0.0f64..1.0, n in 1usize..200) {
            let p = ks_p_value(d, n);
            prop_assert!((0.0..=1.0).contains(&p));
        }

        #[test]
        fn p_value_decreases_with_statistic(d in 0.05f64..0.9, n in 1usize..100) {
            prop_assert!(ks_p_value(d, n) >= ks_p_value(d + 0.05, n));
        }
    }
}
