#![deny(warnings)]

//! Statistical layer for demand modeling.
//!
//! This crate provides the numeric building blocks the simulation engine
//! needs around historical demand: moment estimation, kernel density
//! smoothing, distribution fitting by Kolmogorov–Smirnov ranking, a linear
//! trend estimate, and seeded sampling from the fitted distribution. All
//! functions are pure with respect to their inputs; fitting is the only
//! CPU-relevant routine and is safe to run on a worker thread.

pub mod fit;
pub mod sample;

pub use fit::{cdf, fit, ks_p_value, ks_statistic, moment_normal, FitError};
pub use sample::draw;

/// Arithmetic mean. Zero for an empty slice.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation (direct moment estimation).
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    var.sqrt()
}

/// Mean and population standard deviation in one pass over the slice.
pub fn moments(xs: &[f64]) -> (f64, f64) {
    (mean(xs), std_dev(xs))
}

/// Ordinary-least-squares slope of the values against their index.
///
/// Used for the damped trend term in demand prediction; zero for samples
/// too short to carry a trend.
pub fn linear_trend_slope(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return 0.0;
    }
    let tx = (n - 1) as f64 / 2.0;
    let ty = mean(xs);
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in xs.iter().enumerate() {
        let dx = i as f64 - tx;
        num += dx * (y - ty);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
