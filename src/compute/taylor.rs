//! Taylor-series trigonometry and parallel circle sampling.
//!
//! Points on a circle are computed independently, one per index, so the
//! loop is split across rayon workers and collected in index order. The
//! running sin/cos totals are summed afterwards, in the same order, so the
//! result does not depend on how work was scheduled.

use rayon::prelude::*;

use crate::schema::CircleConfig;

/// Approximate `sin(t)` with the first `terms` terms of its Maclaurin series.
///
/// Uses the recurrence `term_n = -term_{n-1} * t² / ((2n)(2n + 1))`.
/// No range reduction is performed, so accuracy degrades as |t| grows.
pub fn sin_taylor(t: f64, terms: usize) -> f64 {
    if terms == 0 {
        return 0.0;
    }
    let mut term = t;
    let mut sum = term;
    for n in 1..terms {
        let n = n as f64;
        term *= -t * t / ((2.0 * n) * (2.0 * n + 1.0));
        sum += term;
    }
    sum
}

/// Approximate `cos(t)` with the first `terms` terms of its Maclaurin series.
///
/// Uses the recurrence `term_n = -term_{n-1} * t² / ((2n - 1)(2n))`.
pub fn cos_taylor(t: f64, terms: usize) -> f64 {
    if terms == 0 {
        return 0.0;
    }
    let mut term = 1.0;
    let mut sum = term;
    for n in 1..terms {
        let n = n as f64;
        term *= -t * t / ((2.0 * n - 1.0) * (2.0 * n));
        sum += term;
    }
    sum
}

/// One sampled point on the circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CirclePoint {
    /// Angle in radians.
    pub t: f64,
    pub sin: f64,
    pub cos: f64,
    pub x: f64,
    pub y: f64,
}

/// All sampled points plus the totals of the sin/cos approximations.
#[derive(Debug, Clone)]
pub struct CircleSample {
    pub points: Vec<CirclePoint>,
    pub sin_sum: f64,
    pub cos_sum: f64,
}

/// Sample `config.points` evenly spaced angles in [0, 2π).
pub fn circle_points(config: &CircleConfig) -> CircleSample {
    let n = config.points;
    let (cx, cy) = config.center;

    let points: Vec<CirclePoint> = (0..n)
        .into_par_iter()
        .map(|i| {
            let t = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            let sin = sin_taylor(t, config.terms);
            let cos = cos_taylor(t, config.terms);
            CirclePoint {
                t,
                sin,
                cos,
                x: config.radius * cos + cx,
                y: config.radius * sin + cy,
            }
        })
        .collect();

    let (sin_sum, cos_sum) = points
        .iter()
        .fold((0.0, 0.0), |(s, c), p| (s + p.sin, c + p.cos));

    CircleSample {
        points,
        sin_sum,
        cos_sum,
    }
}
