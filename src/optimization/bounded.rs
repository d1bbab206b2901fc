//! optimization::bounded — box constraints for an unconstrained minimiser.
//!
//! Purpose
//! -------
//! Map each bounded estimate `v ∈ [lo, hi]` to a scaled coordinate
//! `s ∈ [-1, 1]` so L-BFGS can search freely, with a quadratic penalty
//! pulling it back when it wanders past the edges.
//!
//! Key behaviors
//! -------------
//! - [`scale`]: `asin(2(v - lo)/(hi - lo) - 1) / (π/2)`, pinned to ±1 at
//!   the bounds.
//! - [`unscale`]: `lo + (hi - lo)(sin(s π/2) + 1)/2`.
//! - [`boundary_penalty`]: `(s ∓ 0.9999)²` beyond ±0.9999 plus
//!   `1e5 (s ∓ 1)²` beyond ±1; the two terms accumulate.
//! - [`BoundedObjective`] wraps a callback on unscaled values as an
//!   [`Objective`] on scaled values.
//!
//! Invariants & assumptions
//! ------------------------
//! - `lo < hi` for every bound; [`BoundedObjective::new`] checks this.
use std::f64::consts::FRAC_PI_2;

use crate::optimization::{
    errors::{OptError, OptResult},
    minimiser::{Cost, Objective, Theta},
};

const SOFT_EDGE: f64 = 0.9999;
const HARD_PENALTY: f64 = 1e5;

pub fn scale(value: f64, lower: f64, upper: f64) -> f64 {
    if value <= lower {
        return -1.0;
    }
    if value >= upper {
        return 1.0;
    }
    (2.0 * (value - lower) / (upper - lower) - 1.0).asin() / FRAC_PI_2
}

pub fn unscale(scaled: f64, lower: f64, upper: f64) -> f64 {
    lower + (upper - lower) * ((scaled * FRAC_PI_2).sin() + 1.0) / 2.0
}

pub fn boundary_penalty(scaled: f64) -> f64 {
    let mut penalty = 0.0;
    if scaled < -SOFT_EDGE {
        penalty += (scaled + SOFT_EDGE).powi(2);
    }
    if scaled > SOFT_EDGE {
        penalty += (scaled - SOFT_EDGE).powi(2);
    }
    if scaled < -1.0 {
        penalty += HARD_PENALTY * (scaled + 1.0).powi(2);
    }
    if scaled > 1.0 {
        penalty += HARD_PENALTY * (scaled - 1.0).powi(2);
    }
    penalty
}

/// Objective on scaled coordinates around a callback on unscaled values.
pub struct BoundedObjective<F> {
    bounds: Vec<(f64, f64)>,
    callback: F,
}

impl<F> BoundedObjective<F>
where
    F: Fn(&[f64]) -> OptResult<f64>,
{
    /// Errors
    /// ------
    /// - `InvalidBounds` for any `lower >= upper` or non-finite bound.
    pub fn new(bounds: Vec<(f64, f64)>, callback: F) -> OptResult<Self> {
        if let Some((index, &(lower, upper))) =
            bounds.iter().enumerate().find(|(_, (lo, hi))| !(lo.is_finite() && hi.is_finite() && lo < hi))
        {
            return Err(OptError::InvalidBounds { index, lower, upper });
        }
        Ok(Self { bounds, callback })
    }

    pub fn scale_all(&self, values: &[f64]) -> Theta {
        values.iter().zip(&self.bounds).map(|(&v, &(lo, hi))| scale(v, lo, hi)).collect()
    }

    pub fn unscale_all(&self, theta: &Theta) -> Vec<f64> {
        theta.iter().zip(&self.bounds).map(|(&s, &(lo, hi))| unscale(s, lo, hi)).collect()
    }
}

impl<F> Objective for BoundedObjective<F>
where
    F: Fn(&[f64]) -> OptResult<f64>,
{
    fn value(&self, theta: &Theta) -> OptResult<Cost> {
        let penalty: f64 = theta.iter().map(|&s| boundary_penalty(s)).sum();
        Ok((self.callback)(&self.unscale_all(theta))? + penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::minimiser::{LineSearcher, MinimiserOptions, Tolerances, minimise};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - scale/unscale as inverses inside the bounds, and pinning at them.
    // - The accumulated boundary penalty.
    // - Minimising a bounded objective whose optimum lies inside the box.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Scaling is inverted by unscaling and maps the midpoint to zero.
    //
    // Given
    // -----
    // - Bounds [2, 10] and values 2, 3.7, 6, 9.99, 10.
    //
    // Expect
    // ------
    // - unscale(scale(v)) == v within 1e-9; scale(6) == 0; ±1 at bounds.
    fn scale_unscale_inside_bounds() {
        for v in [2.0, 3.7, 6.0, 9.99, 10.0] {
            let back = unscale(scale(v, 2.0, 10.0), 2.0, 10.0);
            assert!((back - v).abs() < 1e-9, "{v} -> {back}");
        }
        assert!(scale(6.0, 2.0, 10.0).abs() < 1e-15);
        assert_eq!(scale(2.0, 2.0, 10.0), -1.0);
        assert_eq!(scale(10.0, 2.0, 10.0), 1.0);
    }

    #[test]
    // Purpose
    // -------
    // The penalty is zero inside ±0.9999 and adds both terms past ±1.
    //
    // Given
    // -----
    // - s = 0.5, s = 0.99995, s = -1.1.
    //
    // Expect
    // ------
    // - 0, (0.00005)^2, (0.1001)^2 + 1e5 * 0.01.
    fn boundary_penalty_accumulates() {
        assert_eq!(boundary_penalty(0.5), 0.0);
        assert!((boundary_penalty(0.99995) - 0.00005f64.powi(2)).abs() < 1e-15);
        let expected = 0.1001f64.powi(2) + 1e5 * 0.1f64.powi(2);
        assert!((boundary_penalty(-1.1) - expected).abs() < 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Minimising through the scaling recovers an interior optimum and
    // rejects inverted bounds.
    //
    // Given
    // -----
    // - c(v) = (v - 3)^2 on [0, 10], starting at 8; bounds (5, 1).
    //
    // Expect
    // ------
    // - v_hat ≈ 3; `InvalidBounds` for (5, 1).
    fn bounded_minimisation_finds_interior_optimum() {
        // Arrange
        let objective =
            BoundedObjective::new(vec![(0.0, 10.0)], |v: &[f64]| -> OptResult<f64> { Ok((v[0] - 3.0).powi(2)) })
                .unwrap();
        let tols = Tolerances::new(Some(1e-10), None, Some(200)).unwrap();
        let opts = MinimiserOptions::new(tols, LineSearcher::MoreThuente, false, None).unwrap();

        // Act
        let out = minimise(&objective, objective.scale_all(&[8.0]), &opts).unwrap();
        let v_hat = objective.unscale_all(&out.theta_hat);

        // Assert
        assert!((v_hat[0] - 3.0).abs() < 1e-4, "{v_hat:?}");
        let inverted = BoundedObjective::new(vec![(5.0, 1.0)], |_: &[f64]| -> OptResult<f64> { Ok(0.0) });
        assert!(matches!(inverted, Err(OptError::InvalidBounds { index: 0, .. })));
    }
}
