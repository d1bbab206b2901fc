//! Stick-breaking transformation of `K` estimates constrained to a simplex.
//!
//! Purpose
//! -------
//! Let the minimiser move `K - 1` unconstrained values while the model sees
//! `K` positive values summing to one (`sum_to_one`) or to `K` (mean one).
//!
//! Key behaviors
//! -------------
//! - Transform: `u = x / Σx`; for `k < K - 1`,
//!   `z_k = u_k / (1 - Σ_{j<k} u_j)` and `y_k = logit(z_k) + ln(K - 1 - k)`.
//!   The last estimate is held while transformed.
//! - Restore: `z_k = inv_logit(y_k - ln(K - 1 - k))`, `u_k = z_k (1 - Σ_{j<k} u_j)`,
//!   `u_{K-1} = 1 - Σ u`, `x = u * total`.
//! - Score: `-Σ ln(z_k (1 - z_k) (1 - Σ_{j<k} u_j)) - (K - 1) ln total`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Transformed values are clamped to `[lower_bound, upper_bound]` on
//!   restore, so values at the clamps do not round trip exactly.
//! - `K >= 2` and every value is strictly positive.
use tracing::warn;

use crate::{
    estimate_transformations::{
        Transform,
        errors::{TransformationError, TransformationResult},
        set_transformed_bounds,
    },
    estimates::Estimates,
};

/// Values may miss their target total by this much.
const TOTAL_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq)]
pub struct Simplex {
    targets: Vec<usize>,
    sum_to_one: bool,
    lower_bound: f64,
    upper_bound: f64,
    total: f64,
}

impl Simplex {
    pub fn new(targets: Vec<usize>, sum_to_one: bool, lower_bound: f64, upper_bound: f64) -> Self {
        let total = if sum_to_one { 1.0 } else { targets.len() as f64 };
        Self { targets, sum_to_one, lower_bound, upper_bound, total }
    }

    fn offsets(&self) -> impl Iterator<Item = f64> {
        let k = self.targets.len();
        (0..k - 1).map(move |i| ((k - 1 - i) as f64).ln())
    }
}

impl Transform for Simplex {
    fn kind(&self) -> &'static str {
        "simplex"
    }

    fn targets(&self) -> &[usize] {
        &self.targets
    }

    fn prepare(&mut self, label: &str, estimates: &Estimates) -> TransformationResult<()> {
        let invalid = |reason: String| TransformationError::InvalidValues { transformation: label.to_string(), reason };
        if self.lower_bound >= self.upper_bound {
            return Err(TransformationError::InvalidBounds {
                transformation: label.to_string(),
                reason: format!("lower_bound ({}) must be less than upper_bound ({})", self.lower_bound, self.upper_bound),
            });
        }
        let values: Vec<f64> = self.targets.iter().map(|i| estimates.get(*i).value).collect();
        if values.iter().any(|v| *v <= 0.0) {
            return Err(invalid("every value must be greater than 0.0".to_string()));
        }
        let sum: f64 = values.iter().sum();
        if self.sum_to_one {
            if (sum - 1.0).abs() > TOTAL_TOLERANCE {
                return Err(invalid(format!("values must sum to 1.0 but sum to {sum}")));
            }
        } else if (sum - self.total).abs() > TOTAL_TOLERANCE {
            warn!(
                transformation = %label,
                "values should sum to {} but sum to {sum}; they will be rescaled",
                self.total
            );
        }
        Ok(())
    }

    fn transform(&mut self, estimates: &mut Estimates) {
        let k = self.targets.len();
        let values: Vec<f64> = self.targets.iter().map(|i| estimates.get(*i).value).collect();
        let sum: f64 = values.iter().sum();
        let mut consumed = 0.0;
        let offsets: Vec<f64> = self.offsets().collect();
        for (pos, (i, x)) in self.targets.iter().zip(&values).enumerate() {
            let e = estimates.get_mut(*i);
            if pos == k - 1 {
                e.held = true;
                continue;
            }
            let unit = x / sum;
            let z = unit / (1.0 - consumed);
            consumed += unit;
            e.value = (z / (1.0 - z)).ln() + offsets[pos];
            set_transformed_bounds(e, self.lower_bound, self.upper_bound);
        }
    }

    fn restore(&mut self, estimates: &mut Estimates) {
        let k = self.targets.len();
        let offsets: Vec<f64> = self.offsets().collect();
        let mut consumed = 0.0;
        for (pos, i) in self.targets.iter().enumerate() {
            let e = estimates.get_mut(*i);
            let unit = if pos == k - 1 {
                e.held = false;
                1.0 - consumed
            } else {
                let y = e.value.clamp(self.lower_bound, self.upper_bound);
                let z = 1.0 / (1.0 + (-(y - offsets[pos])).exp());
                z * (1.0 - consumed)
            };
            consumed += unit;
            e.value = unit * self.total;
            e.restore_bounds();
        }
    }

    fn jacobian(&self, estimates: &Estimates) -> f64 {
        let k = self.targets.len();
        let sum: f64 = self.targets.iter().map(|i| estimates.get(*i).value).sum();
        let mut consumed = 0.0;
        let mut log_det = 0.0;
        for i in &self.targets[..k - 1] {
            let unit = estimates.get(*i).value / sum;
            let stick = 1.0 - consumed;
            let z = unit / stick;
            log_det += (z * (1.0 - z) * stick).ln();
            consumed += unit;
        }
        -log_det - (k as f64 - 1.0) * self.total.ln()
    }
}
