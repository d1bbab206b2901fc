//! One-to-one transformations applied to each target independently.
//!
//! | kind       | y          | bounds                  | score             |
//! |------------|------------|-------------------------|-------------------|
//! | `log`      | `ln v`     | `[ln lo, ln hi]`        | `1 / v`           |
//! | `sqrt`     | `sqrt v`   | `[sqrt lo, sqrt hi]`    | `-0.5 v^-1.5`     |
//! | `inverse`  | `1 / v`    | `[1 / hi, 1 / lo]`      | `-v^-2`           |
//! | `log_odds` | `logit v`  | `[logit lo, logit hi]`  | `1 / (v (1 - v))` |
use serde::Deserialize;

use crate::{
    estimate_transformations::{Transform, set_transformed_bounds},
    estimates::Estimates,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleKind {
    Log,
    Sqrt,
    Inverse,
    LogOdds,
}

impl SimpleKind {
    pub fn name(self) -> &'static str {
        match self {
            SimpleKind::Log => "log",
            SimpleKind::Sqrt => "sqrt",
            SimpleKind::Inverse => "inverse",
            SimpleKind::LogOdds => "log_odds",
        }
    }

    pub fn forward(self, v: f64) -> f64 {
        match self {
            SimpleKind::Log => v.ln(),
            SimpleKind::Sqrt => v.sqrt(),
            SimpleKind::Inverse => 1.0 / v,
            SimpleKind::LogOdds => (v / (1.0 - v)).ln(),
        }
    }

    pub fn inverse(self, y: f64) -> f64 {
        match self {
            SimpleKind::Log => y.exp(),
            SimpleKind::Sqrt => y * y,
            SimpleKind::Inverse => 1.0 / y,
            SimpleKind::LogOdds => 1.0 / (1.0 + (-y).exp()),
        }
    }

    /// Transformed-space bounds; `inverse` swaps the ends.
    pub fn bounds(self, lower: f64, upper: f64) -> (f64, f64) {
        match self {
            SimpleKind::Inverse => (1.0 / upper, 1.0 / lower),
            _ => (self.forward(lower), self.forward(upper)),
        }
    }

    /// Jacobian term at the untransformed value `v`.
    pub fn jacobian(self, v: f64) -> f64 {
        match self {
            SimpleKind::Log => 1.0 / v,
            SimpleKind::Sqrt => -0.5 * v.powf(-1.5),
            SimpleKind::Inverse => -v.powi(-2),
            SimpleKind::LogOdds => 1.0 / (v * (1.0 - v)),
        }
    }

    /// `None` if `[lower, upper]` lies in the domain, else the reason.
    pub fn domain_error(self, lower: f64, upper: f64) -> Option<String> {
        match self {
            SimpleKind::Log | SimpleKind::Inverse if lower <= 0.0 => {
                Some(format!("lower_bound ({lower}) must be greater than 0.0"))
            }
            SimpleKind::Sqrt if lower < 0.0 => Some(format!("lower_bound ({lower}) must not be negative")),
            SimpleKind::LogOdds if lower <= 0.0 || upper >= 1.0 => {
                Some(format!("bounds [{lower}, {upper}] must lie strictly inside (0, 1)"))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTransform {
    kind: SimpleKind,
    targets: Vec<usize>,
}

impl SimpleTransform {
    pub fn new(kind: SimpleKind, targets: Vec<usize>) -> Self {
        Self { kind, targets }
    }
}

impl Transform for SimpleTransform {
    fn kind(&self) -> &'static str {
        self.kind.name()
    }

    fn targets(&self) -> &[usize] {
        &self.targets
    }

    fn domain_error(&self, estimates: &Estimates) -> Option<String> {
        self.targets
            .iter()
            .map(|i| estimates.get(*i))
            .filter(|e| !e.prior_applies_to_transform)
            .find_map(|e| self.kind.domain_error(e.original_lower_bound, e.original_upper_bound))
    }

    fn transform(&mut self, estimates: &mut Estimates) {
        for i in &self.targets {
            let e = estimates.get_mut(*i);
            e.value = self.kind.forward(e.value);
            let (lower, upper) = self.kind.bounds(e.original_lower_bound, e.original_upper_bound);
            set_transformed_bounds(e, lower, upper);
        }
    }

    fn restore(&mut self, estimates: &mut Estimates) {
        for i in &self.targets {
            let e = estimates.get_mut(*i);
            e.value = self.kind.inverse(e.value);
            e.restore_bounds();
        }
    }

    fn jacobian(&self, estimates: &Estimates) -> f64 {
        self.targets.iter().map(|i| self.kind.jacobian(estimates.get(*i).value)).sum()
    }
}
