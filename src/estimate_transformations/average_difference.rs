//! Mean and difference of two estimates.
//!
//! `m = (x1 + x2) / 2`, `d = x1 - x2`; restored by `x1 = m + d / 2`,
//! `x2 = m - d / 2`. There is no Jacobian for this transformation.
use crate::{
    estimate_transformations::{Transform, set_transformed_bounds},
    estimates::Estimates,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AverageDifference {
    targets: [usize; 2],
}

impl AverageDifference {
    pub fn new(first: usize, second: usize) -> Self {
        Self { targets: [first, second] }
    }
}

impl Transform for AverageDifference {
    fn kind(&self) -> &'static str {
        "average_difference"
    }

    fn targets(&self) -> &[usize] {
        &self.targets
    }

    fn supports_jacobian(&self) -> bool {
        false
    }

    fn transform(&mut self, estimates: &mut Estimates) {
        let [a, b] = self.targets;
        let (x1, x2) = (estimates.get(a).value, estimates.get(b).value);
        let (lo1, hi1) = (estimates.get(a).original_lower_bound, estimates.get(a).original_upper_bound);
        let (lo2, hi2) = (estimates.get(b).original_lower_bound, estimates.get(b).original_upper_bound);
        let mean = (x1 + x2) / 2.0;

        let first = estimates.get_mut(a);
        first.value = mean;
        set_transformed_bounds(first, (lo1 + lo2) / 2.0, (hi1 + hi2) / 2.0);
        let second = estimates.get_mut(b);
        second.value = (mean - x2) * 2.0;
        set_transformed_bounds(second, lo1 - hi2, hi1 - lo2);
    }

    fn restore(&mut self, estimates: &mut Estimates) {
        let [a, b] = self.targets;
        let (mean, diff) = (estimates.get(a).value, estimates.get(b).value);
        let first = estimates.get_mut(a);
        first.value = mean + diff / 2.0;
        first.restore_bounds();
        let second = estimates.get_mut(b);
        second.value = mean - diff / 2.0;
        second.restore_bounds();
    }

    fn jacobian(&self, _estimates: &Estimates) -> f64 {
        0.0
    }
}
