//! Log-total and share reparameterisation of two positive estimates.
//!
//! With `s = x1 + x2`: `y1 = ln s`, `y2 = x1 / s`; restored by
//! `x1 = e^y1 y2`, `x2 = e^y1 (1 - y2)`. The score is `-2 ln s`.
use crate::{
    estimate_transformations::{Transform, set_transformed_bounds},
    estimates::Estimates,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LogSum {
    targets: [usize; 2],
}

impl LogSum {
    pub fn new(first: usize, second: usize) -> Self {
        Self { targets: [first, second] }
    }
}

impl Transform for LogSum {
    fn kind(&self) -> &'static str {
        "log_sum"
    }

    fn targets(&self) -> &[usize] {
        &self.targets
    }

    fn domain_error(&self, estimates: &Estimates) -> Option<String> {
        self.targets
            .iter()
            .map(|i| estimates.get(*i))
            .find(|e| e.original_lower_bound <= 0.0)
            .map(|e| format!("lower_bound of '{}' must be greater than 0.0", e.parameter))
    }

    fn transform(&mut self, estimates: &mut Estimates) {
        let [a, b] = self.targets;
        let (x1, x2) = (estimates.get(a).value, estimates.get(b).value);
        let (lo1, hi1) = (estimates.get(a).original_lower_bound, estimates.get(a).original_upper_bound);
        let (lo2, hi2) = (estimates.get(b).original_lower_bound, estimates.get(b).original_upper_bound);
        let total = x1 + x2;

        let first = estimates.get_mut(a);
        first.value = total.ln();
        set_transformed_bounds(first, (lo1 + lo2).ln(), (hi1 + hi2).ln());
        let second = estimates.get_mut(b);
        second.value = x1 / total;
        set_transformed_bounds(second, lo1 / (lo1 + hi2), hi1 / (hi1 + lo2));
    }

    fn restore(&mut self, estimates: &mut Estimates) {
        let [a, b] = self.targets;
        let total = estimates.get(a).value.exp();
        let share = estimates.get(b).value;
        let first = estimates.get_mut(a);
        first.value = total * share;
        first.restore_bounds();
        let second = estimates.get_mut(b);
        second.value = total * (1.0 - share);
        second.restore_bounds();
    }

    fn jacobian(&self, estimates: &Estimates) -> f64 {
        let [a, b] = self.targets;
        -2.0 * (estimates.get(a).value + estimates.get(b).value).ln()
    }
}
