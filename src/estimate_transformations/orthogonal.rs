//! Product/ratio reparameterisation of two positive estimates.
//!
//! `φ1 = θ1 θ2`, `φ2 = θ1 / θ2`, restored by `θ1 = sqrt(φ1 φ2)`,
//! `θ2 = sqrt(φ1 / φ2)`. The score is `-ln(θ2 / (2 θ1))`, the negative
//! log determinant of the restoring map.
use crate::{
    estimate_transformations::{Transform, set_transformed_bounds},
    estimates::Estimates,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Orthogonal {
    targets: [usize; 2],
}

impl Orthogonal {
    pub fn new(theta_one: usize, theta_two: usize) -> Self {
        Self { targets: [theta_one, theta_two] }
    }
}

impl Transform for Orthogonal {
    fn kind(&self) -> &'static str {
        "orthogonal"
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
        let (t1, t2) = (estimates.get(a).value, estimates.get(b).value);
        let (lo1, hi1) = (estimates.get(a).original_lower_bound, estimates.get(a).original_upper_bound);
        let (lo2, hi2) = (estimates.get(b).original_lower_bound, estimates.get(b).original_upper_bound);

        let first = estimates.get_mut(a);
        first.value = t1 * t2;
        set_transformed_bounds(first, lo1 * lo2, hi1 * hi2);
        let second = estimates.get_mut(b);
        second.value = t1 / t2;
        set_transformed_bounds(second, lo1 / hi2, hi1 / lo2);
    }

    fn restore(&mut self, estimates: &mut Estimates) {
        let [a, b] = self.targets;
        let (p1, p2) = (estimates.get(a).value, estimates.get(b).value);
        let first = estimates.get_mut(a);
        first.value = (p1 * p2).sqrt();
        first.restore_bounds();
        let second = estimates.get_mut(b);
        second.value = (p1 / p2).sqrt();
        second.restore_bounds();
    }

    fn jacobian(&self, estimates: &Estimates) -> f64 {
        let [a, b] = self.targets;
        -(estimates.get(b).value / (2.0 * estimates.get(a).value)).ln()
    }
}
