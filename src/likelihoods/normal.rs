//! Normal likelihood with a CV error: `σ = cv * e`,
//! `score = ln σ + 0.5 ((o - e) / zero_fun(cv * e, delta))²`.
use crate::{
    likelihoods::{Comparison, Likelihood, LikelihoodResult, LikelihoodSettings, multiplier_addressable},
    model::objects::Addressable,
    rng::ModelRng,
    utils::{DEFAULT_DELTA, zero_fun},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Normal {
    settings: LikelihoodSettings,
}

impl Normal {
    pub fn new(settings: LikelihoodSettings) -> Self {
        Self { settings }
    }
}

impl Addressable for Normal {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        multiplier_addressable(&mut self.settings, parameter, index)
    }
}

impl Likelihood for Normal {
    fn label(&self) -> &str {
        &self.settings.label
    }

    fn kind(&self) -> &'static str {
        "normal"
    }

    fn multiplier(&self) -> f64 {
        self.settings.multiplier
    }

    fn adjust_error_value(&self, process_error: f64, error_value: f64) -> f64 {
        if process_error > 0.0 {
            zero_fun(error_value * error_value + process_error * process_error, DEFAULT_DELTA).sqrt()
        } else {
            error_value
        }
    }

    fn comparison_score(&self, c: &Comparison) -> f64 {
        let cv = self.adjust_error_value(c.process_error, c.error_value);
        let sigma = cv * c.expected;
        let z = (c.observed - c.expected) / zero_fun(sigma, c.delta);
        sigma.ln() + 0.5 * z * z
    }

    fn simulate_one(&self, c: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64> {
        let cv = self.adjust_error_value(c.process_error, c.error_value);
        if c.expected <= 0.0 || cv <= 0.0 {
            return Ok(0.0);
        }
        Ok(rng.normal(c.expected, c.expected * cv)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Score uses a standard deviation proportional to the expectation.
    //
    // Given
    // -----
    // - e = 10, o = 12, cv = 0.1 (σ = 1).
    //
    // Expect
    // ------
    // - 0 + 0.5 * 2² = 2.
    fn score_uses_cv_scaled_sigma() {
        // Arrange
        let likelihood = Normal::new(LikelihoodSettings::named("normal"));

        // Act
        let score = likelihood.comparison_score(&Comparison::new("male", 10.0, 12.0, 0.1, 0.0, 1e-11));

        // Assert
        assert!((score - 2.0).abs() < 1e-12);
    }
}
