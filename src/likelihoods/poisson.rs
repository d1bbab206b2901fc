//! Poisson likelihood for count data:
//! `score = zero_fun(e, delta) - o ln(zero_fun(e, delta)) + ln(o!)`.
use crate::{
    likelihoods::{Comparison, Likelihood, LikelihoodResult, LikelihoodSettings, multiplier_addressable},
    model::objects::Addressable,
    rng::ModelRng,
    utils::{ln_factorial, zero_fun},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Poisson {
    settings: LikelihoodSettings,
}

impl Poisson {
    pub fn new(settings: LikelihoodSettings) -> Self {
        Self { settings }
    }
}

impl Addressable for Poisson {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        multiplier_addressable(&mut self.settings, parameter, index)
    }
}

impl Likelihood for Poisson {
    fn label(&self) -> &str {
        &self.settings.label
    }

    fn kind(&self) -> &'static str {
        "poisson"
    }

    fn multiplier(&self) -> f64 {
        self.settings.multiplier
    }

    fn adjust_error_value(&self, _process_error: f64, error_value: f64) -> f64 {
        error_value
    }

    fn comparison_score(&self, c: &Comparison) -> f64 {
        let lambda = zero_fun(c.expected, c.delta);
        lambda - c.observed * lambda.ln() + ln_factorial(c.observed)
    }

    fn simulate_one(&self, c: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64> {
        if c.expected <= 0.0 {
            return Ok(0.0);
        }
        Ok(rng.poisson(c.expected)?)
    }
}
