//! Binomial family: exact binomial, its normal approximation, and the
//! single-trial Bernoulli.
//!
//! For `binomial` and `binomial_approx` the error value is a sample size
//! `N` and observed values are proportions; simulated values are returned
//! on the proportion scale (`successes / N`). Bernoulli observations are
//! 0 or 1.
use crate::{
    likelihoods::{
        Comparison, Likelihood, LikelihoodResult, LikelihoodSettings, combine_sample_sizes,
        multiplier_addressable,
    },
    model::objects::Addressable,
    rng::ModelRng,
    utils::{ln_factorial, zero_fun},
};

fn simulate_proportion(n: f64, c: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64> {
    if c.expected <= 0.0 || n <= 0.0 {
        return Ok(0.0);
    }
    Ok(rng.binomial(c.expected, n)? / n.round().max(1.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binomial {
    settings: LikelihoodSettings,
}

impl Binomial {
    pub fn new(settings: LikelihoodSettings) -> Self {
        Self { settings }
    }
}

impl Addressable for Binomial {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        multiplier_addressable(&mut self.settings, parameter, index)
    }
}

impl Likelihood for Binomial {
    fn label(&self) -> &str {
        &self.settings.label
    }

    fn kind(&self) -> &'static str {
        "binomial"
    }

    fn multiplier(&self) -> f64 {
        self.settings.multiplier
    }

    fn adjust_error_value(&self, process_error: f64, error_value: f64) -> f64 {
        combine_sample_sizes(process_error, error_value)
    }

    fn comparison_score(&self, c: &Comparison) -> f64 {
        let n = self.adjust_error_value(c.process_error, c.error_value);
        let hits = n * c.observed;
        let misses = n * (1.0 - c.observed);
        -(ln_factorial(n) - ln_factorial(hits) - ln_factorial(misses)
            + hits * zero_fun(c.expected, c.delta).ln()
            + misses * zero_fun(1.0 - c.expected, c.delta).ln())
    }

    fn simulate_one(&self, c: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64> {
        simulate_proportion(self.adjust_error_value(c.process_error, c.error_value), c, rng)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinomialApprox {
    settings: LikelihoodSettings,
}

impl BinomialApprox {
    pub fn new(settings: LikelihoodSettings) -> Self {
        Self { settings }
    }
}

impl Addressable for BinomialApprox {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        multiplier_addressable(&mut self.settings, parameter, index)
    }
}

impl Likelihood for BinomialApprox {
    fn label(&self) -> &str {
        &self.settings.label
    }

    fn kind(&self) -> &'static str {
        "binomial_approx"
    }

    fn multiplier(&self) -> f64 {
        self.settings.multiplier
    }

    fn adjust_error_value(&self, process_error: f64, error_value: f64) -> f64 {
        combine_sample_sizes(process_error, error_value)
    }

    fn comparison_score(&self, c: &Comparison) -> f64 {
        let n = self.adjust_error_value(c.process_error, c.error_value);
        let std_error = (zero_fun(c.expected, c.delta) * zero_fun(1.0 - c.expected, c.delta) / n).sqrt();
        std_error.ln() + 0.5 * ((c.observed - c.expected) / std_error).powi(2)
    }

    fn simulate_one(&self, c: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64> {
        simulate_proportion(self.adjust_error_value(c.process_error, c.error_value), c, rng)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bernoulli {
    settings: LikelihoodSettings,
}

impl Bernoulli {
    pub fn new(settings: LikelihoodSettings) -> Self {
        Self { settings }
    }
}

impl Addressable for Bernoulli {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        multiplier_addressable(&mut self.settings, parameter, index)
    }
}

impl Likelihood for Bernoulli {
    fn label(&self) -> &str {
        &self.settings.label
    }

    fn kind(&self) -> &'static str {
        "bernoulli"
    }

    fn multiplier(&self) -> f64 {
        self.settings.multiplier
    }

    fn adjust_error_value(&self, _process_error: f64, error_value: f64) -> f64 {
        error_value
    }

    fn comparison_score(&self, c: &Comparison) -> f64 {
        -(c.observed * zero_fun(c.expected, c.delta).ln()
            + (1.0 - c.observed) * zero_fun(1.0 - c.expected, c.delta).ln())
    }

    fn simulate_one(&self, c: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64> {
        Ok(rng.bernoulli(c.expected))
    }
}
