//! Lognormal likelihoods.
//!
//! Both families score
//! `ln σ + 0.5 (ln(o / zero_fun(e, delta)) / σ + σ/2)²` with
//! `σ = sqrt(ln(1 + cv²))` and `cv` the error value combined in
//! quadrature with the process error. `lognormal` is used for
//! compositions and renormalises simulated rows; `lognormal_with_q` is used
//! for relative indices and leaves them on the index scale.
use crate::{
    likelihoods::{
        Comparison, Likelihood, LikelihoodResult, LikelihoodSettings, add_in_quadrature, multiplier_addressable,
    },
    model::objects::Addressable,
    rng::ModelRng,
    utils::zero_fun,
};

fn lognormal_score(cv: f64, observed: f64, expected: f64, delta: f64) -> f64 {
    let sigma = (1.0 + cv * cv).ln().sqrt();
    let z = (observed / zero_fun(expected, delta)).ln() / sigma + 0.5 * sigma;
    sigma.ln() + 0.5 * z * z
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogNormal {
    settings: LikelihoodSettings,
}

impl LogNormal {
    pub fn new(settings: LikelihoodSettings) -> Self {
        Self { settings }
    }
}

impl Addressable for LogNormal {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        multiplier_addressable(&mut self.settings, parameter, index)
    }
}

impl Likelihood for LogNormal {
    fn label(&self) -> &str {
        &self.settings.label
    }

    fn kind(&self) -> &'static str {
        "lognormal"
    }

    fn multiplier(&self) -> f64 {
        self.settings.multiplier
    }

    fn adjust_error_value(&self, process_error: f64, error_value: f64) -> f64 {
        add_in_quadrature(process_error, error_value)
    }

    fn comparison_score(&self, c: &Comparison) -> f64 {
        let cv = self.adjust_error_value(c.process_error, c.error_value);
        lognormal_score(cv, c.observed, c.expected, c.delta)
    }

    fn simulate_one(&self, c: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64> {
        let cv = self.adjust_error_value(c.process_error, c.error_value);
        if c.expected <= 0.0 || cv <= 0.0 {
            return Ok(c.delta);
        }
        Ok(rng.lognormal(c.expected, cv)?)
    }

    fn normalises_simulations(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogNormalWithQ {
    settings: LikelihoodSettings,
}

impl LogNormalWithQ {
    pub fn new(settings: LikelihoodSettings) -> Self {
        Self { settings }
    }
}

impl Addressable for LogNormalWithQ {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        multiplier_addressable(&mut self.settings, parameter, index)
    }
}

impl Likelihood for LogNormalWithQ {
    fn label(&self) -> &str {
        &self.settings.label
    }

    fn kind(&self) -> &'static str {
        "lognormal_with_q"
    }

    fn multiplier(&self) -> f64 {
        self.settings.multiplier
    }

    fn adjust_error_value(&self, process_error: f64, error_value: f64) -> f64 {
        add_in_quadrature(process_error, error_value)
    }

    fn comparison_score(&self, c: &Comparison) -> f64 {
        let cv = self.adjust_error_value(c.process_error, c.error_value);
        lognormal_score(cv, c.observed, c.expected, c.delta)
    }

    fn simulate_one(&self, c: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64> {
        let cv = self.adjust_error_value(c.process_error, c.error_value);
        if c.expected <= 0.0 || cv <= 0.0 {
            return Ok(0.0);
        }
        Ok(rng.lognormal(c.expected, cv)?)
    }
}
