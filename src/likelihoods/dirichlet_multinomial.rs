//! Dirichlet-multinomial likelihood for overdispersed compositions.
//!
//! With `N` the adjusted sample size and `α = e θ N`, each comparison
//! scores `ln Γ(N o + 1) - ln Γ(N o + α) + ln Γ(α)`; each year adds
//! `-(ln Γ(n + 1) + ln Γ(θ n) - ln Γ(n + θ n))` with `n = Σ N o`.
//! `θ` is addressable as `likelihood[label].theta`.
use serde::Deserialize;
use statrs::function::gamma::ln_gamma;

use crate::{
    likelihoods::{Comparison, Comparisons, Likelihood, LikelihoodError, LikelihoodResult, simulate_composition},
    model::objects::Addressable,
    rng::ModelRng,
};

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirichletMultinomialConfig {
    pub label: String,
    pub theta: f64,
    #[serde(default = "one")]
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirichletMultinomial {
    config: DirichletMultinomialConfig,
}

impl DirichletMultinomial {
    pub fn new(config: DirichletMultinomialConfig) -> LikelihoodResult<Self> {
        if config.theta <= 0.0 {
            return Err(LikelihoodError::InvalidParameter {
                likelihood: config.label.clone(),
                parameter: "theta",
                reason: format!("must be positive, got {}", config.theta),
            });
        }
        Ok(Self { config })
    }
}

impl Addressable for DirichletMultinomial {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match (parameter, index) {
            ("theta", None) => Some(&mut self.config.theta),
            ("multiplier", None) => Some(&mut self.config.multiplier),
            _ => None,
        }
    }
}

impl Likelihood for DirichletMultinomial {
    fn label(&self) -> &str {
        &self.config.label
    }

    fn kind(&self) -> &'static str {
        "dirichlet_multinomial"
    }

    fn multiplier(&self) -> f64 {
        self.config.multiplier
    }

    fn adjust_error_value(&self, process_error: f64, error_value: f64) -> f64 {
        if error_value > 0.0 && process_error > 0.0 { error_value * process_error } else { error_value }
    }

    fn comparison_score(&self, c: &Comparison) -> f64 {
        let n = self.adjust_error_value(c.process_error, c.error_value);
        let observed = c.observed * n;
        let alpha = c.expected * self.config.theta * n;
        -(-ln_gamma(observed + 1.0) + ln_gamma(observed + alpha) - ln_gamma(alpha))
    }

    fn initial_score(&self, comparisons: &Comparisons, year: u32) -> f64 {
        let Some(row) = comparisons.get(&year) else {
            return 0.0;
        };
        let theta = self.config.theta;
        let n: f64 = row.iter().map(|c| c.observed * self.adjust_error_value(c.process_error, c.error_value)).sum();
        -(ln_gamma(n + 1.0) + ln_gamma(theta * n) - ln_gamma(n + theta * n))
    }

    fn simulate_one(&self, c: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64> {
        let alpha = c.expected * self.config.theta * self.adjust_error_value(c.process_error, c.error_value);
        if alpha <= 0.0 {
            return Ok(0.0);
        }
        Ok(rng.gamma(alpha)?)
    }

    /// Dirichlet proportions from gamma draws, then a multinomial sample of
    /// size `N` per category.
    fn simulate_observed(&self, comparisons: &mut Comparisons, rng: &mut ModelRng) -> LikelihoodResult<()> {
        for row in comparisons.values_mut() {
            let weights = row.iter().map(|c| self.simulate_one(c, rng)).collect::<LikelihoodResult<Vec<f64>>>()?;
            let sizes: Vec<f64> =
                row.iter().map(|c| self.adjust_error_value(c.process_error, c.error_value)).collect();
            simulate_composition(row, &weights, &sizes, rng)?;
        }
        Ok(())
    }
}
