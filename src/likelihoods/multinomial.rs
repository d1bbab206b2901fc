//! Multinomial likelihood for composition data.
//!
//! With `N` the adjusted sample size, each comparison scores
//! `ln((N o)!) - N o ln(zero_fun(e, delta))` and each category in a year
//! contributes the constant `-ln(N!)` once.
use crate::{
    likelihoods::{
        Comparison, Comparisons, Likelihood, LikelihoodResult, LikelihoodSettings, combine_sample_sizes,
        multiplier_addressable, simulate_composition,
    },
    model::objects::Addressable,
    rng::ModelRng,
    utils::{ln_factorial, zero_fun},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Multinomial {
    settings: LikelihoodSettings,
}

impl Multinomial {
    pub fn new(settings: LikelihoodSettings) -> Self {
        Self { settings }
    }
}

impl Addressable for Multinomial {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        multiplier_addressable(&mut self.settings, parameter, index)
    }
}

impl Likelihood for Multinomial {
    fn label(&self) -> &str {
        &self.settings.label
    }

    fn kind(&self) -> &'static str {
        "multinomial"
    }

    fn multiplier(&self) -> f64 {
        self.settings.multiplier
    }

    fn adjust_error_value(&self, process_error: f64, error_value: f64) -> f64 {
        combine_sample_sizes(process_error, error_value)
    }

    fn comparison_score(&self, c: &Comparison) -> f64 {
        let n = self.adjust_error_value(c.process_error, c.error_value);
        ln_factorial(n * c.observed) - n * c.observed * zero_fun(c.expected, c.delta).ln()
    }

    /// `-ln(N!)` for each run of comparisons sharing a category.
    fn initial_score(&self, comparisons: &Comparisons, year: u32) -> f64 {
        let Some(row) = comparisons.get(&year) else {
            return 0.0;
        };
        let mut score = 0.0;
        let mut last: Option<&str> = None;
        for c in row {
            if last == Some(c.category.as_str()) {
                continue;
            }
            last = Some(&c.category);
            score -= ln_factorial(self.adjust_error_value(c.process_error, c.error_value));
        }
        score
    }

    fn simulate_one(&self, c: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64> {
        let n = self.adjust_error_value(c.process_error, c.error_value);
        if c.expected <= 0.0 || n <= 0.0 {
            return Ok(0.0);
        }
        Ok(rng.binomial(c.expected, n)?)
    }

    /// A proper multinomial sample per category, so a simulated row can
    /// never come out empty.
    fn simulate_observed(&self, comparisons: &mut Comparisons, rng: &mut ModelRng) -> LikelihoodResult<()> {
        for row in comparisons.values_mut() {
            let weights: Vec<f64> = row.iter().map(|c| c.expected).collect();
            let sizes: Vec<f64> =
                row.iter().map(|c| self.adjust_error_value(c.process_error, c.error_value)).collect();
            simulate_composition(row, &weights, &sizes, rng)?;
        }
        Ok(())
    }
}
