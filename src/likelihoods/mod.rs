//! likelihoods — scoring comparisons and simulating observations.
//!
//! Purpose
//! -------
//! Turn the [`Comparison`]s an observation produces each iteration into
//! negative log-likelihood contributions, and regenerate observed values
//! from the fitted model for simulation runs.
//!
//! Key behaviors
//! -------------
//! - Each family adjusts the error value for process error, scores every
//!   comparison in place (times the configured `multiplier`), contributes
//!   a per-year constant through [`Likelihood::initial_score`], and can
//!   replace observed values with draws from an explicit [`ModelRng`].
//! - Families without parameters are always available under their type
//!   name (`"multinomial"`, `"lognormal"`, ...). Families with parameters
//!   (`dirichlet_multinomial`) or a non-unit multiplier are configured as
//!   labelled blocks and referenced by label.
//!
//! Invariants & assumptions
//! ------------------------
//! - Expected values are floored with `zero_fun(expected, delta)` wherever
//!   a log or a division would otherwise see zero.
//! - `initial_score` depends only on error values and sample sizes, so it
//!   is unchanged by simulating new observed values.
//!
//! Downstream usage
//! ----------------
//! - Observations hold a [`LikelihoodId`] resolved at build and call
//!   `get_scores` and `initial_score` on the [`Likelihoods`] store.
use std::{collections::HashMap, fmt::Debug};

use serde::Deserialize;

use crate::{model::objects::Addressable, rng::ModelRng};

pub mod binomial;
pub mod comparison;
pub mod dirichlet_multinomial;
pub mod errors;
pub mod lognormal;
pub mod multinomial;
pub mod normal;
pub mod poisson;

// ---- Re-exports (primary public surface) ----
pub use self::comparison::{Comparison, Comparisons, total_score};
pub use self::errors::{LikelihoodError, LikelihoodResult};

use self::{
    binomial::{Bernoulli, Binomial, BinomialApprox},
    dirichlet_multinomial::{DirichletMultinomial, DirichletMultinomialConfig},
    lognormal::{LogNormal, LogNormalWithQ},
    multinomial::Multinomial,
    normal::Normal,
    poisson::Poisson,
};

fn one() -> f64 {
    1.0
}

/// Label and score multiplier shared by every family.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LikelihoodSettings {
    pub label: String,
    #[serde(default = "one")]
    pub multiplier: f64,
}

impl LikelihoodSettings {
    pub fn named(label: &str) -> Self {
        Self { label: label.to_string(), multiplier: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LikelihoodConfig {
    Multinomial(LikelihoodSettings),
    Lognormal(LikelihoodSettings),
    LognormalWithQ(LikelihoodSettings),
    Normal(LikelihoodSettings),
    Binomial(LikelihoodSettings),
    BinomialApprox(LikelihoodSettings),
    Bernoulli(LikelihoodSettings),
    Poisson(LikelihoodSettings),
    DirichletMultinomial(DirichletMultinomialConfig),
}

/// Type keys of the families that need no configuration block.
pub const BUILT_IN: [&str; 8] =
    ["multinomial", "lognormal", "lognormal_with_q", "normal", "binomial", "binomial_approx", "bernoulli", "poisson"];

impl LikelihoodConfig {
    pub fn label(&self) -> &str {
        match self {
            Self::Multinomial(s)
            | Self::Lognormal(s)
            | Self::LognormalWithQ(s)
            | Self::Normal(s)
            | Self::Binomial(s)
            | Self::BinomialApprox(s)
            | Self::Bernoulli(s)
            | Self::Poisson(s) => &s.label,
            Self::DirichletMultinomial(c) => &c.label,
        }
    }

    fn built_in(kind: &str) -> Option<Self> {
        let s = LikelihoodSettings::named(kind);
        Some(match kind {
            "multinomial" => Self::Multinomial(s),
            "lognormal" => Self::Lognormal(s),
            "lognormal_with_q" => Self::LognormalWithQ(s),
            "normal" => Self::Normal(s),
            "binomial" => Self::Binomial(s),
            "binomial_approx" => Self::BinomialApprox(s),
            "bernoulli" => Self::Bernoulli(s),
            "poisson" => Self::Poisson(s),
            _ => return None,
        })
    }

    pub fn into_likelihood(self) -> LikelihoodResult<Box<dyn Likelihood>> {
        Ok(match self {
            Self::Multinomial(s) => Box::new(Multinomial::new(s)),
            Self::Lognormal(s) => Box::new(LogNormal::new(s)),
            Self::LognormalWithQ(s) => Box::new(LogNormalWithQ::new(s)),
            Self::Normal(s) => Box::new(Normal::new(s)),
            Self::Binomial(s) => Box::new(Binomial::new(s)),
            Self::BinomialApprox(s) => Box::new(BinomialApprox::new(s)),
            Self::Bernoulli(s) => Box::new(Bernoulli::new(s)),
            Self::Poisson(s) => Box::new(Poisson::new(s)),
            Self::DirichletMultinomial(c) => Box::new(DirichletMultinomial::new(c)?),
        })
    }
}

pub trait Likelihood: Addressable + Debug {
    fn label(&self) -> &str;
    /// Configuration `type` key.
    fn kind(&self) -> &'static str;
    fn multiplier(&self) -> f64;

    /// Combine an observation's error value with its process error.
    fn adjust_error_value(&self, process_error: f64, error_value: f64) -> f64;

    /// Unscaled negative log-likelihood of one comparison.
    fn comparison_score(&self, comparison: &Comparison) -> f64;

    /// Constant term for the comparisons of `year`.
    fn initial_score(&self, _comparisons: &Comparisons, _year: u32) -> f64 {
        0.0
    }

    /// Score every comparison in place.
    fn get_scores(&self, comparisons: &mut Comparisons) {
        let multiplier = self.multiplier();
        for comparison in comparisons.values_mut().flatten() {
            comparison.score = self.comparison_score(comparison) * multiplier;
        }
    }

    /// One simulated observed value for `comparison`.
    fn simulate_one(&self, comparison: &Comparison, rng: &mut ModelRng) -> LikelihoodResult<f64>;

    /// Whether simulated values are rescaled to sum to one per category.
    fn normalises_simulations(&self) -> bool {
        false
    }

    /// Replace every observed value with a draw from the fitted model.
    fn simulate_observed(&self, comparisons: &mut Comparisons, rng: &mut ModelRng) -> LikelihoodResult<()> {
        for row in comparisons.values_mut() {
            for comparison in row.iter_mut() {
                comparison.observed = self.simulate_one(comparison, rng)?;
            }
            if self.normalises_simulations() {
                normalise_by_category(row);
            }
        }
        Ok(())
    }
}

// ---- Helper methods ----

/// `sqrt(e² + pe²)` when there is process error.
pub(crate) fn add_in_quadrature(process_error: f64, error_value: f64) -> f64 {
    if process_error > 0.0 {
        (error_value * error_value + process_error * process_error).sqrt()
    } else {
        error_value
    }
}

/// Harmonic combination of two effective sample sizes.
pub(crate) fn combine_sample_sizes(process_error: f64, error_value: f64) -> f64 {
    if process_error > 0.0 && error_value > 0.0 {
        1.0 / (1.0 / error_value + 1.0 / process_error)
    } else {
        error_value
    }
}

/// The `multiplier` addressable every family exposes.
pub(crate) fn multiplier_addressable<'a>(
    settings: &'a mut LikelihoodSettings, parameter: &str, index: Option<&str>,
) -> Option<&'a mut f64> {
    match (parameter, index) {
        ("multiplier", None) => Some(&mut settings.multiplier),
        _ => None,
    }
}

/// Rescale observed values to sum to one within each category.
pub(crate) fn normalise_by_category(row: &mut [Comparison]) {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for comparison in row.iter() {
        *totals.entry(comparison.category.clone()).or_default() += comparison.observed;
    }
    for comparison in row.iter_mut() {
        let total = totals.get(&comparison.category).copied().unwrap_or(0.0);
        if total > 0.0 {
            comparison.observed /= total;
        }
    }
}

/// Replace observed values with one multinomial sample per category,
/// expressed as proportions.
///
/// Each category draws `round(N)` trials over `weights` (at least one
/// trial), with `N` the adjusted sample size of its first comparison. A
/// category whose weights are all zero draws uniformly. Each simulated
/// category therefore sums to one.
pub(crate) fn simulate_composition(
    row: &mut [Comparison], weights: &[f64], sizes: &[f64], rng: &mut ModelRng,
) -> LikelihoodResult<()> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, comparison) in row.iter().enumerate() {
        match groups.iter_mut().find(|(category, _)| *category == comparison.category) {
            Some((_, members)) => members.push(i),
            None => groups.push((comparison.category.clone(), vec![i])),
        }
    }
    for (_, members) in groups {
        let mut probs: Vec<f64> = members.iter().map(|&i| weights[i].max(0.0)).collect();
        if probs.iter().sum::<f64>() <= 0.0 {
            probs.fill(1.0);
        }
        let trials = sizes[members[0]].round().max(1.0);
        let counts = rng.multinomial(&probs, trials)?;
        for (&i, count) in members.iter().zip(counts) {
            row[i].observed = count / trials;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LikelihoodId(pub usize);

/// Built-in families plus configured blocks, indexed by label.
#[derive(Debug, Default)]
pub struct Likelihoods {
    items: Vec<Box<dyn Likelihood>>,
    index: HashMap<String, LikelihoodId>,
}

impl Likelihoods {
    pub fn new(configs: &[LikelihoodConfig]) -> LikelihoodResult<Self> {
        let mut out = Self::default();
        for kind in BUILT_IN {
            if let Some(config) = LikelihoodConfig::built_in(kind) {
                out.insert(config.into_likelihood()?);
            }
        }
        for config in configs {
            let label = config.label().to_string();
            if BUILT_IN.contains(&label.as_str()) || label == "dirichlet_multinomial" {
                return Err(LikelihoodError::ReservedLabel { label });
            }
            if out.index.contains_key(&label) {
                return Err(LikelihoodError::DuplicateLabel { label });
            }
            out.insert(config.clone().into_likelihood()?);
        }
        Ok(out)
    }

    fn insert(&mut self, likelihood: Box<dyn Likelihood>) {
        self.index.insert(likelihood.label().to_string(), LikelihoodId(self.items.len()));
        self.items.push(likelihood);
    }

    pub fn id(&self, label: &str) -> LikelihoodResult<LikelihoodId> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| LikelihoodError::UnknownLikelihood { label: label.to_string() })
    }

    pub fn get(&self, id: LikelihoodId) -> &dyn Likelihood {
        self.items[id.0].as_ref()
    }

    pub fn by_label_mut(&mut self, label: &str) -> Option<&mut (dyn Likelihood + 'static)> {
        let id = self.index.get(label)?;
        Some(self.items[id.0].as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Built-in registration and label resolution.
    // - Rejection of reserved and duplicate labels.
    // - The multiplier applied by the provided `get_scores`.
    //
    // They intentionally DO NOT cover:
    // - Per-family formulas (see each family's module).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Every built-in family resolves by its type name.
    //
    // Given
    // -----
    // - No configured blocks.
    //
    // Expect
    // ------
    // - Each `BUILT_IN` key resolves and reports itself as its kind.
    fn built_in_families_resolve_by_type_name() {
        // Arrange
        let store = Likelihoods::new(&[]).unwrap();

        // Act / Assert
        for kind in BUILT_IN {
            let id = store.id(kind).unwrap();
            assert_eq!(store.get(id).kind(), kind);
        }
        assert!(matches!(
            store.id("dirichlet_multinomial"),
            Err(LikelihoodError::UnknownLikelihood { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Configured labels may not shadow type names or each other.
    //
    // Given
    // -----
    // - A block labelled "multinomial", then two blocks labelled "dm".
    //
    // Expect
    // ------
    // - `ReservedLabel`, then `DuplicateLabel`.
    fn configured_labels_must_be_unique_and_unreserved() {
        // Arrange
        let reserved = LikelihoodConfig::Lognormal(LikelihoodSettings::named("multinomial"));
        let dm = LikelihoodConfig::DirichletMultinomial(DirichletMultinomialConfig {
            label: "dm".to_string(),
            theta: 0.5,
            multiplier: 1.0,
        });

        // Act
        let first = Likelihoods::new(&[reserved]).unwrap_err();
        let second = Likelihoods::new(&[dm.clone(), dm]).unwrap_err();

        // Assert
        assert_eq!(first, LikelihoodError::ReservedLabel { label: "multinomial".to_string() });
        assert_eq!(second, LikelihoodError::DuplicateLabel { label: "dm".to_string() });
    }

    #[test]
    // Purpose
    // -------
    // The multiplier scales every comparison score.
    //
    // Given
    // -----
    // - A lognormal block with multiplier 2 and one comparison.
    //
    // Expect
    // ------
    // - Twice the built-in lognormal score.
    fn multiplier_scales_scores() {
        // Arrange
        let json = r#"[{"type": "lognormal", "label": "heavy", "multiplier": 2.0}]"#;
        let configs: Vec<LikelihoodConfig> = serde_json::from_str(json).unwrap();
        let store = Likelihoods::new(&configs).unwrap();
        let mut plain: Comparisons =
            Comparisons::from([(2000, vec![Comparison::new("male", 0.4, 0.5, 0.2, 0.0, 1e-11)])]);
        let mut heavy = plain.clone();

        // Act
        store.get(store.id("lognormal").unwrap()).get_scores(&mut plain);
        store.get(store.id("heavy").unwrap()).get_scores(&mut heavy);

        // Assert
        assert!((heavy[&2000][0].score - 2.0 * plain[&2000][0].score).abs() < 1e-12);
    }
}
