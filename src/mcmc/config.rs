//! `mcmc` block of the model configuration.
use serde::Deserialize;

use crate::model::errors::{ModelError, ModelResult};

fn default_length() -> usize {
    1000
}

fn default_keep() -> usize {
    1
}

fn default_max_correlation() -> f64 {
    0.8
}

fn default_correlation_adjustment_diff() -> f64 {
    0.0001
}

fn default_df() -> f64 {
    4.0
}

/// Proposal distribution for a random-walk jump.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalDistribution {
    #[default]
    Normal,
    /// Multivariate t with `df` degrees of freedom.
    T {
        #[serde(default = "default_df")]
        df: f64,
    },
}

/// How the MPD covariance is conditioned before it is factorised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceAdjustment {
    /// Clamp correlations to `max_correlation`, floor tiny variances.
    #[default]
    Correlation,
    /// Floor tiny variances only.
    Covariance,
    None,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct McmcConfig {
    /// Number of proposals, including burn-in.
    #[serde(default = "default_length")]
    pub length: usize,
    /// Record every `keep`th iteration.
    #[serde(default = "default_keep")]
    pub keep: usize,
    /// Links at or before this iteration are flagged as burn-in.
    #[serde(default)]
    pub burn_in: usize,
    /// Defaults to `2.4 / sqrt(n)` for `n` sampled estimates.
    #[serde(default)]
    pub step_size: Option<f64>,
    /// Scale of the jitter applied to the MPD before the first jump; 0 starts
    /// at the MPD.
    #[serde(default)]
    pub start: f64,
    #[serde(default = "default_max_correlation")]
    pub max_correlation: f64,
    #[serde(default)]
    pub covariance_adjustment: CovarianceAdjustment,
    /// Variance floor as a fraction of each estimate's bound range.
    #[serde(default = "default_correlation_adjustment_diff")]
    pub correlation_adjustment_diff: f64,
    #[serde(default)]
    pub proposal_distribution: ProposalDistribution,
    /// Iterations at which the step size is re-tuned.
    #[serde(default)]
    pub adapt_stepsize_at: Vec<usize>,
}

impl Default for McmcConfig {
    fn default() -> Self {
        Self {
            length: default_length(),
            keep: default_keep(),
            burn_in: 0,
            step_size: None,
            start: 0.0,
            max_correlation: default_max_correlation(),
            covariance_adjustment: CovarianceAdjustment::default(),
            correlation_adjustment_diff: default_correlation_adjustment_diff(),
            proposal_distribution: ProposalDistribution::default(),
            adapt_stepsize_at: Vec::new(),
        }
    }
}

impl McmcConfig {
    /// Errors
    /// ------
    /// - `Config` for a zero length or keep, a non-positive step size,
    ///   `max_correlation` outside (0, 1], or a t proposal with `df <= 0`.
    pub fn validate(&self) -> ModelResult<()> {
        if self.length == 0 {
            return Err(ModelError::config("mcmc.length", "must be greater than zero"));
        }
        if self.keep == 0 {
            return Err(ModelError::config("mcmc.keep", "must be greater than zero"));
        }
        if let Some(step) = self.step_size {
            if !(step.is_finite() && step > 0.0) {
                return Err(ModelError::config("mcmc.step_size", format!("{step} must be positive")));
            }
        }
        if !(self.max_correlation > 0.0 && self.max_correlation <= 1.0) {
            return Err(ModelError::config(
                "mcmc.max_correlation",
                format!("{} must lie in (0, 1]", self.max_correlation),
            ));
        }
        if self.start < 0.0 {
            return Err(ModelError::config("mcmc.start", "must not be negative"));
        }
        if let ProposalDistribution::T { df } = self.proposal_distribution {
            if df <= 0.0 {
                return Err(ModelError::config("mcmc.proposal_distribution.df", format!("{df} must be positive")));
            }
        }
        Ok(())
    }
}
