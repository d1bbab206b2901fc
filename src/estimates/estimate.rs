//! A single estimated scalar and its configuration block.
//!
//! An `Estimate` names one addressable target (plus any `same` targets that
//! follow it), carries bounds, a prior and phase flags, and holds the
//! current value in whichever space the minimiser sees. Estimate
//! transformations rewrite `value` and the bounds in place while
//! transformed and put the originals back on restore.
use serde::Deserialize;

use crate::{
    estimate_transformations::SimpleKind,
    estimates::{
        errors::{EstimateError, EstimateResult},
        priors::Prior,
    },
    model::objects::AddressableName,
};

fn one() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EstimateConfig {
    /// Defaults to `parameter`.
    #[serde(default)]
    pub label: Option<String>,
    /// Addressable target; a brace list or range expands to one estimate
    /// per index.
    pub parameter: String,
    /// Targets that take the same value as `parameter`.
    #[serde(default)]
    pub same: Vec<String>,
    /// One bound, or one per expanded index.
    #[serde(deserialize_with = "crate::utils::one_or_many")]
    pub lower_bound: Vec<f64>,
    #[serde(deserialize_with = "crate::utils::one_or_many")]
    pub upper_bound: Vec<f64>,
    #[serde(default)]
    pub prior: Prior,
    #[serde(default = "one")]
    pub estimation_phase: usize,
    #[serde(default)]
    pub mcmc_fixed: bool,
    /// Optional simple transformation applied to this estimate alone.
    #[serde(default)]
    pub transformation: Option<SimpleKind>,
    #[serde(default)]
    pub transform_with_jacobian: Option<bool>,
    /// The prior (and the configured bounds) refer to the transformed
    /// value.
    #[serde(default)]
    pub prior_applies_to_transform: bool,
}

impl EstimateConfig {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.parameter)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub label: String,
    pub parameter: AddressableName,
    pub same: Vec<AddressableName>,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub original_lower_bound: f64,
    pub original_upper_bound: f64,
    pub value: f64,
    pub prior: Prior,
    pub phase: usize,
    pub mcmc_fixed: bool,
    pub transformation: Option<SimpleKind>,
    pub transform_with_jacobian: Option<bool>,
    pub prior_applies_to_transform: bool,
    /// Set by a group transformation that derives this value from the
    /// others while transformed.
    pub held: bool,
    enabled: bool,
}

impl Estimate {
    pub(crate) fn new(
        config: &EstimateConfig, parameter: AddressableName, same: Vec<AddressableName>, lower: f64, upper: f64,
    ) -> EstimateResult<Self> {
        let label = config.label().to_string();
        if lower > upper {
            return Err(EstimateError::InvalidBounds {
                label,
                reason: format!("lower_bound ({lower}) must not exceed upper_bound ({upper}) for {parameter}"),
            });
        }
        if config.estimation_phase == 0 {
            return Err(EstimateError::InvalidBounds {
                label,
                reason: "estimation_phase must be at least 1".to_string(),
            });
        }
        if config.transform_with_jacobian == Some(true) && config.prior_applies_to_transform {
            return Err(EstimateError::InconsistentFlags {
                label,
                reason: "transform_with_jacobian and prior_applies_to_transform cannot both be true",
            });
        }
        if !config.prior_applies_to_transform {
            config.prior.validate(&label, lower, upper)?;
        }
        Ok(Self {
            label,
            parameter,
            same,
            lower_bound: lower,
            upper_bound: upper,
            original_lower_bound: lower,
            original_upper_bound: upper,
            value: lower,
            prior: config.prior.clone(),
            phase: config.estimation_phase,
            mcmc_fixed: config.mcmc_fixed,
            transformation: config.transformation,
            transform_with_jacobian: config.transform_with_jacobian,
            prior_applies_to_transform: config.prior_applies_to_transform,
            held: false,
            enabled: true,
        })
    }

    /// Take the target's configured value as the starting point.
    ///
    /// Errors
    /// ------
    /// - `OutOfBounds` when the prior is on the untransformed value and
    ///   `value` lies outside the bounds.
    pub fn bind(&mut self, value: f64) -> EstimateResult<()> {
        self.value = value;
        if self.prior_applies_to_transform {
            return Ok(());
        }
        self.check_bounds()
    }

    pub fn check_bounds(&self) -> EstimateResult<()> {
        if self.value < self.lower_bound || self.value > self.upper_bound {
            return Err(EstimateError::OutOfBounds {
                parameter: self.parameter.full_name(),
                value: self.value,
                lower: self.lower_bound,
                upper: self.upper_bound,
            });
        }
        Ok(())
    }

    /// Every target written when this estimate is applied.
    pub fn targets(&self) -> impl Iterator<Item = &AddressableName> {
        std::iter::once(&self.parameter).chain(self.same.iter())
    }

    pub fn prior_score(&self) -> f64 {
        self.prior.score(self.value)
    }

    /// Active in the current phase and not derived from other estimates.
    pub fn is_free(&self) -> bool {
        self.enabled && !self.held
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_bounds(&mut self, lower: f64, upper: f64) {
        self.lower_bound = lower;
        self.upper_bound = upper;
    }

    pub fn restore_bounds(&mut self) {
        self.lower_bound = self.original_lower_bound;
        self.upper_bound = self.original_upper_bound;
    }
}
