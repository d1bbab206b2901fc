//! estimate_transformations — reparameterisations seen by the minimiser.
//!
//! Purpose
//! -------
//! Rewrite estimate values and bounds into a space that is easier to
//! minimise in, and add the matching Jacobian term to the objective.
//!
//! Key behaviors
//! -------------
//! - Simple kinds (`log`, `sqrt`, `inverse`, `log_odds`) act on each target
//!   independently; group kinds (`orthogonal`, `log_sum`,
//!   `average_difference`, `simplex`) act on several estimates jointly.
//! - `transform` is a no-op when already transformed and `restore` is a
//!   no-op when not; both log the skipped call at `trace`.
//! - The Jacobian is recomputed from untransformed values on every
//!   transform and restore; `score()` is 0 unless
//!   `transform_with_jacobian`.
//!
//! Invariants & assumptions
//! ------------------------
//! - No estimate is targeted by more than one transformation.
//! - `restore(transform(x)) == x` to floating-point tolerance inside the
//!   bounds (simplex excepted at its clamps).
//! - When an estimate's prior applies to the transformed value its
//!   configured bounds are already in transformed space and are left as
//!   they are.
//!
//! Conventions
//! -----------
//! - Simple kinds score with the derivative of the transformed value
//!   (`1 / v` for `log`); group kinds score with the negative log
//!   determinant of the restoring map.
//!
//! Downstream usage
//! ----------------
//! - `Model::objective_at` restores before running the model and
//!   transforms again after scoring.
//! - The objective function calls `transform_for_priors` /
//!   `restore_for_priors` around prior scoring.
use std::{collections::HashMap, fmt::Debug};

use serde::Deserialize;
use tracing::{trace, warn};

pub mod average_difference;
pub mod errors;
pub mod log_sum;
pub mod orthogonal;
pub mod simple;
pub mod simplex;

// ---- Re-exports (primary public surface) ----
pub use errors::{TransformationError, TransformationResult};
pub use simple::SimpleKind;

use crate::{
    estimate_transformations::{
        average_difference::AverageDifference, log_sum::LogSum, orthogonal::Orthogonal, simple::SimpleTransform,
        simplex::Simplex,
    },
    estimates::{Estimate, Estimates},
};

/// The arithmetic of one transformation kind.
pub trait Transform: Debug {
    fn kind(&self) -> &'static str;

    /// Estimate positions this transformation owns.
    fn targets(&self) -> &[usize];

    /// Reason the configured bounds are outside the domain, if any.
    fn domain_error(&self, _estimates: &Estimates) -> Option<String> {
        None
    }

    /// Check bound values before the first transform.
    fn prepare(&mut self, _label: &str, _estimates: &Estimates) -> TransformationResult<()> {
        Ok(())
    }

    fn supports_jacobian(&self) -> bool {
        true
    }

    fn transform(&mut self, estimates: &mut Estimates);

    fn restore(&mut self, estimates: &mut Estimates);

    /// Jacobian term at the current, untransformed values.
    fn jacobian(&self, estimates: &Estimates) -> f64;
}

/// Move `estimate` to transformed-space bounds unless its configured
/// bounds already are.
pub(crate) fn set_transformed_bounds(estimate: &mut Estimate, lower: f64, upper: f64) {
    if !estimate.prior_applies_to_transform {
        estimate.set_bounds(lower, upper);
    }
}

fn default_lower_clamp() -> f64 {
    -1e10
}

fn default_upper_clamp() -> f64 {
    1e10
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransformationConfig {
    pub label: String,
    /// Defaults to true for kinds that have a Jacobian.
    #[serde(default)]
    pub transform_with_jacobian: Option<bool>,
    #[serde(flatten)]
    pub kind: TransformationKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformationKind {
    Log {
        estimate: String,
    },
    Sqrt {
        estimate: String,
    },
    Inverse {
        estimate: String,
    },
    LogOdds {
        estimate: String,
    },
    Orthogonal {
        theta_one: String,
        theta_two: String,
    },
    LogSum {
        first: String,
        second: String,
    },
    AverageDifference {
        first: String,
        second: String,
    },
    Simplex {
        estimate: String,
        #[serde(default = "yes")]
        sum_to_one: bool,
        #[serde(default = "default_lower_clamp")]
        lower_bound: f64,
        #[serde(default = "default_upper_clamp")]
        upper_bound: f64,
    },
}

impl TransformationConfig {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Resolve estimate labels and build the transformation.
    ///
    /// Errors
    /// ------
    /// - `UnknownEstimate` for an undefined estimate block.
    /// - `TargetCount` when a two-estimate kind names an indexed block or a
    ///   simplex names fewer than two estimates.
    pub fn build(&self, estimates: &Estimates) -> TransformationResult<EstimateTransformation> {
        let label = self.label();
        let all = |estimate: &str| {
            let found = estimates.indices_of(estimate);
            if found.is_empty() {
                return Err(TransformationError::UnknownEstimate {
                    transformation: label.to_string(),
                    estimate: estimate.to_string(),
                });
            }
            Ok(found)
        };
        let one = |estimate: &str| {
            let found = all(estimate)?;
            match found.as_slice() {
                [i] => Ok(*i),
                _ => Err(TransformationError::TargetCount {
                    transformation: label.to_string(),
                    expected: "exactly 1",
                    found: found.len(),
                }),
            }
        };
        let inner: Box<dyn Transform> = match &self.kind {
            TransformationKind::Log { estimate, .. } => Box::new(SimpleTransform::new(SimpleKind::Log, all(estimate)?)),
            TransformationKind::Sqrt { estimate, .. } => {
                Box::new(SimpleTransform::new(SimpleKind::Sqrt, all(estimate)?))
            }
            TransformationKind::Inverse { estimate, .. } => {
                Box::new(SimpleTransform::new(SimpleKind::Inverse, all(estimate)?))
            }
            TransformationKind::LogOdds { estimate, .. } => {
                Box::new(SimpleTransform::new(SimpleKind::LogOdds, all(estimate)?))
            }
            TransformationKind::Orthogonal { theta_one, theta_two, .. } => {
                Box::new(Orthogonal::new(one(theta_one)?, one(theta_two)?))
            }
            TransformationKind::LogSum { first, second, .. } => Box::new(LogSum::new(one(first)?, one(second)?)),
            TransformationKind::AverageDifference { first, second, .. } => {
                Box::new(AverageDifference::new(one(first)?, one(second)?))
            }
            TransformationKind::Simplex { estimate, sum_to_one, lower_bound, upper_bound, .. } => {
                let targets = all(estimate)?;
                if targets.len() < 2 {
                    return Err(TransformationError::TargetCount {
                        transformation: label.to_string(),
                        expected: "at least 2",
                        found: targets.len(),
                    });
                }
                Box::new(Simplex::new(targets, *sum_to_one, *lower_bound, *upper_bound))
            }
        };
        EstimateTransformation::new(label, self.transform_with_jacobian, inner, estimates)
    }
}

/// A transformation plus its transformed/restored state and cached
/// Jacobian.
#[derive(Debug)]
pub struct EstimateTransformation {
    label: String,
    with_jacobian: bool,
    transformed: bool,
    jacobian: f64,
    inner: Box<dyn Transform>,
}

impl EstimateTransformation {
    /// Errors
    /// ------
    /// - `JacobianUnsupported` when a Jacobian is requested from a kind
    ///   without one.
    /// - `InconsistentJacobian` when a target states the opposite
    ///   `transform_with_jacobian`.
    /// - `InvalidBounds` for bounds outside the kind's domain.
    pub fn new(
        label: &str, with_jacobian: Option<bool>, inner: Box<dyn Transform>, estimates: &Estimates,
    ) -> TransformationResult<Self> {
        let with_jacobian = with_jacobian.unwrap_or_else(|| inner.supports_jacobian());
        if with_jacobian && !inner.supports_jacobian() {
            return Err(TransformationError::JacobianUnsupported {
                transformation: label.to_string(),
                kind: inner.kind(),
            });
        }
        for i in inner.targets() {
            let e = estimates.get(*i);
            if e.transform_with_jacobian.is_some_and(|flag| flag != with_jacobian) {
                return Err(TransformationError::InconsistentJacobian {
                    transformation: label.to_string(),
                    estimate: e.label.clone(),
                });
            }
            if !with_jacobian && !e.prior_applies_to_transform {
                warn!(
                    transformation = %label,
                    estimate = %e.label,
                    "no Jacobian is applied and the prior is on the untransformed value; estimates may be biased"
                );
            }
        }
        if let Some(reason) = inner.domain_error(estimates) {
            return Err(TransformationError::InvalidBounds { transformation: label.to_string(), reason });
        }
        let jacobian = inner.jacobian(estimates);
        Ok(Self { label: label.to_string(), with_jacobian, transformed: false, jacobian, inner })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    pub fn targets(&self) -> &[usize] {
        self.inner.targets()
    }

    pub fn is_transformed(&self) -> bool {
        self.transformed
    }

    pub fn transform_with_jacobian(&self) -> bool {
        self.with_jacobian
    }

    fn applies_prior_to_transform(&self, estimates: &Estimates) -> bool {
        self.targets().iter().any(|i| estimates.get(*i).prior_applies_to_transform)
    }

    pub fn transform(&mut self, estimates: &mut Estimates) {
        if self.transformed {
            trace!(transformation = %self.label, "already transformed");
            return;
        }
        self.jacobian = self.inner.jacobian(estimates);
        self.inner.transform(estimates);
        self.transformed = true;
    }

    pub fn restore(&mut self, estimates: &mut Estimates) {
        if !self.transformed {
            trace!(transformation = %self.label, "not transformed");
            return;
        }
        self.inner.restore(estimates);
        self.transformed = false;
        self.jacobian = self.inner.jacobian(estimates);
    }

    /// Jacobian contribution to the objective.
    pub fn score(&self) -> f64 {
        if self.with_jacobian { self.jacobian } else { 0.0 }
    }
}

#[derive(Debug, Default)]
pub struct Transformations {
    items: Vec<EstimateTransformation>,
}

impl Transformations {
    /// Build configured transformations plus one simple transformation per
    /// estimate block that names one.
    ///
    /// Errors
    /// ------
    /// - `DuplicateLabel` for repeated transformation labels.
    /// - `SharedEstimate` when two transformations target one estimate.
    /// - Anything [`TransformationConfig::build`] or
    ///   [`EstimateTransformation::new`] raises.
    pub fn new(configs: &[TransformationConfig], estimates: &Estimates) -> TransformationResult<Self> {
        let mut items: Vec<EstimateTransformation> = Vec::new();
        for config in configs {
            if items.iter().any(|t| t.label == config.label()) {
                return Err(TransformationError::DuplicateLabel { label: config.label().to_string() });
            }
            items.push(config.build(estimates)?);
        }

        let mut blocks: Vec<(&str, SimpleKind, Option<bool>, bool)> = Vec::new();
        for e in estimates.iter() {
            if let Some(kind) = e.transformation {
                if !blocks.iter().any(|(label, ..)| *label == e.label) {
                    blocks.push((&e.label, kind, e.transform_with_jacobian, e.prior_applies_to_transform));
                }
            }
        }
        for (block, kind, with_jacobian, prior_on_transform) in blocks {
            let label = format!("{}_{block}", kind.name());
            if items.iter().any(|t| t.label == label) {
                return Err(TransformationError::DuplicateLabel { label });
            }
            let with_jacobian = with_jacobian.or(Some(!prior_on_transform));
            let inner = Box::new(SimpleTransform::new(kind, estimates.indices_of(block)));
            items.push(EstimateTransformation::new(&label, with_jacobian, inner, estimates)?);
        }

        let mut owner: HashMap<usize, &str> = HashMap::new();
        for t in &items {
            for i in t.targets() {
                if let Some(first) = owner.insert(*i, &t.label) {
                    return Err(TransformationError::SharedEstimate {
                        estimate: estimates.get(*i).parameter.full_name(),
                        first: first.to_string(),
                        second: t.label.clone(),
                    });
                }
            }
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EstimateTransformation> {
        self.items.iter()
    }

    /// Validate bound values and, where priors apply to the transformed
    /// value, check transformed values against the configured bounds.
    /// Leaves every estimate restored.
    ///
    /// Errors
    /// ------
    /// - `InvalidValues` / `InvalidBounds` from a kind's own checks.
    /// - `OutOfBounds` for a transformed value outside its bounds.
    pub fn prepare(&mut self, estimates: &mut Estimates) -> TransformationResult<()> {
        for t in &mut self.items {
            t.inner.prepare(&t.label, estimates)?;
            if !t.applies_prior_to_transform(estimates) {
                continue;
            }
            t.transform(estimates);
            let violation = t
                .targets()
                .iter()
                .map(|i| estimates.get(*i))
                .find(|e| e.prior_applies_to_transform && !e.held && e.check_bounds().is_err())
                .map(|e| TransformationError::OutOfBounds {
                    transformation: t.label.clone(),
                    parameter: e.parameter.full_name(),
                    value: e.value,
                    lower: e.lower_bound,
                    upper: e.upper_bound,
                });
            t.restore(estimates);
            if let Some(err) = violation {
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn transform(&mut self, estimates: &mut Estimates) {
        for t in &mut self.items {
            t.transform(estimates);
        }
    }

    pub fn restore(&mut self, estimates: &mut Estimates) {
        for t in self.items.iter_mut().rev() {
            t.restore(estimates);
        }
    }

    /// Transform only where priors are on the transformed value.
    pub fn transform_for_priors(&mut self, estimates: &mut Estimates) {
        for t in &mut self.items {
            if t.applies_prior_to_transform(estimates) {
                t.transform(estimates);
            }
        }
    }

    pub fn restore_for_priors(&mut self, estimates: &mut Estimates) {
        for t in self.items.iter_mut().rev() {
            if t.applies_prior_to_transform(estimates) {
                t.restore(estimates);
            }
        }
    }

    pub fn is_transformed(&self) -> bool {
        self.items.iter().any(|t| t.transformed)
    }
}
