//! Public surface of the minimiser: the objective contract, options and
//! the outcome of a run.
//!
//! Convention: the minimiser minimises `c(θ)` directly. The model's
//! objective function is already a negative log posterior, so no sign
//! flip happens anywhere in this module.
use std::str::FromStr;

use argmin::core::TerminationStatus;
use argmin_math::ArgminL2Norm;
use serde::Deserialize;

use crate::optimization::{
    errors::{OptError, OptResult},
    minimiser::{
        types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta},
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};

/// Scalar function the minimiser drives.
///
/// `value` is required; `grad` defaults to `GradientNotImplemented`, in
/// which case finite differences of `value` are used.
pub trait Objective {
    fn value(&self, theta: &Theta) -> OptResult<Cost>;

    fn grad(&self, _theta: &Theta) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Line search used inside L-BFGS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSearcher {
    #[default]
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    /// Case-insensitive, with or without an underscore.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "").as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidParameter {
                text: format!("line search '{s}': valid options are 'more_thuente' or 'hager_zhang'"),
            }),
        }
    }
}

/// Stopping rules. At least one must be present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Errors
    /// ------
    /// - `NoTolerancesProvided` if all three are `None`.
    /// - `InvalidTolGrad` / `InvalidTolCost` for non-finite or non-positive
    ///   tolerances.
    /// - `InvalidMaxIter` for a zero iteration cap.
    pub fn new(tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if max_iter == Some(0) {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimiserOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl MinimiserOptions {
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, verbose: bool, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if lbfgs_mem == Some(0) {
            return Err(OptError::InvalidLbfgsMem { mem: 0, reason: "L-BFGS memory must be greater than zero." });
        }
        Ok(Self { tols, line_searcher, verbose, lbfgs_mem })
    }
}

fn default_max_iterations() -> usize {
    1000
}

fn default_tolerance() -> f64 {
    2e-3
}

fn default_true() -> bool {
    true
}

/// `minimiser` block of the model configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MinimiserConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Gradient-norm tolerance in the scaled space.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub cost_tolerance: Option<f64>,
    #[serde(default)]
    pub line_search: LineSearcher,
    #[serde(default)]
    pub lbfgs_memory: Option<usize>,
    /// Compute the covariance matrix after the final phase.
    #[serde(default = "default_true")]
    pub covariance: bool,
    #[serde(default)]
    pub verbose: bool,
}

impl Default for MinimiserConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            cost_tolerance: None,
            line_search: LineSearcher::default(),
            lbfgs_memory: None,
            covariance: true,
            verbose: false,
        }
    }
}

impl MinimiserConfig {
    pub fn options(&self) -> OptResult<MinimiserOptions> {
        let tols = Tolerances::new(Some(self.tolerance), self.cost_tolerance, Some(self.max_iterations))?;
        MinimiserOptions::new(tols, self.line_search, self.verbose, self.lbfgs_memory.or(Some(DEFAULT_LBFGS_MEM)))
    }
}

/// Result of one minimiser run.
///
/// - `converged` is `true` for any termination other than `NotTerminated`.
/// - `fn_evals` carries argmin's counters (`cost_count`, `gradient_count`).
#[derive(Debug, Clone, PartialEq)]
pub struct MinimiserOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl MinimiserOutcome {
    /// Errors
    /// ------
    /// - `MissingThetaHat` / `InvalidThetaHat` for an absent or non-finite
    ///   estimate.
    /// - `NonFiniteCost` for a non-finite best value.
    pub fn new(
        theta_hat: Option<Theta>, value: f64, termination: TerminationStatus, iterations: u64, fn_evals: FnEvalMap,
        grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat)?;
        validate_value(value)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            other => (true, format!("{other:?}")),
        };
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm: grad.map(|g| g.l2_norm()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Tolerance and option validation.
    // - Minimiser configuration defaults and line-search parsing.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Tolerances reject an all-empty set and non-positive values.
    //
    // Given
    // -----
    // - (None, None, None), a negative gradient tolerance and zero iterations.
    //
    // Expect
    // ------
    // - The matching error variant for each.
    fn tolerances_validate_inputs() {
        // Act / Assert
        assert_eq!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided));
        match Tolerances::new(Some(-1.0), None, None) {
            Err(OptError::InvalidTolGrad { tol, .. }) => assert_eq!(tol, -1.0),
            other => panic!("expected InvalidTolGrad, got {other:?}"),
        }
        match Tolerances::new(None, None, Some(0)) {
            Err(OptError::InvalidMaxIter { .. }) => {}
            other => panic!("expected InvalidMaxIter, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // An empty `minimiser` block yields usable options.
    //
    // Given
    // -----
    // - `{}` and `{"line_search": "hager_zhang", "lbfgs_memory": 0}`.
    //
    // Expect
    // ------
    // - Defaults with More-Thuente and memory 7; the second errors on memory.
    fn minimiser_config_defaults() {
        // Arrange
        let defaults: MinimiserConfig = serde_json::from_str("{}").unwrap();
        let zero_mem: MinimiserConfig =
            serde_json::from_str(r#"{"line_search": "hager_zhang", "lbfgs_memory": 0}"#).unwrap();

        // Act
        let options = defaults.options().unwrap();

        // Assert
        assert_eq!(options.line_searcher, LineSearcher::MoreThuente);
        assert_eq!(options.lbfgs_mem, Some(DEFAULT_LBFGS_MEM));
        assert_eq!(options.tols.max_iter, Some(1000));
        assert!(defaults.covariance);
        assert_eq!(zero_mem.line_search, LineSearcher::HagerZhang);
        assert!(matches!(zero_mem.options(), Err(OptError::InvalidLbfgsMem { .. })));
        assert_eq!("Hager_Zhang".parse::<LineSearcher>(), Ok(LineSearcher::HagerZhang));
    }
}
