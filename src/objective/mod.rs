//! objective — the scalar the minimiser and MCMC work on.
//!
//! Purpose
//! -------
//! Sum every negative log contribution of one model iteration into named
//! score lines and five subtotals.
//!
//! Key behaviors
//! -------------
//! - `observation->label`: each observation's likelihood score.
//! - `penalty->label`: each penalty's accumulated flags.
//! - `prior->label->parameter`: each enabled estimate's prior, evaluated on
//!   the transformed value where the estimate asks for that.
//! - `additional_prior->label`: each additional prior, scored by the
//!   model from the values it names.
//! - `jacobian->label`: each transformation applying a Jacobian.
//!
//! Invariants & assumptions
//! ------------------------
//! - Called with transformations restored; leaves them restored.
//! - `score == likelihoods + priors + penalties + additional_priors + jacobians`.
pub mod additional_priors;
pub mod asserts;

// ---- Re-exports (primary public surface) ----
pub use additional_priors::{AdditionalPrior, AdditionalPriorConfig, AdditionalPriors};
pub use asserts::{AssertConfig, Asserts, ErrorType};

use crate::{
    estimate_transformations::Transformations, estimates::Estimates, likelihoods::Likelihoods,
    observations::Observations, penalties::Penalties,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreLine {
    pub label: String,
    pub score: f64,
}

/// Everything the objective reads in one evaluation.
pub struct ScoreInputs<'a> {
    pub observations: &'a mut Observations,
    pub likelihoods: &'a Likelihoods,
    pub penalties: &'a Penalties,
    pub estimates: &'a mut Estimates,
    pub transformations: &'a mut Transformations,
    /// `(label, score)` per additional prior.
    pub additional_priors: &'a [(String, f64)],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectiveFunction {
    lines: Vec<ScoreLine>,
    score: f64,
    likelihoods: f64,
    priors: f64,
    penalties: f64,
    additional_priors: f64,
    jacobians: f64,
}

impl ObjectiveFunction {
    pub fn calculate_score(&mut self, inputs: ScoreInputs<'_>) -> f64 {
        *self = Self::default();

        for obs in inputs.observations.iter_mut() {
            let score = obs.calculate_score(inputs.likelihoods);
            self.likelihoods += score;
            self.lines.push(ScoreLine { label: format!("observation->{}", obs.label()), score });
        }

        for penalty in inputs.penalties.iter() {
            let score = penalty.score();
            self.penalties += score;
            self.lines.push(ScoreLine { label: format!("penalty->{}", penalty.label()), score });
        }

        inputs.transformations.transform_for_priors(inputs.estimates);
        for e in inputs.estimates.iter().filter(|e| e.is_enabled()) {
            let score = e.prior_score();
            self.priors += score;
            self.lines.push(ScoreLine { label: format!("prior->{}->{}", e.label, e.parameter), score });
        }
        inputs.transformations.restore_for_priors(inputs.estimates);

        for (label, score) in inputs.additional_priors {
            self.additional_priors += score;
            self.lines.push(ScoreLine { label: format!("additional_prior->{label}"), score: *score });
        }

        for t in inputs.transformations.iter().filter(|t| t.transform_with_jacobian()) {
            let score = t.score();
            self.jacobians += score;
            self.lines.push(ScoreLine { label: format!("jacobian->{}", t.label()), score });
        }

        self.score = self.likelihoods + self.priors + self.penalties + self.additional_priors + self.jacobians;
        self.score
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn lines(&self) -> &[ScoreLine] {
        &self.lines
    }

    pub fn likelihoods(&self) -> f64 {
        self.likelihoods
    }

    pub fn priors(&self) -> f64 {
        self.priors
    }

    pub fn penalties(&self) -> f64 {
        self.penalties
    }

    pub fn additional_priors(&self) -> f64 {
        self.additional_priors
    }

    pub fn jacobians(&self) -> f64 {
        self.jacobians
    }
}
