//! One recorded state of the chain.
use crate::objective::ObjectiveFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    BurnIn,
    Mcmc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainLink {
    pub iteration: usize,
    pub state: ChainState,
    pub score: f64,
    pub likelihood: f64,
    pub prior: f64,
    pub penalty: f64,
    pub additional_prior: f64,
    pub jacobian: f64,
    pub acceptance_rate: f64,
    pub acceptance_rate_since_adapt: f64,
    pub step_size: f64,
    /// Current value of every estimate, fixed ones included.
    pub values: Vec<f64>,
}

/// Objective breakdown at one point of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub likelihood: f64,
    pub prior: f64,
    pub penalty: f64,
    pub additional_prior: f64,
    pub jacobian: f64,
}

impl From<&ObjectiveFunction> for ScoreBreakdown {
    fn from(objective: &ObjectiveFunction) -> Self {
        Self {
            score: objective.score(),
            likelihood: objective.likelihoods(),
            prior: objective.priors(),
            penalty: objective.penalties(),
            additional_prior: objective.additional_priors(),
            jacobian: objective.jacobians(),
        }
    }
}
