//! Errors raised while configuring likelihoods or simulating from them.
use crate::rng::RngError;

pub type LikelihoodResult<T> = Result<T, LikelihoodError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LikelihoodError {
    // ---- Configuration ----
    /// Observation named a likelihood that is neither built in nor configured.
    #[error("likelihood '{label}' is not defined")]
    UnknownLikelihood { label: String },

    /// Two likelihood blocks share a label.
    #[error("likelihood '{label}' has been defined more than once")]
    DuplicateLabel { label: String },

    /// A configured label collides with a built-in likelihood type.
    #[error("the label '{label}' matches a likelihood type; pick a different label")]
    ReservedLabel { label: String },

    /// A likelihood parameter is outside its domain.
    #[error("likelihood[{likelihood}].{parameter}: {reason}")]
    InvalidParameter { likelihood: String, parameter: &'static str, reason: String },

    // ---- Simulation ----
    #[error(transparent)]
    Rng(#[from] RngError),
}
