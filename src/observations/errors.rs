//! Errors raised while building observations or scoring them.
use crate::{
    biology::errors::BiologyError, likelihoods::errors::LikelihoodError, partition::errors::PartitionError,
};

pub type ObservationResult<T> = Result<T, ObservationError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ObservationError {
    // ---- Configuration ----
    /// A parameter value is outside its valid domain.
    #[error("observation[{observation}].{parameter}: {reason}")]
    InvalidParameter { observation: String, parameter: &'static str, reason: String },

    /// A table row or list has the wrong number of entries.
    #[error("observation[{observation}].{parameter}: expected {expected} values but got {found}")]
    LengthMismatch { observation: String, parameter: &'static str, expected: usize, found: usize },

    /// A referenced object does not exist or cannot serve this observation.
    #[error("observation[{observation}]: {kind} '{label}' is not usable: {reason}")]
    UnknownLabel { observation: String, kind: &'static str, label: String, reason: &'static str },

    /// Two observations (or catchabilities) share a label.
    #[error("{kind} '{label}' has been defined more than once")]
    DuplicateLabel { kind: &'static str, label: String },

    // ---- Runtime ----
    /// The process did not record removals the observation needs.
    #[error("observation[{observation}]: no removals recorded for method '{method}', category '{category}' in {year}")]
    MissingRemovals { observation: String, method: String, category: String, year: u32 },

    /// Analytical catchability is not defined for this likelihood.
    #[error("catchability[{catchability}]: {reason}")]
    Nuisance { catchability: String, reason: String },

    // ---- Wrapped ----
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error(transparent)]
    Biology(#[from] BiologyError),
    #[error(transparent)]
    Likelihood(#[from] LikelihoodError),
}
