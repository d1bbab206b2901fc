//! Crate-wide error type.
//!
//! Every module error converts into [`ModelError`] so model-level
//! operations can propagate with `?`. Variants map onto the two severities
//! of the engine: anything returned as an `Err` is fatal to the current
//! run; warnings never surface here, they are logged with `tracing::warn!`.
use crate::{
    biology::errors::BiologyError, estimate_transformations::errors::TransformationError,
    estimates::errors::EstimateError, likelihoods::errors::LikelihoodError,
    observations::errors::ObservationError, optimization::errors::OptError,
    partition::errors::PartitionError, processes::errors::ProcessError, rng::RngError,
};

/// Result alias for model-level operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    // ---- Configuration ----
    /// User configuration is invalid at `parameter`.
    #[error("{parameter}: {reason}")]
    Config { parameter: String, reason: String },

    /// Configuration text could not be deserialized.
    #[error("could not parse the configuration: {reason}")]
    Json { reason: String },

    /// File access failed.
    #[error("{path}: {reason}")]
    Io { path: String, reason: String },

    // ---- Addressables ----
    /// Addressable string is malformed or names an unsupported type.
    #[error("{reason}")]
    InvalidAddressable { name: String, reason: String },

    /// Addressable string is well formed but resolves to nothing.
    #[error("the parameter '{name}' could not be found: {reason}")]
    UnknownAddressable { name: String, reason: &'static str },

    /// A referenced object label does not exist.
    #[error("{kind} '{label}' is not defined")]
    UnknownObject { kind: &'static str, label: String },

    // ---- Runtime ----
    /// Internal invariant violated; indicates a programming error.
    #[error("code error: {reason}")]
    Code { reason: String },

    /// An error-severity assert did not hold.
    #[error("assert '{label}' failed: {reason}")]
    AssertFailed { label: String, reason: String },

    /// MPD file content is malformed.
    #[error("MPD line {line}: {reason}")]
    Mpd { line: usize, reason: String },

    /// MCMC configuration or state is unusable.
    #[error("MCMC: {reason}")]
    Mcmc { reason: String },

    // ---- Module errors ----
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error(transparent)]
    Biology(#[from] BiologyError),
    /// Process failures other than [`ProcessError::NegativeAbundance`],
    /// which converts into [`ModelError::Code`].
    #[error(transparent)]
    Process(ProcessError),
    #[error(transparent)]
    Likelihood(#[from] LikelihoodError),
    #[error(transparent)]
    Observation(#[from] ObservationError),
    #[error(transparent)]
    Estimate(#[from] EstimateError),
    #[error(transparent)]
    Transformation(#[from] TransformationError),
    #[error(transparent)]
    Optimization(#[from] OptError),
    #[error(transparent)]
    Rng(#[from] RngError),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Json { reason: err.to_string() }
    }
}

impl From<ProcessError> for ModelError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NegativeAbundance { .. } => ModelError::Code { reason: err.to_string() },
            other => ModelError::Process(other),
        }
    }
}

impl ModelError {
    pub fn config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelError::Config { parameter: parameter.into(), reason: reason.into() }
    }
}
