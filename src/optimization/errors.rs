use argmin::core::{ArgminError, Error};

/// Result alias for minimiser operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptError {
    // ---- Gradient ----
    /// No analytic gradient; finite differences are used instead.
    #[error("analytic gradient not implemented")]
    GradientNotImplemented,

    #[error("gradient dimension mismatch: expected {expected}, found {found}")]
    GradientDimMismatch { expected: usize, found: usize },

    #[error("invalid gradient at index {index}: {value}: {reason}")]
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- Minimiser options ----
    #[error("invalid gradient tolerance {tol}: {reason}")]
    InvalidTolGrad { tol: f64, reason: &'static str },

    #[error("invalid cost change tolerance {tol}: {reason}")]
    InvalidTolCost { tol: f64, reason: &'static str },

    #[error("invalid maximum iterations {max_iter}: {reason}")]
    InvalidMaxIter { max_iter: usize, reason: &'static str },

    #[error("no tolerances provided")]
    NoTolerancesProvided,

    #[error("invalid L-BFGS memory {mem}: {reason}")]
    InvalidLbfgsMem { mem: usize, reason: &'static str },

    // ---- Objective ----
    /// The objective returned a non-finite value.
    #[error("non-finite objective value: {value}")]
    NonFiniteCost { value: f64 },

    /// The model failed while evaluating the objective.
    #[error("objective evaluation failed: {reason}")]
    ObjectiveFailed { reason: String },

    /// A bounded parameter has an empty or inverted interval.
    #[error("invalid bounds for parameter {index}: [{lower}, {upper}]")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },

    // ---- Outcome ----
    #[error("invalid estimate at index {index}: {value}: {reason}")]
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },

    #[error("the minimiser returned no estimate")]
    MissingThetaHat,

    // ---- Argmin ----
    #[error("invalid parameter: {text}")]
    InvalidParameter { text: String },
    #[error("not implemented: {text}")]
    NotImplemented { text: String },
    #[error("not initialized: {text}")]
    NotInitialized { text: String },
    #[error("condition violated: {text}")]
    ConditionViolated { text: String },
    #[error("checkpoint not found: {text}")]
    CheckPointNotFound { text: String },
    #[error("potential bug: {text}")]
    PotentialBug { text: String },
    #[error("impossible error: {text}")]
    ImpossibleError { text: String },
    #[error("backend error: {text}")]
    BackendError { text: String },

    // ---- Finite differences ----
    #[error("Hessian dimension mismatch: expected ({expected}, {expected}), found {found:?}")]
    HessianDimMismatch { expected: usize, found: (usize, usize) },

    #[error("invalid Hessian at ({row}, {col}): {value}, must be finite")]
    InvalidHessian { row: usize, col: usize, value: f64 },

    // ---- Fallback ----
    #[error("unknown error")]
    UnknownError,
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}
