//! Errors raised while building or applying estimate transformations.
pub type TransformationResult<T> = Result<T, TransformationError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformationError {
    // ---- Configuration ----
    #[error("estimate transformation '{label}' has been defined more than once")]
    DuplicateLabel { label: String },

    /// A referenced estimate block does not exist.
    #[error("estimate_transformation[{transformation}]: estimate '{estimate}' is not defined")]
    UnknownEstimate { transformation: String, estimate: String },

    /// The referenced block expands to the wrong number of estimates.
    #[error("estimate_transformation[{transformation}]: expected {expected} estimates, found {found}")]
    TargetCount { transformation: String, expected: &'static str, found: usize },

    /// Two transformations claim the same estimate.
    #[error("estimate '{estimate}' is targeted by both '{first}' and '{second}'")]
    SharedEstimate { estimate: String, first: String, second: String },

    /// The estimate and the transformation disagree on the Jacobian.
    #[error(
        "estimate_transformation[{transformation}]: transform_with_jacobian disagrees with estimate '{estimate}'"
    )]
    InconsistentJacobian { transformation: String, estimate: String },

    /// This transformation has no Jacobian.
    #[error("estimate_transformation[{transformation}]: a {kind} transformation cannot use transform_with_jacobian")]
    JacobianUnsupported { transformation: String, kind: &'static str },

    /// Bounds outside the transformation's domain.
    #[error("estimate_transformation[{transformation}]: {reason}")]
    InvalidBounds { transformation: String, reason: String },

    // ---- Runtime ----
    /// Current values unusable for the transformation.
    #[error("estimate_transformation[{transformation}]: {reason}")]
    InvalidValues { transformation: String, reason: String },

    /// A transformed value left its transformed-space bounds.
    #[error(
        "estimate_transformation[{transformation}]: transformed value {value} of '{parameter}' is outside [{lower}, {upper}]"
    )]
    OutOfBounds { transformation: String, parameter: String, value: f64, lower: f64, upper: f64 },
}
