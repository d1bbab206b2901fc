//! Errors raised while building estimates, priors or estimate vectors.
pub type EstimateResult<T> = Result<T, EstimateError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimateError {
    // ---- Configuration ----
    /// The parameter string could not be parsed or expanded.
    #[error("estimate '{label}': parameter '{parameter}' is invalid: {reason}")]
    InvalidParameter { label: String, parameter: String, reason: String },

    /// `lower_bound > upper_bound`, or a bound list of the wrong size.
    #[error("estimate '{label}': {reason}")]
    InvalidBounds { label: String, reason: String },

    /// Prior hyper-parameters outside their domain.
    #[error("estimate '{label}': prior {prior}: {reason}")]
    InvalidPrior { label: String, prior: &'static str, reason: String },

    /// Two estimate blocks share a label.
    #[error("estimate '{label}' has been defined more than once")]
    DuplicateLabel { label: String },

    /// A target is estimated twice, directly or through `same`.
    #[error("the parameter '{parameter}' is estimated more than once")]
    DuplicateParameter { parameter: String },

    /// Flags that cannot be combined.
    #[error("estimate '{label}': {reason}")]
    InconsistentFlags { label: String, reason: &'static str },

    /// A label used by a transformation or addressable was not found.
    #[error("estimate '{label}' is not defined")]
    UnknownEstimate { label: String },

    // ---- Runtime ----
    /// Current value outside `[lower_bound, upper_bound]`.
    #[error("estimate '{parameter}': value {value} is outside the bounds [{lower}, {upper}]")]
    OutOfBounds { parameter: String, value: f64, lower: f64, upper: f64 },

    /// Candidate vector length does not match the free estimates.
    #[error("expected {expected} estimate values, found {found}")]
    ValueCount { expected: usize, found: usize },
}
