//! Errors for selectivity, growth and ageing error evaluators.

pub type BiologyResult<T> = Result<T, BiologyError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BiologyError {
    // ---- Parameters ----
    /// A shape parameter is outside its valid domain.
    #[error("{label}.{parameter} = {value} is invalid: {reason}")]
    InvalidParameter { label: String, parameter: &'static str, value: f64, reason: &'static str },

    /// Per-slot values do not match the partition width.
    #[error("{label} supplies {found} values but the partition has {expected} slots")]
    ValuesLengthMismatch { label: String, expected: usize, found: usize },

    // ---- Lookups ----
    /// Selectivity label not defined.
    #[error("selectivity '{label}' is not defined")]
    UnknownSelectivity { label: String },

    /// Age-length label not defined.
    #[error("age_length '{label}' is not defined")]
    UnknownAgeLength { label: String },

    /// Length-weight label not defined.
    #[error("length_weight '{label}' is not defined")]
    UnknownLengthWeight { label: String },

    /// Ageing error label not defined.
    #[error("ageing_error '{label}' is not defined")]
    UnknownAgeingError { label: String },

    /// Object defined twice.
    #[error("{kind} '{label}' has been defined more than once")]
    DuplicateLabel { kind: &'static str, label: String },
}
