//! Errors raised while building or querying the partition and its accessors.

/// Result alias for partition operations.
pub type PartitionResult<T> = Result<T, PartitionError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PartitionError {
    // ---- Category definitions ----
    /// Category label referenced but never defined.
    #[error("category '{label}' is not defined")]
    UnknownCategory { label: String },

    /// Category defined more than once.
    #[error("category '{label}' has been defined more than once")]
    DuplicateCategory { label: String },

    /// Category label does not split into the configured format pieces.
    #[error("category '{label}' does not match the format '{format}'")]
    FormatMismatch { label: String, format: String },

    /// A category short-hand expression matched nothing.
    #[error("the category short-hand '{expression}' in {parameter} did not match any categories")]
    NoMatchingCategories { expression: String, parameter: String },

    /// Short-hand used a format chunk name that does not exist.
    #[error("'{chunk}' is not a piece of the category format '{format}'")]
    UnknownFormatChunk { chunk: String, format: String },

    /// Malformed short-hand expression.
    #[error("invalid category short-hand '{expression}': {reason}")]
    InvalidShortHand { expression: String, reason: &'static str },

    /// Per-category attribute list has the wrong length.
    #[error("{parameter} has {found} entries but there are {expected} categories")]
    AttributeLengthMismatch { parameter: &'static str, expected: usize, found: usize },

    // ---- Dimensions ----
    /// Age range or length bins are unusable.
    #[error("invalid partition dimensions: {reason}")]
    InvalidDimensions { reason: String },

    /// Category referenced an age-length that has not been defined.
    #[error("category '{category}' references age_length '{age_length}' which is not defined")]
    UnknownAgeLength { category: String, age_length: String },

    /// Age outside the model age range.
    #[error("age {age} is outside the model age range [{min_age}, {max_age}]")]
    AgeOutOfRange { age: u32, min_age: u32, max_age: u32 },

    // ---- Data ----
    /// Supplied data vector does not match the partition width.
    #[error("category '{label}' expects {expected} values but {found} were supplied")]
    DataLengthMismatch { label: String, expected: usize, found: usize },
}
