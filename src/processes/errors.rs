//! Errors raised while validating, building, or executing processes.
use crate::{biology::errors::BiologyError, partition::errors::PartitionError};

pub type ProcessResult<T> = Result<T, ProcessError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcessError {
    // ---- Configuration ----
    /// A parameter value is outside its valid domain.
    #[error("process[{process}].{parameter}: {reason}")]
    InvalidParameter { process: String, parameter: &'static str, reason: String },

    /// A per-category (or per-year) list has the wrong number of entries.
    #[error("process[{process}].{parameter}: expected {expected} values but got {found}")]
    LengthMismatch { process: String, parameter: &'static str, expected: usize, found: usize },

    /// A referenced object does not exist.
    #[error("process[{process}]: {kind} '{label}' is not defined")]
    UnknownLabel { process: String, kind: &'static str, label: String },

    /// The process cannot run on this partition structure.
    #[error("process[{process}] requires an age-structured partition")]
    RequiresAgePartition { process: String },

    // ---- Runtime ----
    /// Abundance went negative; exploitation exceeded 1 despite capping.
    #[error(
        "process[{process}] caused a negative partition: category {category}, slot {slot}, value {value}"
    )]
    NegativeAbundance { process: String, category: String, slot: usize, value: f64 },

    /// A derived quantity had no value for the requested year.
    #[error("process[{process}]: derived_quantity '{label}' has no value for year {year}")]
    MissingDerivedValue { process: String, label: String, year: u32 },

    // ---- Wrapped ----
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error(transparent)]
    Biology(#[from] BiologyError),
}
