//! Shared validation helpers for process configuration.
use std::collections::HashMap;

use crate::{
    processes::errors::{ProcessError, ProcessResult},
    utils::PROPORTION_TOLERANCE,
};

/// Broadcast a single value to `n` entries, or require exactly `n`.
pub fn broadcast(
    values: &[f64], n: usize, process: &str, parameter: &'static str,
) -> ProcessResult<Vec<f64>> {
    match values.len() {
        1 => Ok(vec![values[0]; n]),
        len if len == n => Ok(values.to_vec()),
        len => Err(ProcessError::LengthMismatch {
            process: process.to_string(),
            parameter,
            expected: n,
            found: len,
        }),
    }
}

/// Same as [`broadcast`], for labels.
pub fn broadcast_labels(
    labels: &[String], n: usize, process: &str, parameter: &'static str,
) -> ProcessResult<Vec<String>> {
    match labels.len() {
        1 => Ok(vec![labels[0].clone(); n]),
        len if len == n => Ok(labels.to_vec()),
        len => Err(ProcessError::LengthMismatch {
            process: process.to_string(),
            parameter,
            expected: n,
            found: len,
        }),
    }
}

/// Map each assigned time step to its share of the annual rate.
///
/// An empty `proportions` list means `1.0` in every assigned step; a given
/// list must sum to one.
pub fn time_step_ratios(
    process: &str, proportions: &[f64], assigned: &[usize],
) -> ProcessResult<HashMap<usize, f64>> {
    if proportions.is_empty() {
        return Ok(assigned.iter().map(|t| (*t, 1.0)).collect());
    }
    if proportions.len() != assigned.len() {
        return Err(ProcessError::LengthMismatch {
            process: process.to_string(),
            parameter: "time_step_proportions",
            expected: assigned.len(),
            found: proportions.len(),
        });
    }
    if let Some(bad) = proportions.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(ProcessError::InvalidParameter {
            process: process.to_string(),
            parameter: "time_step_proportions",
            reason: format!("{bad} is outside [0, 1]"),
        });
    }
    check_sums_to_one(process, "time_step_proportions", proportions)?;
    Ok(assigned.iter().copied().zip(proportions.iter().copied()).collect())
}

/// Require `values` to sum to one within tolerance.
pub fn check_sums_to_one(process: &str, parameter: &'static str, values: &[f64]) -> ProcessResult<()> {
    let total: f64 = values.iter().sum();
    if (total - 1.0).abs() > PROPORTION_TOLERANCE {
        return Err(ProcessError::InvalidParameter {
            process: process.to_string(),
            parameter,
            reason: format!("values must sum to 1.0 but sum to {total}"),
        });
    }
    Ok(())
}

/// Require every value to be in `[lo, hi]`.
pub fn check_range(
    process: &str, parameter: &'static str, values: &[f64], lo: f64, hi: f64,
) -> ProcessResult<()> {
    if let Some(bad) = values.iter().find(|v| **v < lo || **v > hi) {
        return Err(ProcessError::InvalidParameter {
            process: process.to_string(),
            parameter,
            reason: format!("{bad} is outside [{lo}, {hi}]"),
        });
    }
    Ok(())
}

/// Vector addressable that also answers to the bare name when it holds a
/// single value.
pub fn vector_or_scalar<'a>(values: &'a mut [f64], index: Option<&str>) -> Option<&'a mut f64> {
    match index {
        None if values.len() == 1 => values.first_mut(),
        None => None,
        Some(_) => crate::model::objects::vector_element(values, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Single values broadcast; mismatched lists are rejected.
    //
    // Given
    // -----
    // - [0.5] to 3, and [1, 2] to 3.
    //
    // Expect
    // ------
    // - [0.5; 3] and `LengthMismatch`.
    fn broadcast_expands_or_rejects() {
        // Act
        let ok = broadcast(&[0.5], 3, "p", "m").unwrap();
        let err = broadcast(&[1.0, 2.0], 3, "p", "m").unwrap_err();

        // Assert
        assert_eq!(ok, vec![0.5; 3]);
        match err {
            ProcessError::LengthMismatch { expected, found, .. } => {
                assert_eq!((expected, found), (3, 2))
            }
            other => panic!("expected LengthMismatch, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Time step ratios default to one and are range checked.
    //
    // Given
    // -----
    // - No proportions for steps [0, 1]; then [0.5, 1.5].
    //
    // Expect
    // ------
    // - Both ratios 1.0; then `InvalidParameter`.
    fn time_step_ratios_default_and_validate() {
        // Act
        let ratios = time_step_ratios("p", &[], &[0, 1]).unwrap();
        let err = time_step_ratios("p", &[0.5, 1.5], &[0, 1]).unwrap_err();

        // Assert
        assert_eq!(ratios[&0], 1.0);
        assert_eq!(ratios[&1], 1.0);
        assert!(matches!(err, ProcessError::InvalidParameter { .. }));
    }
}
