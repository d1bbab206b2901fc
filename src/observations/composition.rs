//! Age-composition helpers shared by the at-age observation types.
//!
//! Observed rows are laid out collection-major: for `C` category
//! collections and `A = max_age - min_age + 1` ages, each year holds
//! `C * A` values and collection `c` owns `[c*A, (c+1)*A)`. Error rows hold
//! one value (broadcast) or `C * A`.
use std::collections::BTreeMap;

use crate::{
    likelihoods::Comparison,
    observations::errors::{ObservationError, ObservationResult},
    partition::Category,
};

/// Observed age range and whether the last age absorbs older fish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeRange {
    pub min_age: u32,
    pub max_age: u32,
    pub plus_group: bool,
}

impl AgeRange {
    /// Errors
    /// ------
    /// - `InvalidParameter` when the range is empty or leaves the model's.
    pub fn new(
        observation: &str, min_age: u32, max_age: u32, plus_group: bool, model_min: u32, model_max: u32,
    ) -> ObservationResult<Self> {
        if min_age > max_age || min_age < model_min || max_age > model_max {
            return Err(ObservationError::InvalidParameter {
                observation: observation.to_string(),
                parameter: "min_age",
                reason: format!("ages {min_age}..={max_age} must lie inside the model's {model_min}..={model_max}"),
            });
        }
        Ok(Self { min_age, max_age, plus_group })
    }

    pub fn len(&self) -> usize {
        (self.max_age - self.min_age + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Fold per-slot values of `category` into the observed bins.
    ///
    /// Ages below `min_age` are dropped; ages above `max_age` go into the
    /// last bin when `plus_group`, otherwise they are dropped.
    pub fn collapse(&self, category: &Category, values: &[f64], out: &mut [f64]) {
        for (slot, value) in values.iter().enumerate() {
            let age = category.min_age + slot as u32;
            if age < self.min_age {
                continue;
            }
            if age > self.max_age {
                if self.plus_group {
                    out[self.len() - 1] += value;
                }
                continue;
            }
            out[(age - self.min_age) as usize] += value;
        }
    }
}

/// Validated observed proportions and error values by year.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositionTable {
    pub observed: BTreeMap<u32, Vec<f64>>,
    pub errors: BTreeMap<u32, Vec<f64>>,
}

impl CompositionTable {
    /// Check shapes and that every collection sums to one within
    /// `tolerance`, then rescale each collection to sum to exactly one.
    ///
    /// Errors
    /// ------
    /// - `LengthMismatch` for a row of the wrong size or an error table
    ///   whose years differ from the observed years.
    /// - `InvalidParameter` for negative values, non-positive errors, or a
    ///   collection outside tolerance.
    pub fn new(
        observation: &str, observed: &BTreeMap<u32, Vec<f64>>, errors: &BTreeMap<u32, Vec<f64>>,
        collections: usize, ages: usize, tolerance: f64,
    ) -> ObservationResult<Self> {
        let width = collections * ages;
        let invalid = |parameter: &'static str, reason: String| ObservationError::InvalidParameter {
            observation: observation.to_string(),
            parameter,
            reason,
        };
        if errors.len() != observed.len() || errors.keys().ne(observed.keys()) {
            return Err(ObservationError::LengthMismatch {
                observation: observation.to_string(),
                parameter: "error_values",
                expected: observed.len(),
                found: errors.len(),
            });
        }
        let mut table = Self::default();
        for (year, row) in observed {
            if row.len() != width {
                return Err(ObservationError::LengthMismatch {
                    observation: observation.to_string(),
                    parameter: "obs",
                    expected: width,
                    found: row.len(),
                });
            }
            if row.iter().any(|v| *v < 0.0) {
                return Err(invalid("obs", format!("negative proportion in {year}")));
            }
            let mut row = row.clone();
            for (c, chunk) in row.chunks_mut(ages).enumerate() {
                let total: f64 = chunk.iter().sum();
                if (total - 1.0).abs() > tolerance {
                    return Err(invalid(
                        "obs",
                        format!("collection {} in {year} sums to {total}, not 1 within {tolerance}", c + 1),
                    ));
                }
                chunk.iter_mut().for_each(|v| *v /= total);
            }
            table.observed.insert(*year, row);

            let error_row = &errors[year];
            let error_row = match error_row.len() {
                1 => vec![error_row[0]; width],
                n if n == width => error_row.clone(),
                found => {
                    return Err(ObservationError::LengthMismatch {
                        observation: observation.to_string(),
                        parameter: "error_values",
                        expected: width,
                        found,
                    });
                }
            };
            if error_row.iter().any(|e| *e <= 0.0) {
                return Err(invalid("error_values", format!("non-positive error value in {year}")));
            }
            table.errors.insert(*year, error_row);
        }
        Ok(table)
    }

    pub fn years(&self) -> Vec<u32> {
        self.observed.keys().copied().collect()
    }

    /// Comparisons for `year` from collapsed expected numbers, one row of
    /// `ages` values per collection. Expected rows are normalised to sum
    /// to one; an empty row stays zero.
    pub fn comparisons(
        &self, year: u32, labels: &[String], expected: &[Vec<f64>], range: AgeRange, error_multiplier: f64,
        process_error: f64, delta: f64,
    ) -> Vec<Comparison> {
        let ages = range.len();
        let (Some(observed), Some(errors)) = (self.observed.get(&year), self.errors.get(&year)) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(labels.len() * ages);
        for (c, (label, row)) in labels.iter().zip(expected).enumerate() {
            let total: f64 = row.iter().sum();
            for (a, value) in row.iter().enumerate() {
                let i = c * ages + a;
                let expected = if total > 0.0 { value / total } else { 0.0 };
                out.push(
                    Comparison::new(label, expected, observed[i], errors[i] * error_multiplier, process_error, delta)
                        .with_age(range.min_age + a as u32),
                );
            }
        }
        out
    }
}
