//! partition::categories — category definitions and label short-hand.
//!
//! Purpose
//! -------
//! Hold the configured category list (names, the dot separated naming
//! format, per-category age-length and active years) and expand the label
//! short-hand accepted anywhere a list of categories is configured.
//!
//! Key behaviors
//! -------------
//! - `"*"` expands to every category as separate labels.
//! - `"*+"` expands to a single combined label joining every category
//!   with `+`.
//! - `"sex=male"` / `"sex=male,female"` select categories whose `sex` piece
//!   of the format matches one of the listed values.
//! - `"format=*.male"` matches every piece of the format, with `*` as a
//!   wildcard.
//! - Any short-hand ending in `+` yields one combined label instead of a
//!   list.
//!
//! Invariants & assumptions
//! ------------------------
//! - Category names are unique.
//! - When a format is configured, every name splits into exactly as many
//!   `.` separated pieces as the format.
use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::partition::errors::{PartitionError, PartitionResult};

/// Category block of the model configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CategoriesConfig {
    #[serde(default)]
    pub format: String,
    pub names: Vec<String>,
    /// Either empty, or one age-length label per category (`""` for none).
    #[serde(default)]
    pub age_lengths: Vec<String>,
    /// Optional restriction of a category to a subset of model years.
    #[serde(default)]
    pub years: BTreeMap<String, Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInfo {
    pub name: String,
    pub age_length: Option<String>,
    /// Empty means every model year.
    pub years: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Categories {
    format: String,
    infos: Vec<CategoryInfo>,
    index: HashMap<String, usize>,
}

impl Categories {
    /// Validate the category block and build the lookup table.
    ///
    /// Errors
    /// ------
    /// - `DuplicateCategory` for repeated names.
    /// - `FormatMismatch` when a name does not fit the format.
    /// - `AttributeLengthMismatch` when `age_lengths` is neither empty nor
    ///   one-per-category.
    /// - `UnknownCategory` when `years` names an undefined category.
    pub fn new(config: &CategoriesConfig) -> PartitionResult<Self> {
        if !config.age_lengths.is_empty() && config.age_lengths.len() != config.names.len() {
            return Err(PartitionError::AttributeLengthMismatch {
                parameter: "age_lengths",
                expected: config.names.len(),
                found: config.age_lengths.len(),
            });
        }
        let format_pieces = config.format.split('.').filter(|p| !p.is_empty()).count();
        let mut infos = Vec::with_capacity(config.names.len());
        let mut index = HashMap::with_capacity(config.names.len());
        for (i, name) in config.names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(PartitionError::DuplicateCategory { label: name.clone() });
            }
            if format_pieces > 0 && name.split('.').count() != format_pieces {
                return Err(PartitionError::FormatMismatch {
                    label: name.clone(),
                    format: config.format.clone(),
                });
            }
            let age_length = config
                .age_lengths
                .get(i)
                .filter(|label| !label.is_empty())
                .cloned();
            let years = config.years.get(name).cloned().unwrap_or_default();
            infos.push(CategoryInfo { name: name.clone(), age_length, years });
        }
        if let Some(unknown) = config.years.keys().find(|k| !index.contains_key(*k)) {
            return Err(PartitionError::UnknownCategory { label: unknown.clone() });
        }
        Ok(Self { format: config.format.clone(), infos, index })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn infos(&self) -> &[CategoryInfo] {
        &self.infos
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.infos.iter().map(|c| c.name.as_str())
    }

    pub fn is_valid(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// `true` when `label` groups several categories with `+`.
    pub fn is_combined_label(label: &str) -> bool {
        label.contains('+')
    }

    /// Expand each configured entry through the short-hand rules.
    ///
    /// `parameter` names the configuration field for error messages.
    pub fn expand_labels(&self, labels: &[String], parameter: &str) -> PartitionResult<Vec<String>> {
        let mut out = Vec::with_capacity(labels.len());
        for label in labels {
            for piece in label.split_whitespace() {
                out.extend(self.expand_one(piece, parameter)?);
            }
        }
        Ok(out)
    }

    // ---- Helper methods ----

    fn expand_one(&self, label: &str, parameter: &str) -> PartitionResult<Vec<String>> {
        match label {
            "*" => return Ok(self.names().map(str::to_string).collect()),
            "*+" => return Ok(vec![self.names().collect::<Vec<_>>().join("+")]),
            _ => {}
        }
        if let Some((lhs, rhs)) = label.split_once('=') {
            let (rhs, combine) = match rhs.strip_suffix('+') {
                Some(stripped) => (stripped, true),
                None => (rhs, false),
            };
            let matches = self.match_short_hand(label, lhs.trim(), rhs.trim())?;
            if matches.is_empty() {
                return Err(PartitionError::NoMatchingCategories {
                    expression: label.to_string(),
                    parameter: parameter.to_string(),
                });
            }
            return Ok(if combine { vec![matches.join("+")] } else { matches });
        }
        for piece in label.split('+') {
            if !self.is_valid(piece) {
                return Err(PartitionError::UnknownCategory { label: piece.to_string() });
            }
        }
        Ok(vec![label.to_string()])
    }

    fn match_short_hand(&self, expression: &str, lhs: &str, rhs: &str) -> PartitionResult<Vec<String>> {
        if self.format.is_empty() {
            return Err(PartitionError::InvalidShortHand {
                expression: expression.to_string(),
                reason: "short-hand selection requires a category format",
            });
        }
        let format: Vec<&str> = self.format.split('.').collect();
        if lhs == "format" {
            let pattern: Vec<&str> = rhs.split('.').collect();
            if pattern.len() != format.len() {
                return Err(PartitionError::InvalidShortHand {
                    expression: expression.to_string(),
                    reason: "format pattern must have one piece per format chunk",
                });
            }
            let matches = self
                .names()
                .filter(|name| {
                    name.split('.').zip(&pattern).all(|(piece, pat)| {
                        *pat == "*" || pat.split(',').any(|alt| alt.trim() == piece)
                    })
                })
                .map(str::to_string)
                .collect();
            return Ok(matches);
        }
        let chunk = format.iter().position(|c| *c == lhs).ok_or_else(|| {
            PartitionError::UnknownFormatChunk { chunk: lhs.to_string(), format: self.format.clone() }
        })?;
        let values: Vec<&str> = rhs.split(',').map(str::trim).collect();
        Ok(self
            .names()
            .filter(|name| name.split('.').nth(chunk).is_some_and(|piece| values.contains(&piece)))
            .map(str::to_string)
            .collect())
    }
}
