//! Priors on relationships between estimable values.
//!
//! `element_difference` scores `multiplier * Σ (a_i - b_i)^2` over the
//! elements of two addressables of equal length, pulling two vectors
//! (for example male and female selectivity values) towards each other.
use std::collections::HashSet;

use serde::Deserialize;

use crate::model::{
    errors::{ModelError, ModelResult},
    objects::AddressableName,
};

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdditionalPriorConfig {
    ElementDifference {
        label: String,
        parameter: String,
        second_parameter: String,
        #[serde(default = "one")]
        multiplier: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdditionalPrior {
    label: String,
    multiplier: f64,
    first: Vec<AddressableName>,
    second: Vec<AddressableName>,
}

impl AdditionalPrior {
    /// Parse and expand both parameters.
    ///
    /// Errors
    /// ------
    /// - `InvalidAddressable` for a malformed parameter.
    /// - `Config` when the two parameters expand to different lengths.
    pub fn new(config: &AdditionalPriorConfig) -> ModelResult<Self> {
        let AdditionalPriorConfig::ElementDifference { label, parameter, second_parameter, multiplier } = config;
        let first = AddressableName::parse(parameter)?.expand_indices()?;
        let second = AddressableName::parse(second_parameter)?.expand_indices()?;
        if first.len() != second.len() {
            return Err(ModelError::config(
                format!("additional_prior[{label}].second_parameter"),
                format!("has {} elements but parameter has {}", second.len(), first.len()),
            ));
        }
        Ok(Self { label: label.clone(), multiplier: *multiplier, first, second })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn first(&self) -> &[AddressableName] {
        &self.first
    }

    pub fn second(&self) -> &[AddressableName] {
        &self.second
    }

    pub fn targets(&self) -> impl Iterator<Item = &AddressableName> {
        self.first.iter().chain(&self.second)
    }

    /// Score for the current element values of both parameters.
    pub fn score(&self, first: &[f64], second: &[f64]) -> f64 {
        self.multiplier * first.iter().zip(second).map(|(a, b)| (a - b).powi(2)).sum::<f64>()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdditionalPriors {
    items: Vec<AdditionalPrior>,
}

impl AdditionalPriors {
    pub fn new(configs: &[AdditionalPriorConfig]) -> ModelResult<Self> {
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(configs.len());
        for config in configs {
            let prior = AdditionalPrior::new(config)?;
            if !seen.insert(prior.label.clone()) {
                return Err(ModelError::config(
                    format!("additional_prior[{}]", prior.label),
                    "has been defined more than once",
                ));
            }
            items.push(prior);
        }
        Ok(Self { items })
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdditionalPrior> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Element difference scores and index expansion.
    // - Rejection of mismatched lengths and repeated labels.
    //
    // They intentionally DO NOT cover:
    // - Value lookup against a model (see the model runner tests).
    // -------------------------------------------------------------------------

    fn config(label: &str, first: &str, second: &str, multiplier: f64) -> AdditionalPriorConfig {
        let json = format!(
            r#"{{"type": "element_difference", "label": "{label}", "parameter": "{first}",
                "second_parameter": "{second}", "multiplier": {multiplier}}}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The score is the scaled sum of squared element differences.
    //
    // Given
    // -----
    // - Two three-element vectors [1, 2, 3] and [1, 4, 0], multiplier 2.
    //
    // Expect
    // ------
    // - Three names per side and a score of 2 * (0 + 4 + 9) = 26.
    fn element_difference_scores_squared_differences() {
        // Arrange
        let prior = AdditionalPrior::new(&config(
            "sexes",
            "selectivity[male].v{1:3}",
            "selectivity[female].v{1:3}",
            2.0,
        ))
        .unwrap();

        // Act
        let score = prior.score(&[1.0, 2.0, 3.0], &[1.0, 4.0, 0.0]);

        // Assert
        assert_eq!(prior.first().len(), 3);
        assert_eq!(prior.second()[2].full_name(), "selectivity[female].v{3}");
        assert_eq!(prior.targets().count(), 6);
        assert!((score - 26.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Both parameters must have the same number of elements and labels
    // must be unique.
    //
    // Given
    // -----
    // - `{1:3}` against `{1:2}`; then one valid prior defined twice.
    //
    // Expect
    // ------
    // - `Config` errors naming second_parameter and the repeated label.
    fn rejects_mismatched_lengths_and_repeated_labels() {
        // Act
        let mismatch =
            AdditionalPrior::new(&config("sexes", "selectivity[male].v{1:3}", "selectivity[female].v{1:2}", 1.0))
                .unwrap_err();
        let valid = config("sexes", "selectivity[male].v{1}", "selectivity[female].v{1}", 1.0);
        let repeated = AdditionalPriors::new(&[valid.clone(), valid]).unwrap_err();

        // Assert
        match mismatch {
            ModelError::Config { parameter, .. } => assert_eq!(parameter, "additional_prior[sexes].second_parameter"),
            other => panic!("expected Config, got {other:?}"),
        }
        assert!(matches!(repeated, ModelError::Config { .. }), "{repeated:?}");
    }
}
