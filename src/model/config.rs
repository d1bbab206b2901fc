//! model::config — the deserialisable description of a whole model.
//!
//! One [`ModelConfig`] carries every block the model builds from. Blocks
//! that are lists default to empty; `model` and `categories` are
//! required.
use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    biology::{AgeLengthConfig, AgeingErrorConfig, LengthWeightConfig, SelectivityConfig},
    estimate_transformations::TransformationConfig,
    estimates::EstimateConfig,
    likelihoods::LikelihoodConfig,
    mcmc::McmcConfig,
    model::{
        derived_quantities::DerivedQuantityConfig,
        errors::{ModelError, ModelResult},
    },
    objective::{AdditionalPriorConfig, AssertConfig},
    observations::{CatchabilityConfig, ObservationConfig},
    optimization::MinimiserConfig,
    partition::{CategoriesConfig, PartitionStructure},
    penalties::PenaltyConfig,
    processes::ProcessConfig,
};

fn default_min_age() -> u32 {
    1
}

fn default_max_age() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

fn default_start_year() -> u32 {
    1994
}

fn default_final_year() -> u32 {
    2008
}

fn default_seed() -> u64 {
    crate::rng::DEFAULT_SEED
}

/// Partition shape and model years.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelStructureConfig {
    #[serde(rename = "type", default)]
    pub structure: PartitionStructure,
    #[serde(default = "default_min_age")]
    pub min_age: u32,
    #[serde(default = "default_max_age")]
    pub max_age: u32,
    #[serde(default = "default_true")]
    pub plus_group: bool,
    #[serde(default = "default_start_year")]
    pub start_year: u32,
    #[serde(default = "default_final_year")]
    pub final_year: u32,
    /// Lower edges of the length bins (length models only).
    #[serde(default)]
    pub length_bins: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeStepConfig {
    pub label: String,
    /// Process labels in execution order.
    pub processes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InitialisationPhaseConfig {
    /// Run the annual cycle `years` times at the start year.
    Iterative {
        label: String,
        years: u32,
        #[serde(default)]
        exclude_processes: Vec<String>,
    },
}

impl InitialisationPhaseConfig {
    pub fn label(&self) -> &str {
        match self {
            Self::Iterative { label, .. } => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    pub model: ModelStructureConfig,
    pub categories: CategoriesConfig,
    pub time_steps: Vec<TimeStepConfig>,
    #[serde(default)]
    pub initialisation_phases: Vec<InitialisationPhaseConfig>,
    #[serde(default)]
    pub selectivities: Vec<SelectivityConfig>,
    #[serde(default)]
    pub age_lengths: Vec<AgeLengthConfig>,
    #[serde(default)]
    pub length_weights: Vec<LengthWeightConfig>,
    #[serde(default)]
    pub ageing_errors: Vec<AgeingErrorConfig>,
    pub processes: Vec<ProcessConfig>,
    #[serde(default)]
    pub derived_quantities: Vec<DerivedQuantityConfig>,
    #[serde(default)]
    pub penalties: Vec<PenaltyConfig>,
    #[serde(default)]
    pub likelihoods: Vec<LikelihoodConfig>,
    #[serde(default)]
    pub catchabilities: Vec<CatchabilityConfig>,
    #[serde(default)]
    pub observations: Vec<ObservationConfig>,
    #[serde(default)]
    pub estimates: Vec<EstimateConfig>,
    #[serde(default)]
    pub estimate_transformations: Vec<TransformationConfig>,
    #[serde(default)]
    pub additional_priors: Vec<AdditionalPriorConfig>,
    #[serde(default)]
    pub asserts: Vec<AssertConfig>,
    #[serde(default)]
    pub minimiser: MinimiserConfig,
    #[serde(default)]
    pub mcmc: McmcConfig,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl ModelConfig {
    pub fn from_json_str(text: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> ModelResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| ModelError::Io { path: path.display().to_string(), reason: e.to_string() })?;
        Self::from_json_str(&text)
    }

    /// Model years, `start_year..=final_year`.
    ///
    /// Errors
    /// ------
    /// - `Config` when `final_year < start_year`.
    pub fn years(&self) -> ModelResult<Vec<u32>> {
        let (start, end) = (self.model.start_year, self.model.final_year);
        if end < start {
            return Err(ModelError::config("model.final_year", format!("{end} is before start_year {start}")));
        }
        Ok((start..=end).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Defaults of an almost-empty configuration.
    // - Year range validation and file errors.
    // -------------------------------------------------------------------------

    const MINIMAL: &str = r#"{
        "model": {},
        "categories": {"names": ["stock"]},
        "time_steps": [{"label": "step1", "processes": ["ageing"]}],
        "processes": [{"type": "ageing", "label": "ageing", "categories": ["stock"]}]
    }"#;

    #[test]
    // Purpose
    // -------
    // A minimal configuration fills every default.
    //
    // Given
    // -----
    // - Model, one category, one time step, one process.
    //
    // Expect
    // ------
    // - Ages 1..50 with plus group, years 1994..2008, empty optional blocks.
    fn minimal_config_defaults() {
        // Act
        let config = ModelConfig::from_json_str(MINIMAL).unwrap();

        // Assert
        assert_eq!(config.model.structure, PartitionStructure::Age);
        assert_eq!((config.model.min_age, config.model.max_age), (1, 50));
        assert!(config.model.plus_group);
        assert_eq!(config.years().unwrap().len(), 15);
        assert!(config.estimates.is_empty());
        assert!(config.initialisation_phases.is_empty());
        assert_eq!(config.minimiser, MinimiserConfig::default());
    }

    #[test]
    // Purpose
    // -------
    // Inverted years, bad JSON and missing files are reported.
    //
    // Given
    // -----
    // - final_year 1990 with start 1994; "{"; a path that does not exist.
    //
    // Expect
    // ------
    // - `Config`, `Json` and `Io` errors.
    fn config_errors_are_reported() {
        // Arrange
        let mut config = ModelConfig::from_json_str(MINIMAL).unwrap();
        config.model.final_year = 1990;

        // Act / Assert
        assert!(matches!(config.years(), Err(ModelError::Config { .. })));
        assert!(matches!(ModelConfig::from_json_str("{"), Err(ModelError::Json { .. })));
        let missing = ModelConfig::from_json_file(Path::new("/nonexistent/model.json"));
        assert!(matches!(missing, Err(ModelError::Io { .. })));
    }
}
