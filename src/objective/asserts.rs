//! Post-run consistency checks on the objective and the partition.
//!
//! An `error` assert that fails aborts with `ModelError::AssertFailed`; a
//! `warning` assert logs and the run continues.
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    model::errors::{ModelError, ModelResult},
    partition::Partition,
};

fn default_tol() -> f64 {
    1e-5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Warning,
    #[default]
    Error,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssertConfig {
    ObjectiveFunction {
        label: String,
        value: f64,
        #[serde(default = "default_tol")]
        tol: f64,
        #[serde(default)]
        error_type: ErrorType,
    },
    /// Numbers at age of one category at the end of a time step.
    Partition {
        label: String,
        category: String,
        year: u32,
        time_step: String,
        values: Vec<f64>,
        #[serde(default = "default_tol")]
        tol: f64,
        #[serde(default)]
        error_type: ErrorType,
    },
}

impl AssertConfig {
    pub fn label(&self) -> &str {
        match self {
            AssertConfig::ObjectiveFunction { label, .. } | AssertConfig::Partition { label, .. } => label,
        }
    }

    fn error_type(&self) -> ErrorType {
        match self {
            AssertConfig::ObjectiveFunction { error_type, .. } | AssertConfig::Partition { error_type, .. } => {
                *error_type
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Asserts {
    configs: Vec<AssertConfig>,
    /// Resolved time-step index per partition assert.
    time_steps: Vec<Option<usize>>,
}

impl Asserts {
    pub fn new(configs: &[AssertConfig]) -> Self {
        Self { configs: configs.to_vec(), time_steps: vec![None; configs.len()] }
    }

    /// Resolve time steps and check categories and value counts.
    ///
    /// Errors
    /// ------
    /// - `UnknownObject` for an unknown time step or category.
    /// - `Config` when a partition assert's values do not cover the
    ///   category's ages, or its year lies outside the model.
    pub fn build(&mut self, time_steps: &[String], partition: &Partition, years: &[u32]) -> ModelResult<()> {
        for (config, slot) in self.configs.iter().zip(self.time_steps.iter_mut()) {
            let AssertConfig::Partition { label, category, year, time_step, values, .. } = config else {
                continue;
            };
            let index = time_steps.iter().position(|t| t == time_step).ok_or_else(|| ModelError::UnknownObject {
                kind: "time_step",
                label: time_step.clone(),
            })?;
            let width = partition
                .category(category)
                .map_err(|_| ModelError::UnknownObject { kind: "category", label: category.clone() })?
                .data
                .len();
            if values.len() != width {
                return Err(ModelError::config(
                    format!("assert[{label}].values"),
                    format!("expected {width} values, found {}", values.len()),
                ));
            }
            if !years.contains(year) {
                return Err(ModelError::config(format!("assert[{label}].year"), format!("{year} is not a model year")));
            }
            *slot = Some(index);
        }
        Ok(())
    }

    /// Check partition asserts due at the end of `time_step` in `year`.
    pub fn check_partition(&self, partition: &Partition, year: u32, time_step: usize) -> ModelResult<()> {
        for (config, slot) in self.configs.iter().zip(&self.time_steps) {
            let AssertConfig::Partition { category, year: at, values, tol, .. } = config else {
                continue;
            };
            if *at != year || *slot != Some(time_step) {
                continue;
            }
            let data = &partition.category(category)?.data;
            if let Some((age, (got, want))) =
                data.iter().zip(values).enumerate().find(|(_, (got, want))| (*got - *want).abs() > *tol)
            {
                report(
                    config,
                    format!("{category} in {year}: slot {age} is {got}, expected {want} within {tol}"),
                )?;
            }
        }
        Ok(())
    }

    /// Check objective asserts against the final score.
    pub fn check_objective(&self, score: f64) -> ModelResult<()> {
        for config in &self.configs {
            let AssertConfig::ObjectiveFunction { value, tol, .. } = config else {
                continue;
            };
            if (score - value).abs() > *tol {
                report(config, format!("objective function is {score}, expected {value} within {tol}"))?;
            } else {
                info!(assert = %config.label(), score, "objective function assert passed");
            }
        }
        Ok(())
    }
}

fn report(config: &AssertConfig, reason: String) -> ModelResult<()> {
    match config.error_type() {
        ErrorType::Error => Err(ModelError::AssertFailed { label: config.label().to_string(), reason }),
        ErrorType::Warning => {
            warn!(assert = %config.label(), "{reason}");
            Ok(())
        }
    }
}
