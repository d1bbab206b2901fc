//! Beverton-Holt recruitment.
//!
//! Purpose
//! -------
//! Add `R = R0 * SR * YCS` recruits at the recruitment age, where the
//! stock-recruit multiplier is driven by spawning biomass relative to B0.
//!
//! Key behaviors
//! -------------
//! - `SR = ratio / (1 - (5h - 1)/(4h) * (1 - ratio))` with
//!   `ratio = SSB(year - ssb_offset) / B0`.
//! - B0 is the final value of the SSB derived quantity in the selected
//!   initialisation phase (the last phase by default).
//! - During initialisation recruitment is `R0`.
//!
//! Conventions
//! -----------
//! - `ycs_years` are spawning years (`year - ssb_offset`); they default to
//!   the model years shifted by the offset, with every YCS value `1.0`.
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    model::objects::{Addressable, scalar, vector_element, year_element},
    partition::{CategoriesAccessor, PartitionStructure},
    processes::{
        BuildContext, ExecutionContext, Process, ProcessType, common,
        errors::{ProcessError, ProcessResult},
    },
};

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecruitmentBevertonHoltConfig {
    pub label: String,
    pub categories: Vec<String>,
    pub proportions: Vec<f64>,
    pub r0: f64,
    #[serde(default = "one")]
    pub steepness: f64,
    /// Label of the spawning biomass derived quantity.
    pub ssb: String,
    /// Defaults to the recruitment age.
    #[serde(default)]
    pub ssb_offset: Option<u32>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub ycs_years: Vec<u32>,
    #[serde(default)]
    pub ycs_values: Vec<f64>,
    #[serde(default)]
    pub b0_phase: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecruitmentBevertonHolt {
    config: RecruitmentBevertonHoltConfig,
    labels: Vec<String>,
    accessor: CategoriesAccessor,
    slot: usize,
    ssb_offset: u32,
    ycs: BTreeMap<u32, f64>,
    ssb_index: usize,
    b0_phase: usize,
    recruitment: BTreeMap<u32, f64>,
}

impl RecruitmentBevertonHolt {
    pub fn new(config: RecruitmentBevertonHoltConfig) -> Self {
        Self {
            config,
            labels: Vec::new(),
            accessor: CategoriesAccessor::default(),
            slot: 0,
            ssb_offset: 0,
            ycs: BTreeMap::new(),
            ssb_index: 0,
            b0_phase: 0,
            recruitment: BTreeMap::new(),
        }
    }

    /// Recruits added by year in the last run.
    pub fn recruitment(&self) -> &BTreeMap<u32, f64> {
        &self.recruitment
    }

    fn invalid(&self, parameter: &'static str, reason: String) -> ProcessError {
        ProcessError::InvalidParameter { process: self.config.label.clone(), parameter, reason }
    }

    fn stock_recruit(&self, ratio: f64) -> f64 {
        let h = self.config.steepness;
        ratio / (1.0 - ((5.0 * h - 1.0) / (4.0 * h)) * (1.0 - ratio))
    }
}

impl Addressable for RecruitmentBevertonHolt {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match parameter {
            "r0" => scalar(&mut self.config.r0, index),
            "steepness" => scalar(&mut self.config.steepness, index),
            "proportions" => vector_element(&mut self.config.proportions, index),
            "ycs_values" => year_element(&mut self.ycs, index),
            _ => None,
        }
    }
}

impl Process for RecruitmentBevertonHolt {
    fn label(&self) -> &str {
        &self.config.label
    }

    fn process_type(&self) -> ProcessType {
        ProcessType::Recruitment
    }

    fn sub_type(&self) -> &'static str {
        "recruitment_beverton_holt"
    }

    fn validate(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        let label = self.config.label.clone();
        if ctx.partition.structure() != PartitionStructure::Age {
            return Err(ProcessError::RequiresAgePartition { process: label });
        }
        self.labels = ctx.categories.expand_labels(&self.config.categories, "categories")?;
        if self.config.proportions.len() != self.labels.len() {
            return Err(ProcessError::LengthMismatch {
                process: label,
                parameter: "proportions",
                expected: self.labels.len(),
                found: self.config.proportions.len(),
            });
        }
        common::check_sums_to_one(&label, "proportions", &self.config.proportions)?;
        if self.config.steepness < 0.2 || self.config.steepness > 1.0 {
            return Err(self.invalid("steepness", format!("{} is outside [0.2, 1.0]", self.config.steepness)));
        }
        if self.config.r0 <= 0.0 {
            return Err(self.invalid("r0", format!("{} must be positive", self.config.r0)));
        }

        let (min_age, max_age) = (ctx.partition.min_age(), ctx.partition.max_age());
        let age = self.config.age.unwrap_or(min_age);
        if age < min_age || age > max_age {
            return Err(self.invalid("age", format!("{age} is outside [{min_age}, {max_age}]")));
        }
        self.slot = (age - min_age) as usize;
        self.ssb_offset = self.config.ssb_offset.unwrap_or(age);

        let ycs_years: Vec<u32> = if self.config.ycs_years.is_empty() {
            ctx.years.iter().map(|y| y.saturating_sub(self.ssb_offset)).collect()
        } else {
            self.config.ycs_years.clone()
        };
        let ycs_values = if self.config.ycs_values.is_empty() {
            vec![1.0; ycs_years.len()]
        } else {
            common::broadcast(&self.config.ycs_values, ycs_years.len(), &label, "ycs_values")?
        };
        common::check_range(&label, "ycs_values", &ycs_values, 0.0, f64::INFINITY)?;
        self.ycs = ycs_years.into_iter().zip(ycs_values).collect();
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        self.accessor = CategoriesAccessor::new(ctx.partition, &self.labels)?;
        self.ssb_index = ctx.derived_quantities.index_of(&self.config.ssb).ok_or_else(|| {
            ProcessError::UnknownLabel {
                process: self.config.label.clone(),
                kind: "derived_quantity",
                label: self.config.ssb.clone(),
            }
        })?;
        self.b0_phase = match &self.config.b0_phase {
            Some(phase) => ctx.initialisation_phases.iter().position(|p| p == phase).ok_or_else(|| {
                ProcessError::UnknownLabel {
                    process: self.config.label.clone(),
                    kind: "initialisation_phase",
                    label: phase.clone(),
                }
            })?,
            None => ctx.initialisation_phases.len().saturating_sub(1),
        };
        Ok(())
    }

    fn reset(&mut self) {
        self.recruitment.clear();
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> ProcessResult<()> {
        let year = ctx.state.year;
        let total = if ctx.state.initialising() {
            self.config.r0
        } else {
            let dq = ctx.derived_quantities.get(self.ssb_index);
            let missing = |y: u32| ProcessError::MissingDerivedValue {
                process: self.config.label.clone(),
                label: self.config.ssb.clone(),
                year: y,
            };
            let spawn_year = year.saturating_sub(self.ssb_offset);
            let ssb = dq.value(spawn_year).ok_or_else(|| missing(spawn_year))?;
            let b0 = dq.initialisation_value(self.b0_phase).ok_or_else(|| missing(year))?;
            let ratio = ssb / b0;
            let ycs = self.ycs.get(&spawn_year).copied().unwrap_or(1.0);
            let recruits = self.config.r0 * self.stock_recruit(ratio) * ycs;
            self.recruitment.insert(year, recruits);
            recruits
        };

        let active: Vec<_> = self.accessor.active(ctx.partition, year).collect();
        for (i, id) in active {
            ctx.partition.get_mut(id).data[self.slot] += total * self.config.proportions[i];
        }
        Ok(())
    }
}
