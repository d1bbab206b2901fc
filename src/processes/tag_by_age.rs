//! tag_by_age — move tagged fish between categories.
//!
//! Purpose
//! -------
//! In each tagging year, take a known number of fish at each age from the
//! source categories and move the survivors of tagging into the paired
//! destination categories.
//!
//! Key behaviors
//! -------------
//! - The tagged count at an age is shared across source categories in
//!   proportion to `N * sel`; the exploitation at that age is
//!   `tagged / Σ N * sel`.
//! - Exploitation above `u_max` is capped and the penalty is triggered
//!   with the requested and achievable tag counts.
//! - The full tagged amount leaves the source; `amount * (1 - initial
//!   mortality)` arrives in the destination, with the initial mortality
//!   optionally shaped by a selectivity.
//! - Tag counts come from a `numbers` table, or from a `proportions` table
//!   scaled by `n` for that year.
//!
//! Invariants & assumptions
//! ------------------------
//! - `from` (after splitting `+` groups) and `to` pair up one to one.
//! - Each table row spans `min_age..=max_age`.
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    biology::SelectivityId,
    model::objects::{Addressable, scalar},
    partition::{CategoryId, Categories, PartitionStructure},
    penalties::PenaltyId,
    processes::{
        BuildContext, ExecutionContext, Process, ProcessType, common,
        errors::{ProcessError, ProcessResult},
    },
    utils::{DEFAULT_DELTA, zero_fun},
};

fn default_u_max() -> f64 {
    0.99
}

fn default_tolerance() -> f64 {
    1e-5
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagByAgeConfig {
    pub label: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub years: Vec<u32>,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    pub selectivities: Vec<String>,
    #[serde(default)]
    pub initial_mortality: f64,
    #[serde(default)]
    pub initial_mortality_selectivity: Option<String>,
    #[serde(default = "default_u_max")]
    pub u_max: f64,
    #[serde(default)]
    pub penalty: Option<String>,
    /// Numbers tagged by year, one value per age.
    #[serde(default, deserialize_with = "crate::utils::year_map")]
    pub numbers: BTreeMap<u32, Vec<f64>>,
    /// Proportions tagged by year, one value per age, scaled by `n`.
    #[serde(default, deserialize_with = "crate::utils::year_map")]
    pub proportions: BTreeMap<u32, Vec<f64>>,
    #[serde(default)]
    pub n: Vec<f64>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagByAge {
    config: TagByAgeConfig,
    from_labels: Vec<String>,
    to_labels: Vec<String>,
    first_slot: usize,
    numbers: BTreeMap<u32, Vec<f64>>,
    from: Vec<CategoryId>,
    to: Vec<CategoryId>,
    selectivities: Vec<SelectivityId>,
    initial_mortality_selectivity: Option<SelectivityId>,
    penalty: Option<PenaltyId>,
    tagged: BTreeMap<u32, BTreeMap<String, Vec<f64>>>,
}

impl TagByAge {
    pub fn new(config: TagByAgeConfig) -> Self {
        Self {
            config,
            from_labels: Vec::new(),
            to_labels: Vec::new(),
            first_slot: 0,
            numbers: BTreeMap::new(),
            from: Vec::new(),
            to: Vec::new(),
            selectivities: Vec::new(),
            initial_mortality_selectivity: None,
            penalty: None,
            tagged: BTreeMap::new(),
        }
    }

    /// Tags released into each destination category by year, after
    /// initial mortality.
    pub fn tagged(&self) -> &BTreeMap<u32, BTreeMap<String, Vec<f64>>> {
        &self.tagged
    }

    fn invalid(&self, parameter: &'static str, reason: String) -> ProcessError {
        ProcessError::InvalidParameter { process: self.config.label.clone(), parameter, reason }
    }

    fn split_from(&self, categories: &Categories) -> ProcessResult<Vec<String>> {
        let mut out = Vec::new();
        for label in categories.expand_labels(&self.config.from, "from")? {
            out.extend(label.split('+').map(str::to_string));
        }
        Ok(out)
    }

    fn check_table(&self, parameter: &'static str, table: &BTreeMap<u32, Vec<f64>>, spread: usize) -> ProcessResult<()> {
        for (year, row) in table {
            if !self.config.years.contains(year) {
                return Err(self.invalid(parameter, format!("year {year} is not one of the process years")));
            }
            if row.len() != spread {
                return Err(ProcessError::LengthMismatch {
                    process: self.config.label.clone(),
                    parameter,
                    expected: spread,
                    found: row.len(),
                });
            }
            common::check_range(&self.config.label, parameter, row, 0.0, f64::INFINITY)?;
        }
        if let Some(year) = self.config.years.iter().find(|y| !table.contains_key(y)) {
            return Err(self.invalid(parameter, format!("no row for year {year}")));
        }
        Ok(())
    }
}

impl Addressable for TagByAge {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match parameter {
            "u_max" => scalar(&mut self.config.u_max, index),
            "initial_mortality" => scalar(&mut self.config.initial_mortality, index),
            _ => None,
        }
    }
}

impl Process for TagByAge {
    fn label(&self) -> &str {
        &self.config.label
    }

    fn process_type(&self) -> ProcessType {
        ProcessType::Tagging
    }

    fn sub_type(&self) -> &'static str {
        "tag_by_age"
    }

    fn validate(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        let label = self.config.label.clone();
        if ctx.partition.structure() != PartitionStructure::Age {
            return Err(ProcessError::RequiresAgePartition { process: label });
        }
        let (model_min, model_max) = (ctx.partition.min_age(), ctx.partition.max_age());
        let min_age = self.config.min_age.unwrap_or(model_min);
        let max_age = self.config.max_age.unwrap_or(model_max);
        if min_age < model_min || max_age > model_max || min_age > max_age {
            return Err(self.invalid(
                "min_age",
                format!("ages {min_age}..={max_age} are not inside the model ages {model_min}..={model_max}"),
            ));
        }
        self.first_slot = (min_age - model_min) as usize;
        let spread = (max_age - min_age + 1) as usize;

        self.from_labels = self.split_from(ctx.categories)?;
        self.to_labels = ctx.categories.expand_labels(&self.config.to, "to")?;
        if self.to_labels.iter().any(|l| Categories::is_combined_label(l)) {
            return Err(self.invalid("to", "combined categories are not allowed".to_string()));
        }
        if self.to_labels.len() != self.from_labels.len() {
            return Err(ProcessError::LengthMismatch {
                process: label,
                parameter: "to",
                expected: self.from_labels.len(),
                found: self.to_labels.len(),
            });
        }
        common::broadcast_labels(&self.config.selectivities, self.from_labels.len(), &label, "selectivities")?;
        common::check_range(&label, "u_max", &[self.config.u_max], 0.0, 1.0)?;
        common::check_range(&label, "initial_mortality", &[self.config.initial_mortality], 0.0, 1.0)?;

        match (self.config.numbers.is_empty(), self.config.proportions.is_empty()) {
            (false, false) => {
                return Err(self.invalid("numbers", "only one of numbers or proportions may be given".to_string()));
            }
            (true, true) => {
                return Err(self.invalid("numbers", "one of numbers or proportions is required".to_string()));
            }
            (false, true) => {
                if !self.config.n.is_empty() {
                    return Err(self.invalid("n", "n cannot be combined with a numbers table".to_string()));
                }
                self.check_table("numbers", &self.config.numbers, spread)?;
                self.numbers = self.config.numbers.clone();
            }
            (true, false) => {
                self.check_table("proportions", &self.config.proportions, spread)?;
                let n = common::broadcast(&self.config.n, self.config.years.len(), &label, "n")?;
                let mut numbers = BTreeMap::new();
                for (year, n) in self.config.years.iter().zip(n) {
                    let row = &self.config.proportions[year];
                    let total: f64 = row.iter().sum();
                    if (total - 1.0).abs() > self.config.tolerance {
                        return Err(self.invalid(
                            "proportions",
                            format!("row for year {year} sums to {total}, not 1.0"),
                        ));
                    }
                    numbers.insert(*year, row.iter().map(|p| p * n).collect());
                }
                self.numbers = numbers;
            }
        }
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        self.from = self.from_labels.iter().map(|l| ctx.partition.id(l)).collect::<Result<_, _>>()?;
        self.to = self.to_labels.iter().map(|l| ctx.partition.id(l)).collect::<Result<_, _>>()?;
        if let Some(i) = self.from.iter().zip(&self.to).position(|(f, t)| f == t) {
            return Err(self.invalid("to", format!("'{}' cannot be tagged into itself", self.to_labels[i])));
        }
        self.selectivities = ctx.selectivities.resolve_list(&self.config.selectivities, self.from.len())?;
        self.initial_mortality_selectivity = match &self.config.initial_mortality_selectivity {
            Some(s) => Some(ctx.selectivities.id(s)?),
            None => None,
        };
        self.penalty = match &self.config.penalty {
            Some(p) => Some(ctx.penalties.id(p).ok_or_else(|| ProcessError::UnknownLabel {
                process: self.config.label.clone(),
                kind: "penalty",
                label: p.clone(),
            })?),
            None => None,
        };
        Ok(())
    }

    fn reset(&mut self) {
        self.tagged.clear();
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> ProcessResult<()> {
        let year = ctx.state.year;
        if ctx.state.initialising() {
            return Ok(());
        }
        let Some(numbers) = self.numbers.get(&year) else {
            return Ok(());
        };

        let width = ctx.partition.width();
        let mut released = vec![vec![0.0; width]; self.to.len()];
        for (age_index, requested) in numbers.iter().copied().enumerate() {
            let slot = self.first_slot + age_index;
            let vulnerable: f64 = self
                .from
                .iter()
                .zip(&self.selectivities)
                .map(|(id, sel)| ctx.partition.get(*id).data[slot] * ctx.selectivities.get(*sel).value(slot))
                .sum();
            let mut exploitation = requested / zero_fun(vulnerable, DEFAULT_DELTA);
            if exploitation > self.config.u_max {
                exploitation = self.config.u_max;
                if let Some(penalty) = self.penalty {
                    ctx.penalties.trigger(penalty, &self.config.label, requested, vulnerable * self.config.u_max);
                }
            }
            let survival = 1.0
                - self.config.initial_mortality
                    * self.initial_mortality_selectivity.map_or(1.0, |id| ctx.selectivities.get(id).value(slot));

            for (c, (from, to)) in self.from.iter().zip(&self.to).enumerate() {
                let sel = ctx.selectivities.get(self.selectivities[c]).value(slot);
                let (source, destination) = ctx.partition.pair_mut(*from, *to);
                let amount = source.data[slot] * sel * exploitation;
                source.data[slot] -= amount;
                if source.data[slot] < 0.0 {
                    return Err(ProcessError::NegativeAbundance {
                        process: self.config.label.clone(),
                        category: source.name.clone(),
                        slot,
                        value: source.data[slot],
                    });
                }
                destination.data[slot] += amount * survival;
                released[c][slot] += amount * survival;
            }
        }

        let by_category = self.tagged.entry(year).or_default();
        for (label, values) in self.to_labels.iter().zip(released) {
            by_category.insert(label.clone(), values);
        }
        Ok(())
    }
}
