//! mortality_instantaneous — natural and fishing mortality applied together.
//!
//! Purpose
//! -------
//! Apply natural mortality `M` and the catches of several concurrent
//! fisheries within one time step, splitting each fishery's removals into
//! retained and discarded fish.
//!
//! Key behaviors
//! -------------
//! - Survival to mid-step: `exp(-0.5 * ratio * M * relM(age))`.
//! - Vulnerable biomass per fishery is `Σ N * w * sel * survival`; the
//!   retained portion also multiplies by the retained selectivity.
//! - Fishery exploitation is `retained_catch / retained_vulnerable`, and
//!   the contribution to category exploitation at each age is
//!   `U * sel * (ret + dm * (1 - ret))`.
//! - When the largest per-age exploitation touched by a fishery (`u_obs`)
//!   exceeds its `u_max`, the fishery's rate is rescaled by `u_max / u_obs`,
//!   every category's exploitation is rebuilt, and the fishery's penalty
//!   is triggered with the requested and achievable catch.
//! - Abundance then becomes `N * survival^2 * (1 - exploitation)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every category in the method table is one of the process categories.
//! - A fishery runs in exactly one time step, which must be one of this
//!   process's time steps.
//! - A negative abundance after mortality is fatal.
//!
//! Conventions
//! -----------
//! - Fisheries, categories, and their pairings live in owned vectors and
//!   refer to each other by index.
//! - Catches are retained weights, in the units of the mean weights.
//! - Only natural mortality applies during initialisation.
//!
//! Downstream usage
//! ----------------
//! - `removals()`, `retained()`, and `discards()` are keyed
//!   `[year][fishery][category]` and hold numbers at age before mortality.
use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tracing::debug;

use crate::{
    biology::{Selectivities, SelectivityId},
    model::objects::Addressable,
    partition::{CategoryId, PartitionStructure},
    penalties::PenaltyId,
    processes::{
        BuildContext, ExecutionContext, Process, ProcessType, Removals, common,
        errors::{ProcessError, ProcessResult},
    },
    utils::{DEFAULT_DELTA, zero_fun},
};

fn default_u_max() -> f64 {
    0.99
}

/// One row of the fishery-by-category method table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodRow {
    pub fishery: String,
    pub category: String,
    pub selectivity: String,
    /// Missing means every fish caught is retained.
    #[serde(default)]
    pub retained_selectivity: Option<String>,
    /// Missing means every discard dies.
    #[serde(default)]
    pub discard_mortality_selectivity: Option<String>,
    #[serde(default = "default_u_max")]
    pub u_max: f64,
    pub time_step: String,
    #[serde(default)]
    pub penalty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MortalityInstantaneousConfig {
    pub label: String,
    pub categories: Vec<String>,
    /// One value, or one per category.
    pub m: Vec<f64>,
    pub relative_m_by_age: Vec<String>,
    #[serde(default)]
    pub time_step_proportions: Vec<f64>,
    /// Retained catch by fishery and year.
    #[serde(deserialize_with = "crate::utils::labelled_year_map")]
    pub catches: BTreeMap<String, BTreeMap<u32, f64>>,
    pub method: Vec<MethodRow>,
}

#[derive(Debug, Clone, PartialEq)]
struct CategoryData {
    label: String,
    id: CategoryId,
    relative_m: SelectivityId,
    active: bool,
    used: bool,
    exploitation: Vec<f64>,
    survival_half_m: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
struct FisheryData {
    label: String,
    time_step: usize,
    u_max: f64,
    penalty_label: Option<String>,
    penalty: Option<PenaltyId>,
    catches: BTreeMap<u32, f64>,
    total_vulnerable: f64,
    retained_vulnerable: f64,
    exploitation: f64,
    u_obs: f64,
    requested_catches: BTreeMap<u32, f64>,
    actual_catches: BTreeMap<u32, f64>,
    actual_retained_catches: BTreeMap<u32, f64>,
    exploitation_by_year: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, PartialEq)]
struct FisheryCategory {
    fishery: usize,
    category: usize,
    selectivity: SelectivityId,
    retained: Option<SelectivityId>,
    discard_mortality: Option<SelectivityId>,
}

impl FisheryCategory {
    fn retained(&self, sel: &Selectivities, slot: usize) -> f64 {
        self.retained.map_or(1.0, |id| sel.get(id).value(slot))
    }

    fn discard_mortality(&self, sel: &Selectivities, slot: usize) -> f64 {
        self.discard_mortality.map_or(1.0, |id| sel.get(id).value(slot))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MortalityInstantaneous {
    config: MortalityInstantaneousConfig,
    labels: Vec<String>,
    ratios: HashMap<usize, f64>,
    categories: Vec<CategoryData>,
    fisheries: Vec<FisheryData>,
    fishery_categories: Vec<FisheryCategory>,
    removals: Removals,
    retained: Removals,
    discards: Removals,
}

impl MortalityInstantaneous {
    pub fn new(config: MortalityInstantaneousConfig) -> Self {
        Self {
            config,
            labels: Vec::new(),
            ratios: HashMap::new(),
            categories: Vec::new(),
            fisheries: Vec::new(),
            fishery_categories: Vec::new(),
            removals: Removals::new(),
            retained: Removals::new(),
            discards: Removals::new(),
        }
    }

    pub fn retained(&self) -> &Removals {
        &self.retained
    }

    pub fn discards(&self) -> &Removals {
        &self.discards
    }

    /// Catch actually taken by `fishery` in `year`, after any rescaling.
    pub fn actual_catch(&self, fishery: &str, year: u32) -> Option<f64> {
        self.fishery(fishery)?.actual_catches.get(&year).copied()
    }

    /// Fishery exploitation rate used in `year`.
    pub fn exploitation(&self, fishery: &str, year: u32) -> Option<f64> {
        self.fishery(fishery)?.exploitation_by_year.get(&year).copied()
    }

    fn fishery(&self, label: &str) -> Option<&FisheryData> {
        self.fisheries.iter().find(|f| f.label == label)
    }

    fn m(&self, i: usize) -> f64 {
        if self.config.m.len() == 1 { self.config.m[0] } else { self.config.m[i] }
    }

    fn invalid(&self, parameter: &'static str, reason: String) -> ProcessError {
        ProcessError::InvalidParameter { process: self.config.label.clone(), parameter, reason }
    }

    fn accumulate_exploitation(&mut self, selectivities: &Selectivities, time_step: usize) {
        for fc in &self.fishery_categories {
            let fishery = &self.fisheries[fc.fishery];
            let category = &mut self.categories[fc.category];
            if fishery.time_step != time_step || !category.active {
                continue;
            }
            let sel = selectivities.get(fc.selectivity);
            for (slot, e) in category.exploitation.iter_mut().enumerate() {
                let ret = fc.retained(selectivities, slot);
                let dm = fc.discard_mortality(selectivities, slot);
                *e += fishery.exploitation * sel.value(slot) * (ret + dm * (1.0 - ret));
            }
        }
    }

    fn record_removals(&mut self, ctx: &ExecutionContext<'_>) {
        let (year, time_step) = (ctx.state.year, ctx.state.time_step);
        for fc in &self.fishery_categories {
            let fishery = &self.fisheries[fc.fishery];
            let category = &self.categories[fc.category];
            if fishery.time_step != time_step || !category.active {
                continue;
            }
            let data = &ctx.partition.get(category.id).data;
            let sel = ctx.selectivities.get(fc.selectivity);
            let removed: Vec<f64> = data
                .iter()
                .enumerate()
                .map(|(slot, n)| {
                    n * fishery.exploitation * sel.value(slot) * category.survival_half_m[slot]
                })
                .collect();
            let retained: Vec<f64> = removed
                .iter()
                .enumerate()
                .map(|(slot, r)| r * fc.retained(ctx.selectivities, slot))
                .collect();
            let discards: Vec<f64> = removed.iter().zip(&retained).map(|(r, k)| r - k).collect();
            for (store, values) in
                [(&mut self.removals, removed), (&mut self.retained, retained), (&mut self.discards, discards)]
            {
                store
                    .entry(year)
                    .or_default()
                    .entry(fishery.label.clone())
                    .or_default()
                    .insert(category.label.clone(), values);
            }
        }
    }

    fn apply_fishing(&mut self, ctx: &mut ExecutionContext<'_>) {
        let (year, time_step) = (ctx.state.year, ctx.state.time_step);

        for fishery in self.fisheries.iter_mut() {
            fishery.total_vulnerable = 0.0;
            fishery.retained_vulnerable = 0.0;
        }
        for fc in &self.fishery_categories {
            let fishery = &mut self.fisheries[fc.fishery];
            let category = &mut self.categories[fc.category];
            if fishery.time_step != time_step || !category.active {
                continue;
            }
            category.used = true;
            let partition_category = ctx.partition.get(category.id);
            let sel = ctx.selectivities.get(fc.selectivity);
            for (slot, n) in partition_category.data.iter().enumerate() {
                let vulnerable = n
                    * partition_category.mean_weight[slot]
                    * sel.value(slot)
                    * category.survival_half_m[slot];
                fishery.total_vulnerable += vulnerable;
                fishery.retained_vulnerable += vulnerable * fc.retained(ctx.selectivities, slot);
            }
        }

        for fishery in self.fisheries.iter_mut() {
            if fishery.time_step != time_step {
                fishery.exploitation = 0.0;
                continue;
            }
            let retained_catch = fishery.catches.get(&year).copied().unwrap_or(0.0);
            let retained_vulnerable = zero_fun(fishery.retained_vulnerable, DEFAULT_DELTA);
            fishery.exploitation = retained_catch / retained_vulnerable;
            fishery
                .requested_catches
                .insert(year, retained_catch * fishery.total_vulnerable / retained_vulnerable);
        }
        self.accumulate_exploitation(ctx.selectivities, time_step);

        for fishery in self.fisheries.iter_mut() {
            fishery.u_obs = 0.0;
        }
        for fc in &self.fishery_categories {
            let fishery = &mut self.fisheries[fc.fishery];
            if fishery.time_step != time_step {
                continue;
            }
            let category = &self.categories[fc.category];
            let peak = category.exploitation.iter().copied().fold(0.0, f64::max);
            fishery.u_obs = fishery.u_obs.max(peak);
        }

        let mut rescaled = false;
        for fishery in self.fisheries.iter_mut().filter(|f| f.time_step == time_step) {
            let requested = fishery.requested_catches.get(&year).copied().unwrap_or(0.0);
            let (actual, actual_retained) = if fishery.u_obs > fishery.u_max {
                fishery.exploitation *= fishery.u_max / fishery.u_obs;
                rescaled = true;
                let actual = fishery.total_vulnerable * fishery.exploitation;
                debug!(
                    process = %self.config.label,
                    fishery = %fishery.label,
                    year,
                    u_obs = fishery.u_obs,
                    u_max = fishery.u_max,
                    "fishery exploitation rescaled to u_max"
                );
                if let Some(penalty) = fishery.penalty {
                    ctx.penalties.trigger(penalty, &fishery.label, requested, actual);
                }
                (actual, fishery.retained_vulnerable * fishery.exploitation)
            } else {
                (requested, fishery.catches.get(&year).copied().unwrap_or(0.0))
            };
            fishery.actual_catches.insert(year, actual);
            fishery.actual_retained_catches.insert(year, actual_retained);
            fishery.exploitation_by_year.insert(year, fishery.exploitation);
        }

        if rescaled {
            for category in self.categories.iter_mut().filter(|c| c.used) {
                category.exploitation.iter_mut().for_each(|e| *e = 0.0);
            }
            self.accumulate_exploitation(ctx.selectivities, time_step);
        }
        self.record_removals(ctx);
    }
}

impl Addressable for MortalityInstantaneous {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match parameter {
            "m" => common::vector_or_scalar(&mut self.config.m, index),
            "u_max" => {
                let fishery = index?.trim();
                self.fisheries.iter_mut().find(|f| f.label == fishery).map(|f| &mut f.u_max)
            }
            _ => None,
        }
    }
}

impl Process for MortalityInstantaneous {
    fn label(&self) -> &str {
        &self.config.label
    }

    fn process_type(&self) -> ProcessType {
        ProcessType::Mortality
    }

    fn sub_type(&self) -> &'static str {
        "mortality_instantaneous"
    }

    fn validate(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        let label = self.config.label.clone();
        if ctx.partition.structure() != PartitionStructure::Age {
            return Err(ProcessError::RequiresAgePartition { process: label });
        }
        self.labels = ctx.categories.expand_labels(&self.config.categories, "categories")?;
        let n = self.labels.len();
        common::broadcast(&self.config.m, n, &label, "m")?;
        common::check_range(&label, "m", &self.config.m, 0.0, f64::INFINITY)?;
        common::broadcast_labels(&self.config.relative_m_by_age, n, &label, "relative_m_by_age")?;
        self.ratios =
            common::time_step_ratios(&label, &self.config.time_step_proportions, ctx.assigned_time_steps)?;

        self.fisheries.clear();
        for row in &self.config.method {
            if !self.labels.contains(&row.category) {
                return Err(self.invalid(
                    "method",
                    format!("category '{}' is not one of this process's categories", row.category),
                ));
            }
            if !(0.0..=1.0).contains(&row.u_max) {
                return Err(self.invalid("method", format!("u_max {} is outside [0, 1]", row.u_max)));
            }
            let time_step = ctx.time_steps.iter().position(|t| *t == row.time_step).ok_or_else(|| {
                ProcessError::UnknownLabel {
                    process: label.clone(),
                    kind: "time_step",
                    label: row.time_step.clone(),
                }
            })?;
            if !ctx.assigned_time_steps.contains(&time_step) {
                return Err(self.invalid(
                    "method",
                    format!(
                        "fishery '{}' uses time step '{}', which this process is not assigned to",
                        row.fishery, row.time_step
                    ),
                ));
            }
            match self.fisheries.iter().find(|f| f.label == row.fishery) {
                Some(existing) if existing.time_step != time_step => {
                    return Err(self.invalid(
                        "method",
                        format!("fishery '{}' appears in more than one time step", row.fishery),
                    ));
                }
                Some(existing) if existing.u_max != row.u_max => {
                    return Err(self.invalid(
                        "method",
                        format!("fishery '{}' has conflicting u_max values", row.fishery),
                    ));
                }
                Some(_) => {}
                None => {
                    let catches = self.config.catches.get(&row.fishery).cloned().ok_or_else(|| {
                        self.invalid("catches", format!("no catches are defined for fishery '{}'", row.fishery))
                    })?;
                    common::check_range(
                        &label,
                        "catches",
                        &catches.values().copied().collect::<Vec<_>>(),
                        0.0,
                        f64::INFINITY,
                    )?;
                    self.fisheries.push(FisheryData {
                        label: row.fishery.clone(),
                        time_step,
                        u_max: row.u_max,
                        penalty_label: row.penalty.clone(),
                        penalty: None,
                        catches,
                        total_vulnerable: 0.0,
                        retained_vulnerable: 0.0,
                        exploitation: 0.0,
                        u_obs: 0.0,
                        requested_catches: BTreeMap::new(),
                        actual_catches: BTreeMap::new(),
                        actual_retained_catches: BTreeMap::new(),
                        exploitation_by_year: BTreeMap::new(),
                    });
                }
            }
        }
        if let Some(unused) = self.config.catches.keys().find(|f| !self.fisheries.iter().any(|x| x.label == **f)) {
            return Err(self.invalid("catches", format!("fishery '{unused}' has no method rows")));
        }
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        let width = ctx.partition.width();
        let relative_m = ctx.selectivities.resolve_list(&self.config.relative_m_by_age, self.labels.len())?;
        self.categories = self
            .labels
            .iter()
            .zip(relative_m)
            .map(|(label, relative_m)| {
                Ok(CategoryData {
                    label: label.clone(),
                    id: ctx.partition.id(label)?,
                    relative_m,
                    active: false,
                    used: false,
                    exploitation: vec![0.0; width],
                    survival_half_m: vec![1.0; width],
                })
            })
            .collect::<ProcessResult<Vec<_>>>()?;

        for fishery in self.fisheries.iter_mut() {
            fishery.penalty = match &fishery.penalty_label {
                Some(p) => Some(ctx.penalties.id(p).ok_or_else(|| ProcessError::UnknownLabel {
                    process: self.config.label.clone(),
                    kind: "penalty",
                    label: p.clone(),
                })?),
                None => None,
            };
        }

        let optional = |label: &Option<String>| -> ProcessResult<Option<SelectivityId>> {
            Ok(match label {
                Some(l) => Some(ctx.selectivities.id(l)?),
                None => None,
            })
        };
        self.fishery_categories.clear();
        for row in &self.config.method {
            let fishery = self.fisheries.iter().position(|f| f.label == row.fishery);
            let category = self.labels.iter().position(|c| *c == row.category);
            let (Some(fishery), Some(category)) = (fishery, category) else {
                return Err(ProcessError::UnknownLabel {
                    process: self.config.label.clone(),
                    kind: "fishery",
                    label: row.fishery.clone(),
                });
            };
            self.fishery_categories.push(FisheryCategory {
                fishery,
                category,
                selectivity: ctx.selectivities.id(&row.selectivity)?,
                retained: optional(&row.retained_selectivity)?,
                discard_mortality: optional(&row.discard_mortality_selectivity)?,
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.removals.clear();
        self.retained.clear();
        self.discards.clear();
        for fishery in self.fisheries.iter_mut() {
            fishery.requested_catches.clear();
            fishery.actual_catches.clear();
            fishery.actual_retained_catches.clear();
            fishery.exploitation_by_year.clear();
        }
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> ProcessResult<()> {
        let (year, time_step) = (ctx.state.year, ctx.state.time_step);
        let ratio = self.ratios.get(&time_step).copied().unwrap_or(1.0);

        for i in 0..self.categories.len() {
            let m = self.m(i);
            let category = &mut self.categories[i];
            category.active = ctx.partition.get(category.id).is_active(year);
            category.used = false;
            let relative_m = ctx.selectivities.get(category.relative_m);
            for slot in 0..category.exploitation.len() {
                category.exploitation[slot] = 0.0;
                category.survival_half_m[slot] = (-0.5 * ratio * m * relative_m.value(slot)).exp();
            }
        }

        if !ctx.state.initialising() {
            self.apply_fishing(ctx);
        }

        for category in self.categories.iter().filter(|c| c.active) {
            let data = &mut ctx.partition.get_mut(category.id).data;
            for (slot, n) in data.iter_mut().enumerate() {
                *n *= category.survival_half_m[slot].powi(2) * (1.0 - category.exploitation[slot]);
                if *n < 0.0 {
                    return Err(ProcessError::NegativeAbundance {
                        process: self.config.label.clone(),
                        category: category.label.clone(),
                        slot,
                        value: *n,
                    });
                }
            }
        }
        Ok(())
    }

    fn removals(&self) -> Option<&Removals> {
        Some(&self.removals)
    }

    fn fishery_labels(&self) -> Vec<String> {
        self.fisheries.iter().map(|f| f.label.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{objects::AddressableName, state::Phase},
        penalties::PenaltyConfig,
        processes::test_support::{Fixture, constant},
    };

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Removals matching the requested catch when u_max is not reached.
    // - u_max rescaling, its penalty, and the capped exploitation.
    // - The retained/discard split.
    // - Method table validation.
    //
    // They intentionally DO NOT cover:
    // - Length partitions (rejected at validation).
    // -------------------------------------------------------------------------

    fn fixture() -> Fixture {
        let mut fx = Fixture::new(
            &["mature.male", "mature.female"],
            1,
            4,
            vec![constant("one", 1.0), constant("half", 0.5), constant("zero", 0.0)],
            vec![PenaltyConfig { label: "catch_penalty".to_string(), multiplier: 1.0, log_scale: false }],
        );
        fx.set("mature.male", vec![100.0; 4]);
        fx.set("mature.female", vec![100.0; 4]);
        fx
    }

    fn row(fishery: &str, category: &str) -> MethodRow {
        MethodRow {
            fishery: fishery.to_string(),
            category: category.to_string(),
            selectivity: "one".to_string(),
            retained_selectivity: None,
            discard_mortality_selectivity: None,
            u_max: 0.5,
            time_step: "step1".to_string(),
            penalty: Some("catch_penalty".to_string()),
        }
    }

    fn config(m: f64, catch: f64, method: Vec<MethodRow>) -> MortalityInstantaneousConfig {
        let mut catches = BTreeMap::new();
        catches.insert("trawl".to_string(), BTreeMap::from([(2001, catch)]));
        MortalityInstantaneousConfig {
            label: "mortality".to_string(),
            categories: vec!["mature.male".to_string()],
            m: vec![m],
            relative_m_by_age: vec!["one".to_string()],
            time_step_proportions: vec![],
            catches,
            method,
        }
    }

    #[test]
    // Purpose
    // -------
    // Without capping, removals at age sum to the requested catch and the
    // survivors follow `N * s^2 * (1 - U)`.
    //
    // Given
    // -----
    // - M = 0.2, N = 100 at four ages, unit weights, catch 100.
    //
    // Expect
    // ------
    // - U = 0.25 e^0.1, removals summing to 100, no penalty.
    fn uncapped_removals_match_catch() {
        // Arrange
        let mut fx = fixture();
        let mut p = MortalityInstantaneous::new(config(0.2, 100.0, vec![row("trawl", "mature.male")]));
        fx.prepare(&mut p).unwrap();

        // Act
        fx.run(&mut p, 2001, 0).unwrap();

        // Assert
        let u = 0.25 * 0.1f64.exp();
        assert!((p.exploitation("trawl", 2001).unwrap() - u).abs() < 1e-12);
        let removed: f64 = p.removals().unwrap()[&2001]["trawl"]["mature.male"].iter().sum();
        assert!((removed - 100.0).abs() < 1e-9);
        let expected = 100.0 * (-0.2f64).exp() * (1.0 - u);
        assert!((fx.data("mature.male")[2] - expected).abs() < 1e-9);
        assert_eq!(fx.penalties.iter().next().unwrap().score(), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // An infeasible catch is rescaled to u_max and penalised.
    //
    // Given
    // -----
    // - M = 0, 400 vulnerable, catch 300, u_max 0.5.
    //
    // Expect
    // ------
    // - Exploitation exactly 0.5, 50 left per age, penalty (300 - 200)^2.
    fn infeasible_catch_is_rescaled_and_penalised() {
        // Arrange
        let mut fx = fixture();
        let mut p = MortalityInstantaneous::new(config(0.0, 300.0, vec![row("trawl", "mature.male")]));
        fx.prepare(&mut p).unwrap();

        // Act
        fx.run(&mut p, 2001, 0).unwrap();

        // Assert
        assert!((p.exploitation("trawl", 2001).unwrap() - 0.5).abs() < 1e-12);
        assert!((p.actual_catch("trawl", 2001).unwrap() - 200.0).abs() < 1e-9);
        for n in fx.data("mature.male") {
            assert!((n - 50.0).abs() < 1e-9);
        }
        let score = fx.penalties.iter().next().unwrap().score();
        assert!((score - 10_000.0).abs() < 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // A mixed-case fishery label resolves through a parsed `u_max{...}` name.
    //
    // Given
    // -----
    // - Fishery "TrawlNorth" and the name "process[mortality].u_max{TrawlNorth}".
    //
    // Expect
    // ------
    // - The addressable is found and writes through to the fishery's u_max.
    fn u_max_resolves_mixed_case_fishery() {
        // Arrange
        let mut fx = fixture();
        let mut cfg = config(0.0, 10.0, vec![row("TrawlNorth", "mature.male")]);
        let catch = cfg.catches.remove("trawl").unwrap();
        cfg.catches.insert("TrawlNorth".to_string(), catch);
        let mut p = MortalityInstantaneous::new(cfg);
        fx.prepare(&mut p).unwrap();
        let name = AddressableName::parse("process[mortality].u_max{TrawlNorth}").unwrap();

        // Act
        let target = p.addressable_mut(&name.parameter, name.index.as_deref());

        // Assert
        *target.expect("u_max{TrawlNorth} should resolve") = 0.25;
        assert_eq!(p.fisheries[0].u_max, 0.25);
    }

    #[test]
    // Purpose
    // -------
    // Discards that survive are returned to the partition.
    //
    // Given
    // -----
    // - retained selectivity 0.5, discard mortality 0, retained catch 50.
    //
    // Expect
    // ------
    // - U = 0.25, per-age exploitation 0.125, removals 25 split evenly.
    fn retained_and_discards_are_split() {
        // Arrange
        let mut fx = fixture();
        let mut r = row("trawl", "mature.male");
        r.retained_selectivity = Some("half".to_string());
        r.discard_mortality_selectivity = Some("zero".to_string());
        let mut p = MortalityInstantaneous::new(config(0.0, 50.0, vec![r]));
        fx.prepare(&mut p).unwrap();

        // Act
        fx.run(&mut p, 2001, 0).unwrap();

        // Assert
        assert_eq!(fx.data("mature.male"), vec![87.5; 4]);
        assert_eq!(p.removals().unwrap()[&2001]["trawl"]["mature.male"], vec![25.0; 4]);
        assert_eq!(p.retained()[&2001]["trawl"]["mature.male"], vec![12.5; 4]);
        assert_eq!(p.discards()[&2001]["trawl"]["mature.male"], vec![12.5; 4]);
    }

    #[test]
    // Purpose
    // -------
    // Initialisation applies natural mortality only.
    //
    // Given
    // -----
    // - M = 0.2 and a catch in the run year.
    //
    // Expect
    // ------
    // - N = 100 e^-0.2 with no removals recorded.
    fn initialisation_applies_natural_mortality_only() {
        // Arrange
        let mut fx = fixture();
        let mut p = MortalityInstantaneous::new(config(0.2, 100.0, vec![row("trawl", "mature.male")]));
        fx.prepare(&mut p).unwrap();

        // Act
        fx.run_in(&mut p, 2001, 0, Phase::Initialise(0)).unwrap();

        // Assert
        assert!((fx.data("mature.male")[0] - 100.0 * (-0.2f64).exp()).abs() < 1e-9);
        assert!(p.removals().unwrap().is_empty());
    }

    #[test]
    // Purpose
    // -------
    // Method rows must reference the process's categories.
    //
    // Given
    // -----
    // - A row for mature.female, which the process does not cover.
    //
    // Expect
    // ------
    // - `InvalidParameter` on method.
    fn validate_rejects_method_category_outside_process() {
        // Arrange
        let fx = fixture();
        let mut p = MortalityInstantaneous::new(config(0.2, 1.0, vec![row("trawl", "mature.female")]));

        // Act
        let err = fx.prepare(&mut p).unwrap_err();

        // Assert
        match err {
            ProcessError::InvalidParameter { parameter, .. } => assert_eq!(parameter, "method"),
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // A fishery is confined to one time step.
    //
    // Given
    // -----
    // - Two rows for `trawl` in step1 and step2.
    //
    // Expect
    // ------
    // - `InvalidParameter` on method.
    fn validate_rejects_fishery_in_two_time_steps() {
        // Arrange
        let mut fx = fixture();
        fx.assigned = vec![0, 1];
        let mut cfg = config(0.2, 1.0, vec![row("trawl", "mature.male"), row("trawl", "mature.female")]);
        cfg.categories = vec!["mature.male".to_string(), "mature.female".to_string()];
        cfg.method[1].time_step = "step2".to_string();
        let mut p = MortalityInstantaneous::new(cfg);

        // Act
        let err = fx.prepare(&mut p).unwrap_err();

        // Assert
        match err {
            ProcessError::InvalidParameter { parameter, reason, .. } => {
                assert_eq!(parameter, "method");
                assert!(reason.contains("more than one time step"));
            }
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }
}
