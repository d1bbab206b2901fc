//! Proportions at age of numbers in the partition.
//!
//! Each category collection's expected row is
//! `sel(age) * N_interp(age)`, optionally spread over read ages by an
//! ageing error, collapsed onto `min_age..=max_age` (with an optional plus
//! group) and normalised to sum to one.
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    biology::{AgeingErrorId, SelectivityId},
    model::objects::Addressable,
    observations::{
        Observation, ObservationBuildContext, ObservationContext, ObservationCore, ObservationSettings,
        composition::{AgeRange, CompositionTable},
        errors::ObservationResult,
        settings_addressable,
    },
    partition::{CachedCombinedCategories, Partition},
    utils::PROPORTION_TOLERANCE,
};

/// Likelihoods that score compositions.
pub(crate) const COMPOSITION_LIKELIHOODS: [&str; 4] =
    ["multinomial", "lognormal", "dirichlet_multinomial", "binomial_approx"];

fn yes() -> bool {
    true
}

fn default_tolerance() -> f64 {
    PROPORTION_TOLERANCE
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProportionsAtAgeConfig {
    #[serde(flatten)]
    pub settings: ObservationSettings,
    pub min_age: u32,
    pub max_age: u32,
    #[serde(default = "yes")]
    pub plus_group: bool,
    pub categories: Vec<String>,
    /// One label, or one per collection.
    pub selectivities: Vec<String>,
    #[serde(deserialize_with = "crate::utils::year_map")]
    pub obs: BTreeMap<u32, Vec<f64>>,
    #[serde(deserialize_with = "crate::utils::year_map")]
    pub error_values: BTreeMap<u32, Vec<f64>>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub ageing_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProportionsAtAge {
    config: ProportionsAtAgeConfig,
    core: ObservationCore,
    labels: Vec<String>,
    range: AgeRange,
    table: CompositionTable,
    cache: CachedCombinedCategories,
    selectivities: Vec<SelectivityId>,
    ageing_error: Option<AgeingErrorId>,
}

impl ProportionsAtAge {
    pub fn new(config: ProportionsAtAgeConfig) -> Self {
        let core = ObservationCore::new(config.settings.clone());
        let range = AgeRange { min_age: config.min_age, max_age: config.max_age, plus_group: config.plus_group };
        Self {
            config,
            core,
            labels: Vec::new(),
            range,
            table: CompositionTable::default(),
            cache: CachedCombinedCategories::default(),
            selectivities: Vec::new(),
            ageing_error: None,
        }
    }

    fn expected_row(&self, partition: &Partition, ctx: &ObservationContext<'_>, g: usize) -> Vec<f64> {
        let sel = ctx.selectivities.get(self.selectivities[g]);
        let mut out = vec![0.0; self.range.len()];
        for (m, id) in self.cache.combined().groups()[g].iter().enumerate() {
            let category = partition.get(*id);
            if !category.is_active(ctx.year) {
                continue;
            }
            let numbers: Vec<f64> = self
                .cache
                .interpolate(partition, g, m, self.core.settings.time_step_proportion)
                .iter()
                .enumerate()
                .map(|(slot, n)| n * sel.value(slot))
                .collect();
            let numbers = match self.ageing_error {
                Some(id) => ctx.ageing_errors.get(id).apply(&numbers),
                None => numbers,
            };
            self.range.collapse(category, &numbers, &mut out);
        }
        out
    }
}

impl Addressable for ProportionsAtAge {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        settings_addressable(&mut self.core.settings, parameter, index)
    }
}

impl Observation for ProportionsAtAge {
    fn core(&self) -> &ObservationCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObservationCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        "proportions_at_age"
    }

    fn build(&mut self, ctx: &ObservationBuildContext<'_>) -> ObservationResult<()> {
        self.core = ObservationCore::new(self.config.settings.clone());
        let label = self.core.label().to_string();
        self.range = AgeRange::new(
            &label,
            self.config.min_age,
            self.config.max_age,
            self.config.plus_group,
            ctx.partition.min_age(),
            ctx.partition.max_age(),
        )?;
        self.labels = ctx.categories.expand_labels(&self.config.categories, "categories")?;
        self.table = CompositionTable::new(
            &label,
            &self.config.obs,
            &self.config.error_values,
            self.labels.len(),
            self.range.len(),
            self.config.tolerance,
        )?;
        self.core.resolve(ctx, self.table.years(), &COMPOSITION_LIKELIHOODS)?;
        self.cache = CachedCombinedCategories::new(ctx.partition, &self.labels)?;
        self.selectivities = ctx.selectivities.resolve_list(&self.config.selectivities, self.labels.len())?;
        self.ageing_error = self.config.ageing_error.as_deref().map(|l| ctx.ageing_errors.id(l)).transpose()?;
        Ok(())
    }

    fn pre_execute(&mut self, partition: &Partition) {
        self.cache.build_cache(partition);
    }

    fn execute(&mut self, ctx: &ObservationContext<'_>) -> ObservationResult<()> {
        let expected: Vec<Vec<f64>> =
            (0..self.labels.len()).map(|g| self.expected_row(ctx.partition, ctx, g)).collect();
        let settings = &self.core.settings;
        let row = self.table.comparisons(
            ctx.year,
            &self.labels,
            &expected,
            self.range,
            settings.error_value_multiplier,
            settings.process_error,
            settings.delta,
        );
        self.core.comparisons.insert(ctx.year, row);
        Ok(())
    }
}
