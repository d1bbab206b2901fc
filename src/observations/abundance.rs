//! Relative abundance and biomass indices.
//!
//! For each category collection the expected index is
//! `q * Σ_members Σ_slots sel(slot) * N_interp(slot) [* mean_weight(slot)]`,
//! where `N_interp` interpolates between the partition before and after the
//! observation's time step. A free catchability contributes its `q` at
//! execute time; a nuisance catchability is solved once the whole series is
//! known and then applied to every expected value.
use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::trace;

use crate::{
    biology::SelectivityId,
    likelihoods::Comparison,
    model::objects::Addressable,
    observations::{
        Catchabilities, Observation, ObservationBuildContext, ObservationContext, ObservationCore,
        ObservationSettings,
        catchability::CatchabilityId,
        errors::{ObservationError, ObservationResult},
        settings_addressable,
    },
    partition::{CachedCombinedCategories, Partition},
};

const INDEX_LIKELIHOODS: [&str; 3] = ["normal", "lognormal", "lognormal_with_q"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Abundance,
    Biomass,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexConfig {
    #[serde(flatten)]
    pub settings: ObservationSettings,
    pub catchability: String,
    /// Category collections; `+` combines categories into one index value.
    pub categories: Vec<String>,
    /// One label, or one per collection.
    pub selectivities: Vec<String>,
    /// One value per collection for each observed year.
    #[serde(deserialize_with = "crate::utils::year_map")]
    pub obs: BTreeMap<u32, Vec<f64>>,
    /// One cv, or one per observed year.
    pub error_value: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    config: IndexConfig,
    kind: IndexKind,
    core: ObservationCore,
    labels: Vec<String>,
    cache: CachedCombinedCategories,
    selectivities: Vec<SelectivityId>,
    catchability: CatchabilityId,
    errors: BTreeMap<u32, f64>,
}

impl Index {
    pub fn new(config: IndexConfig, kind: IndexKind) -> Self {
        let core = ObservationCore::new(config.settings.clone());
        Self {
            config,
            kind,
            core,
            labels: Vec::new(),
            cache: CachedCombinedCategories::default(),
            selectivities: Vec::new(),
            catchability: CatchabilityId(0),
            errors: BTreeMap::new(),
        }
    }

    fn invalid(&self, parameter: &'static str, reason: String) -> ObservationError {
        ObservationError::InvalidParameter { observation: self.core.label().to_string(), parameter, reason }
    }

    fn expected(&self, partition: &Partition, ctx: &ObservationContext<'_>, g: usize) -> f64 {
        let proportion = self.core.settings.time_step_proportion;
        let sel = ctx.selectivities.get(self.selectivities[g]);
        let mut total = 0.0;
        for (m, id) in self.cache.combined().groups()[g].iter().enumerate() {
            let category = partition.get(*id);
            if !category.is_active(ctx.year) {
                continue;
            }
            let numbers = self.cache.interpolate(partition, g, m, proportion);
            for (slot, n) in numbers.iter().enumerate() {
                let weight = match self.kind {
                    IndexKind::Abundance => 1.0,
                    IndexKind::Biomass => category.mean_weight[slot],
                };
                total += sel.value(slot) * n * weight;
            }
        }
        total
    }
}

impl Addressable for Index {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        settings_addressable(&mut self.core.settings, parameter, index)
    }
}

impl Observation for Index {
    fn core(&self) -> &ObservationCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObservationCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        match self.kind {
            IndexKind::Abundance => "abundance",
            IndexKind::Biomass => "biomass",
        }
    }

    fn build(&mut self, ctx: &ObservationBuildContext<'_>) -> ObservationResult<()> {
        self.core = ObservationCore::new(self.config.settings.clone());
        let years: Vec<u32> = self.config.obs.keys().copied().collect();
        self.core.resolve(ctx, years.clone(), &INDEX_LIKELIHOODS)?;
        let label = self.core.label().to_string();

        self.labels = ctx.categories.expand_labels(&self.config.categories, "categories")?;
        let n = self.labels.len();
        for (year, row) in &self.config.obs {
            if row.len() != n {
                return Err(ObservationError::LengthMismatch {
                    observation: label,
                    parameter: "obs",
                    expected: n,
                    found: row.len(),
                });
            }
            if row.iter().any(|v| *v <= 0.0) {
                return Err(self.invalid("obs", format!("index values must be positive, see {year}")));
            }
        }
        let errors = match self.config.error_value.len() {
            1 => vec![self.config.error_value[0]; years.len()],
            m if m == years.len() => self.config.error_value.clone(),
            found => {
                return Err(ObservationError::LengthMismatch {
                    observation: label,
                    parameter: "error_value",
                    expected: years.len(),
                    found,
                });
            }
        };
        if errors.iter().any(|e| *e <= 0.0) {
            return Err(self.invalid("error_value", "cvs must be positive".to_string()));
        }
        self.errors = years.iter().copied().zip(errors).collect();

        self.cache = CachedCombinedCategories::new(ctx.partition, &self.labels)?;
        self.selectivities = ctx.selectivities.resolve_list(&self.config.selectivities, n)?;
        self.catchability = ctx.catchabilities.id(&self.config.catchability).ok_or_else(|| {
            ObservationError::UnknownLabel {
                observation: label,
                kind: "catchability",
                label: self.config.catchability.clone(),
                reason: "it is not defined",
            }
        })?;
        Ok(())
    }

    fn pre_execute(&mut self, partition: &Partition) {
        self.cache.build_cache(partition);
    }

    fn execute(&mut self, ctx: &ObservationContext<'_>) -> ObservationResult<()> {
        let catchability = ctx.catchabilities.get(self.catchability);
        let q = if catchability.is_nuisance() { 1.0 } else { catchability.q() };
        let settings = &self.core.settings;
        let error = self.errors.get(&ctx.year).copied().unwrap_or_default() * settings.error_value_multiplier;
        let Some(observed) = self.config.obs.get(&ctx.year) else {
            return Ok(());
        };
        let row: Vec<Comparison> = self
            .labels
            .iter()
            .enumerate()
            .map(|(g, label)| {
                let expected = q * self.expected(ctx.partition, ctx, g);
                Comparison::new(label, expected, observed[g], error, settings.process_error, settings.delta)
            })
            .collect();
        trace!(observation = %self.core.label(), year = ctx.year, n = row.len(), "index comparisons");
        self.core.comparisons.insert(ctx.year, row);
        Ok(())
    }

    fn finalise(&mut self, catchabilities: &mut Catchabilities) -> ObservationResult<()> {
        let catchability = catchabilities.get_mut(self.catchability);
        if !catchability.is_nuisance() {
            return Ok(());
        }
        catchability.calculate_nuisance_q(&self.core.comparisons, self.core.likelihood_kind)?;
        let q = catchability.q();
        for comparison in self.core.comparisons.values_mut().flatten() {
            comparison.expected *= q;
        }
        Ok(())
    }
}
