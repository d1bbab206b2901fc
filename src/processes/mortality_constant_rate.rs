//! Constant-rate natural mortality.
//!
//! `N(slot) -= N(slot) * (1 - exp(-sel(slot) * m * ratio))`, where `ratio`
//! is this time step's share of the annual rate. Works on age and length
//! partitions alike.
use std::collections::HashMap;

use serde::Deserialize;

use crate::{
    biology::SelectivityId,
    model::objects::Addressable,
    partition::CategoriesAccessor,
    processes::{
        BuildContext, ExecutionContext, Process, ProcessType, common,
        errors::{ProcessError, ProcessResult},
    },
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MortalityConstantRateConfig {
    pub label: String,
    pub categories: Vec<String>,
    /// One value, or one per category.
    pub m: Vec<f64>,
    pub selectivities: Vec<String>,
    #[serde(default)]
    pub time_step_proportions: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MortalityConstantRate {
    config: MortalityConstantRateConfig,
    labels: Vec<String>,
    accessor: CategoriesAccessor,
    selectivities: Vec<SelectivityId>,
    ratios: HashMap<usize, f64>,
}

impl MortalityConstantRate {
    pub fn new(config: MortalityConstantRateConfig) -> Self {
        Self {
            config,
            labels: Vec::new(),
            accessor: CategoriesAccessor::default(),
            selectivities: Vec::new(),
            ratios: HashMap::new(),
        }
    }

    fn m(&self, i: usize) -> f64 {
        if self.config.m.len() == 1 { self.config.m[0] } else { self.config.m[i] }
    }
}

impl Addressable for MortalityConstantRate {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match parameter {
            "m" => common::vector_or_scalar(&mut self.config.m, index),
            _ => None,
        }
    }
}

impl Process for MortalityConstantRate {
    fn label(&self) -> &str {
        &self.config.label
    }

    fn process_type(&self) -> ProcessType {
        ProcessType::Mortality
    }

    fn sub_type(&self) -> &'static str {
        "mortality_constant_rate"
    }

    fn validate(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        let label = &self.config.label;
        self.labels = ctx.categories.expand_labels(&self.config.categories, "categories")?;
        let n = self.labels.len();
        common::broadcast(&self.config.m, n, label, "m")?;
        common::check_range(label, "m", &self.config.m, 0.0, f64::INFINITY)?;
        common::broadcast_labels(&self.config.selectivities, n, label, "selectivities")?;
        self.ratios = common::time_step_ratios(
            label,
            &self.config.time_step_proportions,
            ctx.assigned_time_steps,
        )?;
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        self.accessor = CategoriesAccessor::new(ctx.partition, &self.labels)?;
        self.selectivities = ctx.selectivities.resolve_list(&self.config.selectivities, self.labels.len())?;
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> ProcessResult<()> {
        let ratio = self.ratios.get(&ctx.state.time_step).copied().unwrap_or(1.0);
        let active: Vec<_> = self.accessor.active(ctx.partition, ctx.state.year).collect();
        for (i, id) in active {
            let sel = ctx.selectivities.get(self.selectivities[i]);
            let m = self.m(i);
            let category = ctx.partition.get_mut(id);
            for (slot, n) in category.data.iter_mut().enumerate() {
                *n -= *n * (1.0 - (-sel.value(slot) * m * ratio).exp());
            }
            if let Some((slot, value)) =
                category.data.iter().copied().enumerate().find(|(_, v)| *v < 0.0)
            {
                return Err(ProcessError::NegativeAbundance {
                    process: self.config.label.clone(),
                    category: category.name.clone(),
                    slot,
                    value,
                });
            }
        }
        Ok(())
    }
}
