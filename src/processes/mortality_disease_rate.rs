//! Disease mortality in selected years:
//! `removed = N * (1 - exp(-sel * dm * year_effect))`.
//!
//! Runs on age or length partitions, only in its configured years and
//! never during initialisation.
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    biology::SelectivityId,
    model::objects::{Addressable, year_element},
    partition::CategoriesAccessor,
    processes::{
        BuildContext, ExecutionContext, Process, ProcessType, Removals, common,
        errors::{ProcessError, ProcessResult},
    },
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MortalityDiseaseRateConfig {
    pub label: String,
    pub categories: Vec<String>,
    pub years: Vec<u32>,
    pub disease_mortality_rate: Vec<f64>,
    pub year_effects: Vec<f64>,
    pub selectivities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MortalityDiseaseRate {
    config: MortalityDiseaseRateConfig,
    labels: Vec<String>,
    year_effects: BTreeMap<u32, f64>,
    accessor: CategoriesAccessor,
    selectivities: Vec<SelectivityId>,
    removals: Removals,
}

impl MortalityDiseaseRate {
    pub fn new(config: MortalityDiseaseRateConfig) -> Self {
        Self {
            config,
            labels: Vec::new(),
            year_effects: BTreeMap::new(),
            accessor: CategoriesAccessor::default(),
            selectivities: Vec::new(),
            removals: Removals::new(),
        }
    }

    fn rate(&self, i: usize) -> f64 {
        let rates = &self.config.disease_mortality_rate;
        if rates.len() == 1 { rates[0] } else { rates[i] }
    }
}

impl Addressable for MortalityDiseaseRate {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match parameter {
            "disease_mortality_rate" => common::vector_or_scalar(&mut self.config.disease_mortality_rate, index),
            "year_effects" => year_element(&mut self.year_effects, index),
            _ => None,
        }
    }
}

impl Process for MortalityDiseaseRate {
    fn label(&self) -> &str {
        &self.config.label
    }

    fn process_type(&self) -> ProcessType {
        ProcessType::Mortality
    }

    fn sub_type(&self) -> &'static str {
        "mortality_disease_rate"
    }

    fn validate(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        let label = &self.config.label;
        self.labels = ctx.categories.expand_labels(&self.config.categories, "categories")?;
        let n = self.labels.len();
        common::broadcast(&self.config.disease_mortality_rate, n, label, "disease_mortality_rate")?;
        common::check_range(label, "disease_mortality_rate", &self.config.disease_mortality_rate, 0.0, 10.0)?;
        common::broadcast_labels(&self.config.selectivities, n, label, "selectivities")?;
        if self.config.year_effects.len() != self.config.years.len() {
            return Err(ProcessError::LengthMismatch {
                process: label.clone(),
                parameter: "year_effects",
                expected: self.config.years.len(),
                found: self.config.year_effects.len(),
            });
        }
        common::check_range(label, "year_effects", &self.config.year_effects, 0.0, f64::INFINITY)?;
        self.year_effects =
            self.config.years.iter().copied().zip(self.config.year_effects.iter().copied()).collect();
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        self.accessor = CategoriesAccessor::new(ctx.partition, &self.labels)?;
        self.selectivities = ctx.selectivities.resolve_list(&self.config.selectivities, self.labels.len())?;
        Ok(())
    }

    fn reset(&mut self) {
        self.removals.clear();
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> ProcessResult<()> {
        let year = ctx.state.year;
        if ctx.state.initialising() {
            return Ok(());
        }
        let Some(effect) = self.year_effects.get(&year).copied() else {
            return Ok(());
        };
        let active: Vec<_> = self.accessor.active(ctx.partition, year).collect();
        for (i, id) in active {
            let rate = self.rate(i);
            let sel = ctx.selectivities.get(self.selectivities[i]);
            let category = ctx.partition.get_mut(id);
            let mut removed = Vec::with_capacity(category.data.len());
            for (slot, n) in category.data.iter_mut().enumerate() {
                let amount = *n * (1.0 - (-sel.value(slot) * rate * effect).exp());
                *n -= amount;
                removed.push(amount);
            }
            self.removals
                .entry(year)
                .or_default()
                .entry(self.config.label.clone())
                .or_default()
                .insert(category.name.clone(), removed);
        }
        Ok(())
    }

    fn removals(&self) -> Option<&Removals> {
        Some(&self.removals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processes::test_support::{Fixture, constant};

    #[test]
    // Purpose
    // -------
    // Disease mortality applies the year effect and only in process years.
    //
    // Given
    // -----
    // - dm = 0.1, year effect 2.0 in 2002 only, N = 100.
    //
    // Expect
    // ------
    // - 2001 untouched; 2002 leaves 100 e^-0.2 with the rest recorded.
    fn disease_mortality_uses_year_effects() {
        // Arrange
        let mut fx = Fixture::new(&["mature.male"], 1, 3, vec![constant("one", 1.0)], vec![]);
        let mut p = MortalityDiseaseRate::new(MortalityDiseaseRateConfig {
            label: "disease".to_string(),
            categories: vec!["mature.male".to_string()],
            years: vec![2002],
            disease_mortality_rate: vec![0.1],
            year_effects: vec![2.0],
            selectivities: vec!["one".to_string()],
        });
        fx.prepare(&mut p).unwrap();
        fx.set("mature.male", vec![100.0; 3]);

        // Act
        fx.run(&mut p, 2001, 0).unwrap();
        let untouched = fx.data("mature.male");
        fx.run(&mut p, 2002, 0).unwrap();

        // Assert
        assert_eq!(untouched, vec![100.0; 3]);
        let left = 100.0 * (-0.2f64).exp();
        assert!((fx.data("mature.male")[1] - left).abs() < 1e-9);
        let removed = &p.removals().unwrap()[&2002]["disease"]["mature.male"];
        assert!((removed[1] - (100.0 - left)).abs() < 1e-9);
    }
}
