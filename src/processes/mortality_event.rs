//! Event mortality: remove a fixed catch in the configured years.
//!
//! Key behaviors
//! -------------
//! - `exploitation = catch / vulnerable`, where vulnerable is abundance (or
//!   biomass) weighted by selectivity.
//! - Exploitation above `u_max` is capped, and the penalty (if any) is
//!   triggered with the requested and achievable catch.
//! - Skipped during initialisation and in years without a catch.
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    biology::SelectivityId,
    model::objects::{Addressable, scalar, year_element},
    partition::CategoriesAccessor,
    penalties::PenaltyId,
    processes::{
        BuildContext, ExecutionContext, Process, ProcessType, Removals, common,
        errors::{ProcessError, ProcessResult},
    },
    utils::{DEFAULT_DELTA, zero_fun},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchUnits {
    Numbers,
    #[default]
    Biomass,
}

fn default_u_max() -> f64 {
    0.99
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MortalityEventConfig {
    pub label: String,
    pub categories: Vec<String>,
    pub years: Vec<u32>,
    pub catches: Vec<f64>,
    #[serde(default = "default_u_max")]
    pub u_max: f64,
    pub selectivities: Vec<String>,
    #[serde(default)]
    pub penalty: Option<String>,
    #[serde(default)]
    pub catch_units: CatchUnits,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MortalityEvent {
    config: MortalityEventConfig,
    labels: Vec<String>,
    catches: BTreeMap<u32, f64>,
    accessor: CategoriesAccessor,
    selectivities: Vec<SelectivityId>,
    penalty: Option<PenaltyId>,
    actual_catches: BTreeMap<u32, f64>,
    exploitation: BTreeMap<u32, f64>,
    removals: Removals,
}

impl MortalityEvent {
    pub fn new(config: MortalityEventConfig) -> Self {
        Self {
            config,
            labels: Vec::new(),
            catches: BTreeMap::new(),
            accessor: CategoriesAccessor::default(),
            selectivities: Vec::new(),
            penalty: None,
            actual_catches: BTreeMap::new(),
            exploitation: BTreeMap::new(),
            removals: Removals::new(),
        }
    }

    /// Catch actually taken by year, after `u_max` capping.
    pub fn actual_catches(&self) -> &BTreeMap<u32, f64> {
        &self.actual_catches
    }

    pub fn exploitation(&self) -> &BTreeMap<u32, f64> {
        &self.exploitation
    }
}

impl Addressable for MortalityEvent {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match parameter {
            "u_max" => scalar(&mut self.config.u_max, index),
            "catches" => year_element(&mut self.catches, index),
            _ => None,
        }
    }
}

impl Process for MortalityEvent {
    fn label(&self) -> &str {
        &self.config.label
    }

    fn process_type(&self) -> ProcessType {
        ProcessType::Mortality
    }

    fn sub_type(&self) -> &'static str {
        "mortality_event"
    }

    fn validate(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        let label = &self.config.label;
        self.labels = ctx.categories.expand_labels(&self.config.categories, "categories")?;
        common::broadcast_labels(&self.config.selectivities, self.labels.len(), label, "selectivities")?;
        common::check_range(label, "u_max", &[self.config.u_max], 0.0, 1.0)?;
        common::check_range(label, "catches", &self.config.catches, 0.0, f64::INFINITY)?;
        if self.config.years.len() != self.config.catches.len() {
            return Err(ProcessError::LengthMismatch {
                process: label.clone(),
                parameter: "catches",
                expected: self.config.years.len(),
                found: self.config.catches.len(),
            });
        }
        self.catches.clear();
        for (year, value) in self.config.years.iter().zip(&self.config.catches) {
            if self.catches.insert(*year, *value).is_some() {
                return Err(ProcessError::InvalidParameter {
                    process: label.clone(),
                    parameter: "years",
                    reason: format!("year {year} appears more than once"),
                });
            }
        }
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        self.accessor = CategoriesAccessor::new(ctx.partition, &self.labels)?;
        self.selectivities = ctx.selectivities.resolve_list(&self.config.selectivities, self.labels.len())?;
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
        self.actual_catches.clear();
        self.exploitation.clear();
        self.removals.clear();
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> ProcessResult<()> {
        let year = ctx.state.year;
        if ctx.state.initialising() {
            return Ok(());
        }
        let Some(catch) = self.catches.get(&year).copied() else {
            return Ok(());
        };

        let active: Vec<_> = self.accessor.active(ctx.partition, year).collect();
        let by_biomass = self.config.catch_units == CatchUnits::Biomass;
        let mut vulnerable = 0.0;
        for (i, id) in &active {
            let category = ctx.partition.get(*id);
            let sel = ctx.selectivities.get(self.selectivities[*i]);
            for (slot, n) in category.data.iter().enumerate() {
                let weight = if by_biomass { category.mean_weight[slot] } else { 1.0 };
                vulnerable += n * sel.value(slot) * weight;
            }
        }

        let mut exploitation = catch / zero_fun(vulnerable, DEFAULT_DELTA);
        let mut actual = catch;
        if exploitation > self.config.u_max {
            exploitation = self.config.u_max;
            actual = vulnerable * self.config.u_max;
            if let Some(penalty) = self.penalty {
                ctx.penalties.trigger(penalty, &self.config.label, catch, actual);
            }
        }
        self.actual_catches.insert(year, actual);
        self.exploitation.insert(year, exploitation);

        let by_category = self.removals.entry(year).or_default().entry(self.config.label.clone()).or_default();
        for (i, id) in active {
            let sel = ctx.selectivities.get(self.selectivities[i]);
            let category = ctx.partition.get_mut(id);
            let mut removed = vec![0.0; category.data.len()];
            for (slot, n) in category.data.iter_mut().enumerate() {
                removed[slot] = *n * sel.value(slot) * exploitation;
                *n -= removed[slot];
            }
            by_category.insert(category.name.clone(), removed);
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
    use crate::{
        model::state::Phase,
        penalties::PenaltyConfig,
        processes::test_support::{Fixture, constant},
    };

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The exploitation calculation in numbers.
    // - u_max capping and its penalty.
    // - Skipping of initialisation and catch-free years.
    //
    // They intentionally DO NOT cover:
    // - Biomass units (mean weights are 1.0 in the fixture).
    // -------------------------------------------------------------------------

    fn fixture() -> Fixture {
        let mut fx = Fixture::new(
            &["mature.male"],
            1,
            4,
            vec![constant("one", 1.0)],
            vec![PenaltyConfig { label: "catch_penalty".to_string(), multiplier: 1.0, log_scale: false }],
        );
        fx.set("mature.male", vec![100.0; 4]);
        fx
    }

    fn config(catch: f64) -> MortalityEventConfig {
        MortalityEventConfig {
            label: "fishing".to_string(),
            categories: vec!["mature.male".to_string()],
            years: vec![2001],
            catches: vec![catch],
            u_max: 0.5,
            selectivities: vec!["one".to_string()],
            penalty: Some("catch_penalty".to_string()),
            catch_units: CatchUnits::Numbers,
        }
    }

    #[test]
    // Purpose
    // -------
    // A feasible catch is removed proportionally to vulnerability.
    //
    // Given
    // -----
    // - 400 fish vulnerable, catch 100.
    //
    // Expect
    // ------
    // - Exploitation 0.25; 75 left per age; no penalty.
    fn feasible_catch_is_removed() {
        // Arrange
        let mut fx = fixture();
        let mut p = MortalityEvent::new(config(100.0));
        fx.prepare(&mut p).unwrap();

        // Act
        fx.run(&mut p, 2001, 0).unwrap();

        // Assert
        assert_eq!(fx.data("mature.male"), vec![75.0; 4]);
        assert_eq!(p.exploitation()[&2001], 0.25);
        assert_eq!(fx.penalties.iter().next().unwrap().score(), 0.0);
        assert_eq!(p.removals().unwrap()[&2001]["fishing"]["mature.male"], vec![25.0; 4]);
    }

    #[test]
    // Purpose
    // -------
    // An infeasible catch is capped at u_max and penalised.
    //
    // Given
    // -----
    // - 400 vulnerable, catch 300, u_max 0.5.
    //
    // Expect
    // ------
    // - 50 left per age, actual catch 200, penalty (300 - 200)^2.
    fn infeasible_catch_is_capped_and_penalised() {
        // Arrange
        let mut fx = fixture();
        let mut p = MortalityEvent::new(config(300.0));
        fx.prepare(&mut p).unwrap();

        // Act
        fx.run(&mut p, 2001, 0).unwrap();

        // Assert
        assert_eq!(fx.data("mature.male"), vec![50.0; 4]);
        assert_eq!(p.actual_catches()[&2001], 200.0);
        assert_eq!(fx.penalties.iter().next().unwrap().score(), 10_000.0);
    }

    #[test]
    // Purpose
    // -------
    // Nothing happens outside catch years or during initialisation.
    //
    // Given
    // -----
    // - Catch only in 2001.
    //
    // Expect
    // ------
    // - Abundance unchanged for 2000 and for an initialisation pass in 2001.
    fn skips_years_without_catch_and_initialisation() {
        // Arrange
        let mut fx = fixture();
        let mut p = MortalityEvent::new(config(100.0));
        fx.prepare(&mut p).unwrap();

        // Act
        fx.run(&mut p, 2000, 0).unwrap();
        fx.run_in(&mut p, 2001, 0, Phase::Initialise(0)).unwrap();

        // Assert
        assert_eq!(fx.data("mature.male"), vec![100.0; 4]);
    }

    #[test]
    // Purpose
    // -------
    // Duplicate catch years are rejected.
    //
    // Given
    // -----
    // - years [2001, 2001].
    //
    // Expect
    // ------
    // - `InvalidParameter` on years.
    fn validate_rejects_duplicate_years() {
        // Arrange
        let fx = fixture();
        let mut cfg = config(1.0);
        cfg.years = vec![2001, 2001];
        cfg.catches = vec![1.0, 2.0];
        let mut p = MortalityEvent::new(cfg);

        // Act
        let err = fx.prepare(&mut p).unwrap_err();

        // Assert
        match err {
            ProcessError::InvalidParameter { parameter, .. } => assert_eq!(parameter, "years"),
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }
}
