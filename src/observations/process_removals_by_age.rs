//! Proportions at age of the removals a mortality process recorded.
//!
//! Reads `removals()[year][method][category]` from the named process,
//! sums members of each category collection, collapses onto the observed
//! age range and normalises. `method` is a fishery label for
//! `mortality_instantaneous` and defaults to the process label, which is
//! what single-method processes record under.
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    model::objects::Addressable,
    observations::{
        Observation, ObservationBuildContext, ObservationContext, ObservationCore, ObservationSettings,
        composition::{AgeRange, CompositionTable},
        errors::{ObservationError, ObservationResult},
        proportions_at_age::COMPOSITION_LIKELIHOODS,
        settings_addressable,
    },
    partition::CombinedCategories,
    utils::PROPORTION_TOLERANCE,
};

fn yes() -> bool {
    true
}

fn default_tolerance() -> f64 {
    PROPORTION_TOLERANCE
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessRemovalsByAgeConfig {
    #[serde(flatten)]
    pub settings: ObservationSettings,
    pub process: String,
    /// One method, or one per collection; empty means the process label.
    #[serde(default)]
    pub method_of_removal: Vec<String>,
    pub min_age: u32,
    pub max_age: u32,
    #[serde(default = "yes")]
    pub plus_group: bool,
    pub categories: Vec<String>,
    #[serde(deserialize_with = "crate::utils::year_map")]
    pub obs: BTreeMap<u32, Vec<f64>>,
    #[serde(deserialize_with = "crate::utils::year_map")]
    pub error_values: BTreeMap<u32, Vec<f64>>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRemovalsByAge {
    config: ProcessRemovalsByAgeConfig,
    core: ObservationCore,
    labels: Vec<String>,
    methods: Vec<String>,
    range: AgeRange,
    table: CompositionTable,
    combined: CombinedCategories,
}

impl ProcessRemovalsByAge {
    pub fn new(config: ProcessRemovalsByAgeConfig) -> Self {
        let core = ObservationCore::new(config.settings.clone());
        let range = AgeRange { min_age: config.min_age, max_age: config.max_age, plus_group: config.plus_group };
        Self {
            config,
            core,
            labels: Vec::new(),
            methods: Vec::new(),
            range,
            table: CompositionTable::default(),
            combined: CombinedCategories::default(),
        }
    }
}

impl Addressable for ProcessRemovalsByAge {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        settings_addressable(&mut self.core.settings, parameter, index)
    }
}

impl Observation for ProcessRemovalsByAge {
    fn core(&self) -> &ObservationCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObservationCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        "process_removals_by_age"
    }

    fn build(&mut self, ctx: &ObservationBuildContext<'_>) -> ObservationResult<()> {
        self.core = ObservationCore::new(self.config.settings.clone());
        let label = self.core.label().to_string();
        let process = ctx.processes.by_label(&self.config.process).ok_or_else(|| ObservationError::UnknownLabel {
            observation: label.clone(),
            kind: "process",
            label: self.config.process.clone(),
            reason: "it is not defined",
        })?;
        if process.removals().is_none() {
            return Err(ObservationError::UnknownLabel {
                observation: label,
                kind: "process",
                label: self.config.process.clone(),
                reason: "it does not record removals",
            });
        }
        self.range = AgeRange::new(
            &label,
            self.config.min_age,
            self.config.max_age,
            self.config.plus_group,
            ctx.partition.min_age(),
            ctx.partition.max_age(),
        )?;
        self.labels = ctx.categories.expand_labels(&self.config.categories, "categories")?;
        let n = self.labels.len();
        self.methods = match self.config.method_of_removal.len() {
            0 => vec![self.config.process.clone(); n],
            1 => vec![self.config.method_of_removal[0].clone(); n],
            m if m == n => self.config.method_of_removal.clone(),
            found => {
                return Err(ObservationError::LengthMismatch {
                    observation: label,
                    parameter: "method_of_removal",
                    expected: n,
                    found,
                });
            }
        };
        self.table = CompositionTable::new(
            &label,
            &self.config.obs,
            &self.config.error_values,
            n,
            self.range.len(),
            self.config.tolerance,
        )?;
        self.core.resolve(ctx, self.table.years(), &COMPOSITION_LIKELIHOODS)?;
        self.combined = CombinedCategories::new(ctx.partition, &self.labels)?;
        Ok(())
    }

    fn execute(&mut self, ctx: &ObservationContext<'_>) -> ObservationResult<()> {
        let label = self.core.label();
        let missing = |method: &str, category: &str| ObservationError::MissingRemovals {
            observation: label.to_string(),
            method: method.to_string(),
            category: category.to_string(),
            year: ctx.year,
        };
        let removals = ctx
            .processes
            .by_label(&self.config.process)
            .and_then(|p| p.removals())
            .and_then(|r| r.get(&ctx.year));
        let mut expected = Vec::with_capacity(self.labels.len());
        for (g, method) in self.methods.iter().enumerate() {
            let mut row = vec![0.0; self.range.len()];
            for id in self.combined.members_in_year(ctx.partition, g, ctx.year) {
                let category = ctx.partition.get(id);
                let values = removals
                    .and_then(|by_method| by_method.get(method))
                    .and_then(|by_category| by_category.get(&category.name))
                    .ok_or_else(|| missing(method, &category.name))?;
                self.range.collapse(category, values, &mut row);
            }
            expected.push(row);
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{
            derived_quantities::DerivedQuantities,
            state::{Phase, RunState},
        },
        observations::{ObservationConfig, test_support::Fixture},
        penalties::Penalties,
        processes::{BuildContext, ExecutionContext, ProcessConfig},
    };

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Expected proportions from removals recorded by a mortality event.
    // - Missing removals and processes without removals.
    //
    // They intentionally DO NOT cover:
    // - Removal bookkeeping itself (see processes/).
    // -------------------------------------------------------------------------

    fn fishing() -> ProcessConfig {
        serde_json::from_str(
            r#"{
                "type": "mortality_event", "label": "fishing", "categories": ["male"],
                "years": [2001], "catches": [40.0], "u_max": 0.9,
                "selectivities": ["one"]
            }"#,
        )
        .unwrap()
    }

    fn observation(process: &str) -> ObservationConfig {
        let json = format!(
            r#"{{
                "type": "process_removals_by_age", "label": "catch_at_age", "time_step": "step1",
                "likelihood": "multinomial", "process": "{process}",
                "min_age": 1, "max_age": 4, "categories": ["male"],
                "obs": {{"2001": [0.25, 0.25, 0.25, 0.25]}}, "error_values": {{"2001": [50]}}
            }}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    fn run_fishing(f: &mut Fixture, year: u32) {
        let i = f.processes.index_of("fishing").unwrap();
        let mut penalties = Penalties::default();
        let dq = DerivedQuantities::default();
        let mut ctx = ExecutionContext {
            partition: &mut f.partition,
            selectivities: &f.selectivities,
            penalties: &mut penalties,
            derived_quantities: &dq,
            state: RunState { year, time_step: 0, phase: Phase::Execute },
        };
        f.processes.get_mut(i).execute(&mut ctx).unwrap();
    }

    fn fixture() -> Fixture {
        let mut f = Fixture::new(vec![], vec![]);
        let mut process = fishing().into_process();
        let categories = f.categories.clone();
        let dq = DerivedQuantities::default();
        let penalties = Penalties::default();
        let ctx = BuildContext {
            partition: &f.partition,
            categories: &categories,
            selectivities: &f.selectivities,
            penalties: &penalties,
            derived_quantities: &dq,
            time_steps: &f.time_steps,
            assigned_time_steps: &[0],
            initialisation_phases: &[],
            years: &f.years,
        };
        process.validate(&ctx).unwrap();
        process.build(&ctx).unwrap();
        f.processes.push(process).unwrap();
        f
    }

    #[test]
    // Purpose
    // -------
    // Removals at age become the expected composition.
    //
    // Given
    // -----
    // - male = [10, 30, 40, 20] and a catch of 40 under unit selectivity.
    //
    // Expect
    // ------
    // - Expected proportions [0.1, 0.3, 0.4, 0.2].
    fn expected_follows_removals() {
        // Arrange
        let mut f = fixture();
        let mut obs = observation("fishing").into_observation();
        obs.build(&f.build_ctx()).unwrap();
        f.set("male", vec![10.0, 30.0, 40.0, 20.0]);
        run_fishing(&mut f, 2001);

        // Act
        f.observe(obs.as_mut(), 2001, &[], &[]).unwrap();

        // Assert
        let expected: Vec<f64> = obs.comparisons()[&2001].iter().map(|c| c.expected).collect();
        for (got, want) in expected.iter().zip([0.1, 0.3, 0.4, 0.2]) {
            assert!((got - want).abs() < 1e-12, "{expected:?}");
        }
    }

    #[test]
    // Purpose
    // -------
    // A year the process never recorded is reported, not silently zeroed.
    //
    // Given
    // -----
    // - The observation executed in 2001 without running the process.
    //
    // Expect
    // ------
    // - `MissingRemovals` naming method "fishing" and category "male".
    fn missing_removals_are_fatal() {
        // Arrange
        let mut f = fixture();
        let mut obs = observation("fishing").into_observation();
        obs.build(&f.build_ctx()).unwrap();

        // Act
        let err = f.observe(obs.as_mut(), 2001, &[], &[]).unwrap_err();

        // Assert
        match err {
            ObservationError::MissingRemovals { method, category, year, .. } => {
                assert_eq!((method.as_str(), category.as_str(), year), ("fishing", "male", 2001));
            }
            other => panic!("expected MissingRemovals, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // The named process must exist.
    //
    // Given
    // -----
    // - process "trawl" which is not defined.
    //
    // Expect
    // ------
    // - `UnknownLabel` with kind "process".
    fn unknown_process_is_rejected() {
        // Arrange
        let f = fixture();
        let mut obs = observation("trawl").into_observation();

        // Act
        let err = obs.build(&f.build_ctx()).unwrap_err();

        // Assert
        assert!(matches!(err, ObservationError::UnknownLabel { kind: "process", .. }), "{err:?}");
    }
}
