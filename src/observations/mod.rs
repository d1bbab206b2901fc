//! observations — expected values from the partition, scored against data.
//!
//! Purpose
//! -------
//! Produce one [`Comparison`] per observed datum each model iteration and
//! score them through the configured likelihood. Observations read the
//! partition (or a process's recorded removals) and never mutate it.
//!
//! Key behaviors
//! -------------
//! - Lifecycle: `build → (reset; [pre_execute; execute] per observed year;
//!   finalise; calculate_score)*`. `pre_execute` snapshots the partition
//!   before the observation's time step runs; `execute` runs after the time
//!   step's processes and interpolates
//!   `before + (after - before) * time_step_proportion`.
//! - `finalise` runs once after the last model year for work that needs
//!   every year at once (analytical catchability, composition rescaling).
//! - The score of an observation is
//!   `likelihood_multiplier * Σ_year (initial_score + Σ comparison.score)`.
//! - `simulate` replaces observed values with draws from the likelihood,
//!   using the explicit [`ModelRng`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Comparisons are cleared on `reset`, so scores never carry over between
//!   iterations.
//! - Observation years are a subset of the model years, and the time step
//!   label resolves at build.
//!
//! Downstream usage
//! ----------------
//! - The model drives [`Observations::pre_execute`] and
//!   [`Observations::execute`] from its annual loop; the objective function
//!   reads [`Observation::score`] per label.
use std::{collections::BTreeMap, fmt::Debug};

use serde::Deserialize;

use crate::{
    biology::{AgeingErrors, Selectivities},
    likelihoods::{Comparisons, LikelihoodId, LikelihoodResult, Likelihoods},
    model::objects::Addressable,
    partition::{Categories, Partition},
    processes::Processes,
    rng::ModelRng,
    utils::DEFAULT_DELTA,
};

pub mod abundance;
pub mod catchability;
pub mod composition;
pub mod errors;
pub mod proportions_at_age;
pub mod process_removals_by_age;

// ---- Re-exports (primary public surface) ----
pub use self::catchability::{Catchabilities, Catchability, CatchabilityConfig, NuisancePrior};
pub use self::errors::{ObservationError, ObservationResult};

use self::{
    abundance::{Index, IndexConfig, IndexKind},
    proportions_at_age::{ProportionsAtAge, ProportionsAtAgeConfig},
    process_removals_by_age::{ProcessRemovalsByAge, ProcessRemovalsByAgeConfig},
};

fn one() -> f64 {
    1.0
}

fn half() -> f64 {
    0.5
}

fn default_delta() -> f64 {
    DEFAULT_DELTA
}

/// Fields every observation type shares.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObservationSettings {
    pub label: String,
    pub time_step: String,
    /// Likelihood label; built-in families are available by type name.
    pub likelihood: String,
    #[serde(default = "default_delta")]
    pub delta: f64,
    #[serde(default)]
    pub process_error: f64,
    #[serde(default = "one")]
    pub likelihood_multiplier: f64,
    #[serde(default = "one")]
    pub error_value_multiplier: f64,
    #[serde(default = "half")]
    pub time_step_proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObservationConfig {
    Abundance(IndexConfig),
    Biomass(IndexConfig),
    ProportionsAtAge(ProportionsAtAgeConfig),
    ProcessRemovalsByAge(ProcessRemovalsByAgeConfig),
}

impl ObservationConfig {
    pub fn label(&self) -> &str {
        match self {
            Self::Abundance(c) | Self::Biomass(c) => &c.settings.label,
            Self::ProportionsAtAge(c) => &c.settings.label,
            Self::ProcessRemovalsByAge(c) => &c.settings.label,
        }
    }

    pub fn into_observation(self) -> Box<dyn Observation> {
        match self {
            Self::Abundance(c) => Box::new(Index::new(c, IndexKind::Abundance)),
            Self::Biomass(c) => Box::new(Index::new(c, IndexKind::Biomass)),
            Self::ProportionsAtAge(c) => Box::new(ProportionsAtAge::new(c)),
            Self::ProcessRemovalsByAge(c) => Box::new(ProcessRemovalsByAge::new(c)),
        }
    }
}

/// State every observation carries: resolved settings plus this
/// iteration's comparisons and per-year scores.
///
/// `settings` is the live copy; addressables write into it.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationCore {
    pub settings: ObservationSettings,
    pub years: Vec<u32>,
    pub time_step: usize,
    pub likelihood: LikelihoodId,
    /// Family of the resolved likelihood.
    pub likelihood_kind: &'static str,
    pub comparisons: Comparisons,
    pub scores: BTreeMap<u32, f64>,
}

impl ObservationCore {
    pub fn new(settings: ObservationSettings) -> Self {
        Self {
            settings,
            years: Vec::new(),
            time_step: 0,
            likelihood: LikelihoodId(0),
            likelihood_kind: "",
            comparisons: Comparisons::new(),
            scores: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.settings.label
    }

    /// Resolve the time step and likelihood, and check `years` against the
    /// model years.
    ///
    /// Errors
    /// ------
    /// - `UnknownLabel` for an undefined time step or likelihood, or a
    ///   likelihood family outside `allowed`.
    /// - `InvalidParameter` for a year outside the model or an invalid
    ///   proportion or multiplier.
    pub fn resolve(
        &mut self, ctx: &ObservationBuildContext<'_>, years: Vec<u32>, allowed: &[&str],
    ) -> ObservationResult<()> {
        let label = self.settings.label.clone();
        self.time_step = ctx.time_steps.iter().position(|t| *t == self.settings.time_step).ok_or_else(|| {
            ObservationError::UnknownLabel {
                observation: label.clone(),
                kind: "time_step",
                label: self.settings.time_step.clone(),
                reason: "it is not defined",
            }
        })?;
        self.likelihood = ctx.likelihoods.id(&self.settings.likelihood)?;
        let kind = ctx.likelihoods.get(self.likelihood).kind();
        self.likelihood_kind = kind;
        if !allowed.contains(&kind) {
            return Err(ObservationError::UnknownLabel {
                observation: label,
                kind: "likelihood",
                label: self.settings.likelihood.clone(),
                reason: "its family cannot score this observation type",
            });
        }
        if let Some(year) = years.iter().find(|y| !ctx.years.contains(y)) {
            return Err(ObservationError::InvalidParameter {
                observation: label,
                parameter: "years",
                reason: format!("{year} is not a model year"),
            });
        }
        if !(0.0..=1.0).contains(&self.settings.time_step_proportion) {
            return Err(ObservationError::InvalidParameter {
                observation: label,
                parameter: "time_step_proportion",
                reason: format!("{} is outside [0, 1]", self.settings.time_step_proportion),
            });
        }
        if self.settings.delta <= 0.0 || self.settings.process_error < 0.0 {
            return Err(ObservationError::InvalidParameter {
                observation: label,
                parameter: "delta",
                reason: "delta must be positive and process_error non-negative".to_string(),
            });
        }
        self.years = years;
        Ok(())
    }

    /// `true` when this observation runs in `year` at `time_step`.
    pub fn is_due(&self, year: u32, time_step: usize) -> bool {
        self.time_step == time_step && self.years.contains(&year)
    }

    pub fn clear(&mut self) {
        self.comparisons.clear();
        self.scores.clear();
    }

    /// Score the comparisons and store the per-year totals.
    pub fn calculate_score(&mut self, likelihoods: &Likelihoods) -> f64 {
        let likelihood = likelihoods.get(self.likelihood);
        likelihood.get_scores(&mut self.comparisons);
        self.scores.clear();
        for (year, row) in &self.comparisons {
            let total = likelihood.initial_score(&self.comparisons, *year) + row.iter().map(|c| c.score).sum::<f64>();
            self.scores.insert(*year, total * self.settings.likelihood_multiplier);
        }
        self.score()
    }

    pub fn score(&self) -> f64 {
        self.scores.values().sum()
    }
}

/// Model collaborators an observation resolves labels against.
#[derive(Debug, Clone, Copy)]
pub struct ObservationBuildContext<'a> {
    pub partition: &'a Partition,
    pub categories: &'a Categories,
    pub selectivities: &'a Selectivities,
    pub ageing_errors: &'a AgeingErrors,
    pub catchabilities: &'a Catchabilities,
    pub likelihoods: &'a Likelihoods,
    pub processes: &'a Processes,
    pub time_steps: &'a [String],
    pub years: &'a [u32],
}

/// Borrowed model state at the end of an observed time step.
#[derive(Debug, Clone, Copy)]
pub struct ObservationContext<'a> {
    pub partition: &'a Partition,
    pub selectivities: &'a Selectivities,
    pub ageing_errors: &'a AgeingErrors,
    pub catchabilities: &'a Catchabilities,
    pub processes: &'a Processes,
    pub year: u32,
}

pub trait Observation: Addressable + Debug {
    fn core(&self) -> &ObservationCore;
    fn core_mut(&mut self) -> &mut ObservationCore;
    /// Configuration `type` key.
    fn kind(&self) -> &'static str;

    fn build(&mut self, ctx: &ObservationBuildContext<'_>) -> ObservationResult<()>;

    /// Snapshot whatever the observation interpolates from.
    fn pre_execute(&mut self, _partition: &Partition) {}

    /// Append this year's comparisons.
    fn execute(&mut self, ctx: &ObservationContext<'_>) -> ObservationResult<()>;

    /// Work needing every observed year, run once per iteration.
    fn finalise(&mut self, _catchabilities: &mut Catchabilities) -> ObservationResult<()> {
        Ok(())
    }

    fn label(&self) -> &str {
        self.core().label()
    }

    fn reset(&mut self) {
        self.core_mut().clear();
    }

    fn calculate_score(&mut self, likelihoods: &Likelihoods) -> f64 {
        self.core_mut().calculate_score(likelihoods)
    }

    fn score(&self) -> f64 {
        self.core().score()
    }

    fn comparisons(&self) -> &Comparisons {
        &self.core().comparisons
    }

    /// Replace observed values with draws from the fitted likelihood.
    fn simulate(&mut self, likelihoods: &Likelihoods, rng: &mut ModelRng) -> LikelihoodResult<()> {
        let core = self.core_mut();
        likelihoods.get(core.likelihood).simulate_observed(&mut core.comparisons, rng)
    }
}

/// Shared addressables: `likelihood_multiplier`, `error_value_multiplier`,
/// `process_error`.
pub(crate) fn settings_addressable<'a>(
    settings: &'a mut ObservationSettings, parameter: &str, index: Option<&str>,
) -> Option<&'a mut f64> {
    if index.is_some() {
        return None;
    }
    match parameter {
        "likelihood_multiplier" => Some(&mut settings.likelihood_multiplier),
        "error_value_multiplier" => Some(&mut settings.error_value_multiplier),
        "process_error" => Some(&mut settings.process_error),
        _ => None,
    }
}

/// Label-indexed observation store.
#[derive(Debug, Default)]
pub struct Observations {
    items: Vec<Box<dyn Observation>>,
}

impl Observations {
    pub fn new(configs: &[ObservationConfig]) -> ObservationResult<Self> {
        let mut out = Self::default();
        for config in configs {
            if out.items.iter().any(|o| o.label() == config.label()) {
                return Err(ObservationError::DuplicateLabel {
                    kind: "observation",
                    label: config.label().to_string(),
                });
            }
            out.items.push(config.clone().into_observation());
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn build(&mut self, ctx: &ObservationBuildContext<'_>) -> ObservationResult<()> {
        self.items.iter_mut().try_for_each(|o| o.build(ctx))
    }

    pub fn reset(&mut self) {
        self.items.iter_mut().for_each(|o| o.reset());
    }

    pub fn pre_execute(&mut self, partition: &Partition, year: u32, time_step: usize) {
        for o in self.items.iter_mut().filter(|o| o.core().is_due(year, time_step)) {
            o.pre_execute(partition);
        }
    }

    pub fn execute(&mut self, ctx: &ObservationContext<'_>, time_step: usize) -> ObservationResult<()> {
        for o in self.items.iter_mut().filter(|o| o.core().is_due(ctx.year, time_step)) {
            o.execute(ctx)?;
        }
        Ok(())
    }

    pub fn finalise(&mut self, catchabilities: &mut Catchabilities) -> ObservationResult<()> {
        self.items.iter_mut().try_for_each(|o| o.finalise(catchabilities))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Observation> {
        self.items.iter().map(|o| o.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Observation + 'static)> {
        self.items.iter_mut().map(|o| o.as_mut())
    }

    pub fn by_label(&self, label: &str) -> Option<&dyn Observation> {
        self.items.iter().find(|o| o.label() == label).map(|o| o.as_ref())
    }

    pub fn by_label_mut(&mut self, label: &str) -> Option<&mut (dyn Observation + 'static)> {
        self.items.iter_mut().find(|o| o.label() == label).map(|o| o.as_mut())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Type-keyed configuration and label uniqueness in the store.
    // - Build-time resolution failures shared by every observation type.
    //
    // They intentionally DO NOT cover:
    // - Per-type expected values (see each type's module).
    // -------------------------------------------------------------------------

    const INDEX: &str = r#"{
        "type": "abundance", "label": "survey", "time_step": "step1",
        "likelihood": "lognormal", "catchability": "q",
        "categories": ["male"], "selectivities": ["one"],
        "obs": {"2000": [10.0], "2001": [12.0]}, "error_value": [0.2]
    }"#;

    #[test]
    // Purpose
    // -------
    // Two observations with one label are rejected.
    //
    // Given
    // -----
    // - The same abundance block twice.
    //
    // Expect
    // ------
    // - `DuplicateLabel`.
    fn store_rejects_duplicate_labels() {
        // Arrange
        let config: ObservationConfig = serde_json::from_str(INDEX).unwrap();

        // Act
        let err = Observations::new(&[config.clone(), config]).unwrap_err();

        // Assert
        match err {
            ObservationError::DuplicateLabel { kind, label } => {
                assert_eq!(kind, "observation");
                assert_eq!(label, "survey");
            }
            other => panic!("expected DuplicateLabel, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Settings fall back to their documented defaults.
    //
    // Given
    // -----
    // - An abundance block naming only required settings.
    //
    // Expect
    // ------
    // - delta 1e-11, proportion 0.5, unit multipliers, no process error.
    fn settings_defaults_apply() {
        // Arrange / Act
        let config: ObservationConfig = serde_json::from_str(INDEX).unwrap();

        // Assert
        let ObservationConfig::Abundance(c) = config else { panic!("expected abundance") };
        assert_eq!(c.settings.delta, DEFAULT_DELTA);
        assert_eq!(c.settings.time_step_proportion, 0.5);
        assert_eq!(c.settings.likelihood_multiplier, 1.0);
        assert_eq!(c.settings.error_value_multiplier, 1.0);
        assert_eq!(c.settings.process_error, 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Unknown time steps and unsuitable likelihood families fail at build.
    //
    // Given
    // -----
    // - An index on "step9", then one scored by "multinomial".
    //
    // Expect
    // ------
    // - `UnknownLabel` naming the time step, then the likelihood.
    fn build_rejects_unknown_references() {
        // Arrange
        let fixture = test_support::Fixture::new(
            vec![CatchabilityConfig::Free { label: "q".to_string(), q: 1.0 }],
            vec![],
        );
        let bad_step = INDEX.replace("step1", "step9");
        let bad_likelihood = INDEX.replace("\"lognormal\"", "\"multinomial\"");

        // Act
        let mut first = serde_json::from_str::<ObservationConfig>(&bad_step).unwrap().into_observation();
        let mut second = serde_json::from_str::<ObservationConfig>(&bad_likelihood).unwrap().into_observation();
        let first = first.build(&fixture.build_ctx()).unwrap_err();
        let second = second.build(&fixture.build_ctx()).unwrap_err();

        // Assert
        assert!(matches!(first, ObservationError::UnknownLabel { kind: "time_step", .. }), "{first:?}");
        assert!(matches!(second, ObservationError::UnknownLabel { kind: "likelihood", .. }), "{second:?}");
    }
}
