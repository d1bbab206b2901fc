//! model::derived_quantities — abundance and biomass summaries.
//!
//! Purpose
//! -------
//! Summarise the partition at the end of a configured time step, once per
//! initialisation-phase iteration and once per model year. Recruitment
//! processes read these values (SSB, B0) during later years.
//!
//! Key behaviors
//! -------------
//! - `abundance`: `Σ N(slot) * sel(slot)` over the categories.
//! - `biomass`: the same weighted by mean weight.
//! - A year `g` years before the model start reads the `g`-th last value
//!   of the final initialisation phase, so lagged SSB lookups early in the
//!   time series step back through the equilibrium iterations. Past the
//!   start of that phase it reads the first value of the phase before it,
//!   or of the final phase when there is only one.
use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::{
    biology::{Selectivities, SelectivityId},
    model::{
        errors::{ModelError, ModelResult},
        state::{Phase, RunState},
    },
    partition::{Categories, CategoriesAccessor, Partition},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedQuantityKind {
    Abundance,
    Biomass,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DerivedQuantityConfig {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: DerivedQuantityKind,
    pub time_step: String,
    pub categories: Vec<String>,
    pub selectivities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedQuantity {
    config: DerivedQuantityConfig,
    time_step: usize,
    start_year: u32,
    accessor: CategoriesAccessor,
    selectivities: Vec<SelectivityId>,
    initialisation_values: Vec<Vec<f64>>,
    values: BTreeMap<u32, f64>,
}

impl DerivedQuantity {
    pub fn build(
        config: &DerivedQuantityConfig, partition: &Partition, categories: &Categories,
        selectivities: &Selectivities, time_steps: &[String], phases: usize, start_year: u32,
    ) -> ModelResult<Self> {
        let labels = categories.expand_labels(&config.categories, "derived_quantity.categories")?;
        let accessor = CategoriesAccessor::new(partition, &labels)?;
        let sels = selectivities.resolve_list(&config.selectivities, labels.len())?;
        if sels.len() != labels.len() {
            return Err(ModelError::config(
                format!("derived_quantity[{}].selectivities", config.label),
                format!("expected {} selectivities but got {}", labels.len(), sels.len()),
            ));
        }
        let time_step = time_steps.iter().position(|t| *t == config.time_step).ok_or_else(|| {
            ModelError::UnknownObject { kind: "time_step", label: config.time_step.clone() }
        })?;
        Ok(Self {
            config: config.clone(),
            time_step,
            start_year,
            accessor,
            selectivities: sels,
            initialisation_values: vec![Vec::new(); phases],
            values: BTreeMap::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    pub fn reset(&mut self) {
        self.initialisation_values.iter_mut().for_each(Vec::clear);
        self.values.clear();
    }

    pub fn execute(&mut self, partition: &Partition, selectivities: &Selectivities, state: RunState) {
        let mut total = 0.0;
        for (i, id) in self.accessor.active(partition, state.year) {
            let category = partition.get(id);
            let sel = selectivities.get(self.selectivities[i]);
            for (slot, n) in category.data.iter().enumerate() {
                let weight = match self.config.kind {
                    DerivedQuantityKind::Abundance => 1.0,
                    DerivedQuantityKind::Biomass => category.mean_weight[slot],
                };
                total += n * sel.value(slot) * weight;
            }
        }
        match state.phase {
            Phase::Initialise(p) => self.initialisation_values[p].push(total),
            Phase::Execute => {
                self.values.insert(state.year, total);
            }
        }
    }

    /// Value at the end of initialisation phase `phase`.
    pub fn initialisation_value(&self, phase: usize) -> Option<f64> {
        self.initialisation_values.get(phase)?.last().copied()
    }

    pub fn value(&self, year: u32) -> Option<f64> {
        if year >= self.start_year {
            return self.values.get(&year).copied();
        }
        let back = (self.start_year - year) as usize;
        let (last, earlier) = self.initialisation_values.split_last()?;
        if last.len() > back {
            return Some(last[last.len() - back]);
        }
        match earlier.last() {
            Some(previous) => previous.first().copied(),
            None => last.first().copied(),
        }
    }

    pub fn values(&self) -> &BTreeMap<u32, f64> {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DerivedQuantities {
    items: Vec<DerivedQuantity>,
    index: HashMap<String, usize>,
}

impl DerivedQuantities {
    pub fn push(&mut self, dq: DerivedQuantity) -> ModelResult<()> {
        if self.index.contains_key(dq.label()) {
            return Err(ModelError::config(
                format!("derived_quantity[{}]", dq.label()),
                "has been defined more than once",
            ));
        }
        self.index.insert(dq.label().to_string(), self.items.len());
        self.items.push(dq);
        Ok(())
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn labels(&self) -> Vec<String> {
        self.items.iter().map(|d| d.label().to_string()).collect()
    }

    pub fn get(&self, i: usize) -> &DerivedQuantity {
        &self.items[i]
    }

    pub fn by_label(&self, label: &str) -> Option<&DerivedQuantity> {
        self.index_of(label).map(|i| &self.items[i])
    }

    pub fn reset(&mut self) {
        self.items.iter_mut().for_each(DerivedQuantity::reset);
    }

    /// Run every quantity attached to `state.time_step`.
    pub fn execute(&mut self, partition: &Partition, selectivities: &Selectivities, state: RunState) {
        for dq in self.items.iter_mut().filter(|d| d.time_step == state.time_step) {
            dq.execute(partition, selectivities, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        biology::{SelectivityConfig, SelectivityShape},
        partition::{CategoriesConfig, PartitionStructure},
    };

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Selectivity-weighted abundance and weight-weighted biomass.
    // - Storage per initialisation phase and per year, and pre-start
    //   lookups stepping back through the initialisation values.
    //
    // They intentionally DO NOT cover:
    // - Scheduling within a model run (see model.rs).
    // -------------------------------------------------------------------------

    struct Setup {
        partition: Partition,
        categories: Categories,
        selectivities: Selectivities,
    }

    fn setup() -> Setup {
        let categories = Categories::new(&CategoriesConfig {
            format: "sex".to_string(),
            names: vec!["male".to_string(), "female".to_string()],
            age_lengths: vec![],
            years: BTreeMap::new(),
        })
        .unwrap();
        let mut partition =
            Partition::build(PartitionStructure::Age, 1, 3, true, &[], &categories, |_| None).unwrap();
        partition.category_mut("male").unwrap().data = vec![10.0, 20.0, 30.0];
        partition.category_mut("female").unwrap().data = vec![1.0, 2.0, 3.0];
        let mut selectivities = Selectivities::new(&[SelectivityConfig {
            label: "half".to_string(),
            shape: SelectivityShape::Constant { c: 0.5 },
        }])
        .unwrap();
        selectivities.rebuild_all(&partition.x_values()).unwrap();
        Setup { partition, categories, selectivities }
    }

    fn config(kind: DerivedQuantityKind) -> DerivedQuantityConfig {
        DerivedQuantityConfig {
            label: "ssb".to_string(),
            kind,
            time_step: "step2".to_string(),
            categories: vec!["male".to_string(), "female".to_string()],
            selectivities: vec!["half".to_string()],
        }
    }

    fn steps() -> Vec<String> {
        vec!["step1".to_string(), "step2".to_string()]
    }

    #[test]
    // Purpose
    // -------
    // Abundance is the selectivity-weighted total and lands in the right
    // store for the phase.
    //
    // Given
    // -----
    // - Totals 60 + 6 at selectivity 0.5; one execute per phase kind.
    //
    // Expect
    // ------
    // - 33 recorded for initialisation phase 0 and for year 2000.
    fn abundance_is_recorded_per_phase_and_year() {
        // Arrange
        let s = setup();
        let mut dq = DerivedQuantity::build(
            &config(DerivedQuantityKind::Abundance),
            &s.partition,
            &s.categories,
            &s.selectivities,
            &steps(),
            1,
            2000,
        )
        .unwrap();

        // Act
        dq.execute(&s.partition, &s.selectivities, RunState { year: 2000, time_step: 1, phase: Phase::Initialise(0) });
        dq.execute(&s.partition, &s.selectivities, RunState { year: 2000, time_step: 1, phase: Phase::Execute });

        // Assert
        assert_eq!(dq.time_step(), 1);
        assert_eq!(dq.initialisation_value(0), Some(33.0));
        assert_eq!(dq.value(2000), Some(33.0));
        assert_eq!(dq.value(2001), None);
    }

    #[test]
    // Purpose
    // -------
    // The year before the model start reads the last initialisation value.
    //
    // Given
    // -----
    // - Two initialisation executes with different abundances.
    //
    // Expect
    // ------
    // - `value(1999)` equals the second; `reset` clears everything.
    fn year_before_start_uses_last_initialisation_value() {
        // Arrange
        let mut s = setup();
        let mut dq = DerivedQuantity::build(
            &config(DerivedQuantityKind::Abundance),
            &s.partition,
            &s.categories,
            &s.selectivities,
            &steps(),
            1,
            2000,
        )
        .unwrap();
        let state = RunState { year: 2000, time_step: 1, phase: Phase::Initialise(0) };
        dq.execute(&s.partition, &s.selectivities, state);
        s.partition.category_mut("female").unwrap().data = vec![0.0; 3];

        // Act
        dq.execute(&s.partition, &s.selectivities, state);

        // Assert
        assert_eq!(dq.value(1999), Some(30.0));
        dq.reset();
        assert_eq!(dq.value(1999), None);
    }

    #[test]
    // Purpose
    // -------
    // Years further before the start step back through the final
    // initialisation phase, then fall back to the first value of the phase
    // before it.
    //
    // Given
    // -----
    // - Start 2000; phase 0 records 1, 2 and phase 1 records 3, 4, 5; the
    //   same values again with phase 1 as the only phase.
    //
    // Expect
    // ------
    // - 1999 -> 5, 1998 -> 4, 1997 and earlier -> 1 with two phases; 1997
    //   -> 3 with one.
    fn pre_start_years_step_back_through_initialisation() {
        // Arrange
        let mut s = setup();
        s.partition.category_mut("female").unwrap().data = vec![0.0; 3];
        let mut build = |phases: usize, recorded: &[(usize, f64)]| {
            let mut dq = DerivedQuantity::build(
                &config(DerivedQuantityKind::Abundance),
                &s.partition,
                &s.categories,
                &s.selectivities,
                &steps(),
                phases,
                2000,
            )
            .unwrap();
            for (phase, total) in recorded {
                s.partition.category_mut("male").unwrap().data = vec![2.0 * total, 0.0, 0.0];
                let state = RunState { year: 2000, time_step: 1, phase: Phase::Initialise(*phase) };
                dq.execute(&s.partition, &s.selectivities, state);
            }
            dq
        };

        // Act
        let two = build(2, &[(0, 1.0), (0, 2.0), (1, 3.0), (1, 4.0), (1, 5.0)]);
        let one = build(1, &[(0, 3.0), (0, 4.0), (0, 5.0)]);

        // Assert
        assert_eq!(two.value(1999), Some(5.0));
        assert_eq!(two.value(1998), Some(4.0));
        assert_eq!(two.value(1997), Some(1.0));
        assert_eq!(two.value(1990), Some(1.0));
        assert_eq!(one.value(1999), Some(5.0));
        assert_eq!(one.value(1997), Some(3.0));
    }

    #[test]
    // Purpose
    // -------
    // Biomass weights by mean weight, and duplicate labels are rejected.
    //
    // Given
    // -----
    // - Default mean weight of 1; the same label pushed twice.
    //
    // Expect
    // ------
    // - Biomass equals abundance; the second push is a `Config` error.
    fn biomass_uses_mean_weight_and_labels_are_unique() {
        // Arrange
        let s = setup();
        let build = || {
            DerivedQuantity::build(
                &config(DerivedQuantityKind::Biomass),
                &s.partition,
                &s.categories,
                &s.selectivities,
                &steps(),
                1,
                2000,
            )
            .unwrap()
        };
        let mut store = DerivedQuantities::default();
        store.push(build()).unwrap();

        // Act
        store.execute(&s.partition, &s.selectivities, RunState { year: 2003, time_step: 1, phase: Phase::Execute });
        let err = store.push(build()).unwrap_err();

        // Assert
        assert_eq!(store.by_label("ssb").and_then(|d| d.value(2003)), Some(33.0));
        match err {
            ModelError::Config { .. } => {}
            other => panic!("expected Config, got {other:?}"),
        }
    }
}
