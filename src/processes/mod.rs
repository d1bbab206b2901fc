//! processes — per-time-step operators on the partition.
//!
//! Purpose
//! -------
//! Define the [`Process`] contract every population-dynamics operator
//! follows, the contexts they receive, and the label-indexed store the
//! model keeps them in.
//!
//! Key behaviors
//! -------------
//! - Lifecycle: `validate → build → (reset; execute per time step)*`.
//!   `validate` checks configuration shape, `build` resolves labels into
//!   ids, `reset` clears per-run working state, `execute` mutates the
//!   partition for one time step.
//! - Processes never own the partition: they receive a
//!   [`ExecutionContext`] borrowing it, together with selectivities,
//!   penalties and derived quantities, for the duration of one call.
//!
//! Invariants & assumptions
//! ------------------------
//! - A process is built once per model and executed many times; every
//!   `execute` must depend only on the partition, its own parameters and
//!   the context, never on working state left from a previous run.
//!
//! Downstream usage
//! ----------------
//! - Configuration enters through [`ProcessConfig`] (`type` keyed), turned
//!   into a boxed process by [`ProcessConfig::into_process`].
//! - Observations read removals through [`Process::removals`].
use std::collections::{BTreeMap, HashMap};

use crate::{
    biology::Selectivities,
    model::{derived_quantities::DerivedQuantities, objects::Addressable, state::RunState},
    partition::{Categories, Partition},
    penalties::Penalties,
};

pub mod ageing;
pub mod common;
pub mod errors;
pub mod factory;
pub mod mortality_constant_rate;
pub mod mortality_disease_rate;
pub mod mortality_event;
pub mod mortality_instantaneous;
pub mod recruitment_beverton_holt;
pub mod recruitment_constant;
pub mod tag_by_age;
pub mod transition_category;

// ---- Re-exports (primary public surface) ----
pub use self::errors::{ProcessError, ProcessResult};
pub use self::factory::ProcessConfig;

/// `[year][fishery or method][category] -> per slot values`.
pub type Removals = BTreeMap<u32, BTreeMap<String, BTreeMap<String, Vec<f64>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessType {
    Ageing,
    Mortality,
    Recruitment,
    Tagging,
    Transition,
}

/// Everything a process may consult while validating and building.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub partition: &'a Partition,
    pub categories: &'a Categories,
    pub selectivities: &'a Selectivities,
    pub penalties: &'a Penalties,
    pub derived_quantities: &'a DerivedQuantities,
    pub time_steps: &'a [String],
    /// Time step indices this process has been assigned to, ascending.
    pub assigned_time_steps: &'a [usize],
    pub initialisation_phases: &'a [String],
    pub years: &'a [u32],
}

/// Borrowed model state for one `execute` call.
#[derive(Debug)]
pub struct ExecutionContext<'a> {
    pub partition: &'a mut Partition,
    pub selectivities: &'a Selectivities,
    pub penalties: &'a mut Penalties,
    pub derived_quantities: &'a DerivedQuantities,
    pub state: RunState,
}

pub trait Process: Addressable + std::fmt::Debug {
    fn label(&self) -> &str;
    fn process_type(&self) -> ProcessType;
    /// Configuration `type` key.
    fn sub_type(&self) -> &'static str;

    fn validate(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()>;
    fn build(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()>;
    fn reset(&mut self) {}
    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> ProcessResult<()>;

    /// Removals by year, method and category, for processes that record them.
    fn removals(&self) -> Option<&Removals> {
        None
    }

    /// Fishery labels owned by this process; each may appear once per model.
    fn fishery_labels(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Label-indexed process store.
#[derive(Debug, Default)]
pub struct Processes {
    items: Vec<Box<dyn Process>>,
    index: HashMap<String, usize>,
}

impl Processes {
    pub fn push(&mut self, process: Box<dyn Process>) -> Option<()> {
        if self.index.contains_key(process.label()) {
            return None;
        }
        self.index.insert(process.label().to_string(), self.items.len());
        self.items.push(process);
        Some(())
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, i: usize) -> &dyn Process {
        self.items[i].as_ref()
    }

    pub fn get_mut(&mut self, i: usize) -> &mut (dyn Process + 'static) {
        self.items[i].as_mut()
    }

    pub fn by_label(&self, label: &str) -> Option<&dyn Process> {
        self.index_of(label).map(|i| self.items[i].as_ref())
    }

    pub fn by_label_mut(&mut self, label: &str) -> Option<&mut (dyn Process + 'static)> {
        let i = self.index_of(label)?;
        Some(self.items[i].as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Process> {
        self.items.iter().map(|p| p.as_ref())
    }

    pub fn reset(&mut self) {
        self.items.iter_mut().for_each(|p| p.reset());
    }
}
