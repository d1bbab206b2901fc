//! penalties — soft-failure accounting for infeasible catches.
//!
//! Purpose
//! -------
//! Record, per model iteration, how far a process fell short of what was
//! asked of it (a catch that exceeded `u_max` of the vulnerable stock).
//! The objective function adds the recorded scores so a minimiser steers
//! away from infeasible parameter regions instead of the run aborting.
//!
//! Key behaviors
//! -------------
//! - [`Penalty::trigger`] stores `(v1 - v2)^2 * multiplier`, or the log-scale
//!   form `(ln v1 - ln v2)^2 * multiplier`.
//! - Flags are cleared at the start of each iteration by
//!   [`Penalties::reset`].
//!
//! Invariants & assumptions
//! ------------------------
//! - A triggered penalty with `v1 != v2` always has a strictly positive
//!   score when `multiplier > 0`.
use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::model::errors::{ModelError, ModelResult};

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PenaltyConfig {
    pub label: String,
    #[serde(default = "one")]
    pub multiplier: f64,
    #[serde(default)]
    pub log_scale: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyFlag {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PenaltyId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Penalty {
    label: String,
    multiplier: f64,
    log_scale: bool,
    flags: Vec<PenaltyFlag>,
}

impl Penalty {
    pub fn new(config: &PenaltyConfig) -> ModelResult<Self> {
        if config.multiplier < 0.0 {
            return Err(ModelError::config(
                format!("penalty[{}].multiplier", config.label),
                "must be non-negative",
            ));
        }
        Ok(Self {
            label: config.label.clone(),
            multiplier: config.multiplier,
            log_scale: config.log_scale,
            flags: Vec::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Record a shortfall between what `source` wanted (`value_1`) and what
    /// it achieved (`value_2`).
    pub fn trigger(&mut self, source: &str, value_1: f64, value_2: f64) {
        let value = if self.log_scale {
            (value_1.ln() - value_2.ln()).powi(2) * self.multiplier
        } else {
            (value_1 - value_2).powi(2) * self.multiplier
        };
        debug!(penalty = %self.label, source, value_1, value_2, value, "penalty triggered");
        self.flags.push(PenaltyFlag { label: format!("{}({})", self.label, source), value });
    }

    pub fn flags(&self) -> &[PenaltyFlag] {
        &self.flags
    }

    pub fn score(&self) -> f64 {
        self.flags.iter().map(|f| f.value).sum()
    }

    pub fn reset(&mut self) {
        self.flags.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Penalties {
    items: Vec<Penalty>,
    index: HashMap<String, PenaltyId>,
}

impl Penalties {
    pub fn new(configs: &[PenaltyConfig]) -> ModelResult<Self> {
        let mut out = Self::default();
        for config in configs {
            if out.index.contains_key(&config.label) {
                return Err(ModelError::config(
                    format!("penalty[{}]", config.label),
                    "has been defined more than once",
                ));
            }
            out.index.insert(config.label.clone(), PenaltyId(out.items.len()));
            out.items.push(Penalty::new(config)?);
        }
        Ok(out)
    }

    pub fn id(&self, label: &str) -> Option<PenaltyId> {
        self.index.get(label).copied()
    }

    pub fn get(&self, id: PenaltyId) -> &Penalty {
        &self.items[id.0]
    }

    pub fn trigger(&mut self, id: PenaltyId, source: &str, value_1: f64, value_2: f64) {
        self.items[id.0].trigger(source, value_1, value_2);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Penalty> {
        self.items.iter()
    }

    pub fn reset(&mut self) {
        self.items.iter_mut().for_each(Penalty::reset);
    }
}
