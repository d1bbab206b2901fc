//! biology::selectivity — age or length based multipliers.
//!
//! Purpose
//! -------
//! Evaluate selectivity curves at the partition's evaluation points and
//! cache the result per slot, so processes and observations read a plain
//! `&[f64]`.
//!
//! Key behaviors
//! -------------
//! - Shapes are a closed set keyed by `type` in configuration.
//! - [`Selectivity::rebuild`] recomputes the cache; the model calls it at
//!   every reset so estimated shape parameters take effect.
//!
//! Conventions
//! -----------
//! - Logistic curves use the `19^((a50 - x)/ato95)` form, so the curve is
//!   0.5 at `a50` and 0.95 at `a50 + ato95`.
use std::collections::HashMap;

use serde::Deserialize;

use crate::{
    biology::errors::{BiologyError, BiologyResult},
    model::objects::{Addressable, scalar, vector_element},
};

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectivityShape {
    Constant {
        c: f64,
    },
    Logistic {
        a50: f64,
        ato95: f64,
        #[serde(default = "one")]
        alpha: f64,
    },
    LogisticProducing {
        l: f64,
        h: f64,
        a50: f64,
        ato95: f64,
        #[serde(default = "one")]
        alpha: f64,
    },
    KnifeEdge {
        e: f64,
        #[serde(default = "one")]
        alpha: f64,
    },
    DoubleNormal {
        mu: f64,
        sigma_l: f64,
        sigma_r: f64,
        #[serde(default = "one")]
        alpha: f64,
    },
    AllValues {
        v: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectivityConfig {
    pub label: String,
    #[serde(flatten)]
    pub shape: SelectivityShape,
}

/// Handle into [`Selectivities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectivityId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Selectivity {
    label: String,
    shape: SelectivityShape,
    values: Vec<f64>,
}

impl Selectivity {
    pub fn new(config: &SelectivityConfig) -> BiologyResult<Self> {
        let s = Self { label: config.label.clone(), shape: config.shape.clone(), values: Vec::new() };
        s.validate()?;
        Ok(s)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn shape(&self) -> &SelectivityShape {
        &self.shape
    }

    /// Curve value at evaluation point `x`; `AllValues` is indexed by slot
    /// and evaluates to 0 here.
    pub fn evaluate(&self, x: f64) -> f64 {
        match &self.shape {
            SelectivityShape::Constant { c } => *c,
            SelectivityShape::Logistic { a50, ato95, alpha } => {
                let threshold = (a50 - x) / ato95;
                if threshold > 5.0 {
                    0.0
                } else if threshold < -5.0 {
                    *alpha
                } else {
                    alpha / (1.0 + 19.0_f64.powf(threshold))
                }
            }
            SelectivityShape::LogisticProducing { l, h, a50, ato95, alpha } => {
                if x < *l {
                    return 0.0;
                }
                if x >= *h {
                    return *alpha;
                }
                let lambda = |v: f64| 1.0 / (1.0 + 19.0_f64.powf((a50 - v) / ato95));
                let here = lambda(x);
                if x == *l {
                    return here * alpha;
                }
                let previous = lambda(x - 1.0);
                if previous > 0.9999 {
                    *alpha
                } else {
                    alpha * (here - previous) / (1.0 - previous)
                }
            }
            SelectivityShape::KnifeEdge { e, alpha } => {
                if x >= *e {
                    *alpha
                } else {
                    0.0
                }
            }
            SelectivityShape::DoubleNormal { mu, sigma_l, sigma_r, alpha } => {
                let sigma = if x < *mu { sigma_l } else { sigma_r };
                alpha * 2.0_f64.powf(-((x - mu) / sigma).powi(2))
            }
            SelectivityShape::AllValues { .. } => 0.0,
        }
    }

    /// Recompute the per-slot cache for `x_values`.
    ///
    /// Errors
    /// ------
    /// - Shape parameters outside their domain (e.g. after an estimate
    ///   moved them).
    /// - `ValuesLengthMismatch` for `AllValues` with the wrong length.
    pub fn rebuild(&mut self, x_values: &[f64]) -> BiologyResult<()> {
        self.validate()?;
        self.values = match &self.shape {
            SelectivityShape::AllValues { v } => {
                if v.len() != x_values.len() {
                    return Err(BiologyError::ValuesLengthMismatch {
                        label: self.label.clone(),
                        expected: x_values.len(),
                        found: v.len(),
                    });
                }
                v.clone()
            }
            _ => x_values.iter().map(|x| self.evaluate(*x)).collect(),
        };
        Ok(())
    }

    /// Cached value for partition slot `slot`.
    pub fn value(&self, slot: usize) -> f64 {
        self.values.get(slot).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    // ---- Helper methods ----

    fn validate(&self) -> BiologyResult<()> {
        let invalid = |parameter: &'static str, value: f64, reason: &'static str| {
            Err(BiologyError::InvalidParameter { label: self.label.clone(), parameter, value, reason })
        };
        match &self.shape {
            SelectivityShape::Logistic { ato95, alpha, .. }
            | SelectivityShape::LogisticProducing { ato95, alpha, .. } => {
                if *ato95 <= 0.0 {
                    return invalid("ato95", *ato95, "must be greater than zero");
                }
                if *alpha <= 0.0 {
                    return invalid("alpha", *alpha, "must be greater than zero");
                }
            }
            SelectivityShape::DoubleNormal { sigma_l, sigma_r, alpha, .. } => {
                if *sigma_l <= 0.0 {
                    return invalid("sigma_l", *sigma_l, "must be greater than zero");
                }
                if *sigma_r <= 0.0 {
                    return invalid("sigma_r", *sigma_r, "must be greater than zero");
                }
                if *alpha <= 0.0 {
                    return invalid("alpha", *alpha, "must be greater than zero");
                }
            }
            SelectivityShape::KnifeEdge { alpha, .. } if *alpha <= 0.0 => {
                return invalid("alpha", *alpha, "must be greater than zero");
            }
            _ => {}
        }
        if let SelectivityShape::LogisticProducing { l, h, .. } = &self.shape {
            if h <= l {
                return invalid("h", *h, "must be greater than l");
            }
        }
        Ok(())
    }
}

impl Addressable for Selectivity {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match (&mut self.shape, parameter) {
            (SelectivityShape::Constant { c }, "c") => scalar(c, index),
            (SelectivityShape::Logistic { a50, .. }, "a50")
            | (SelectivityShape::LogisticProducing { a50, .. }, "a50") => scalar(a50, index),
            (SelectivityShape::Logistic { ato95, .. }, "ato95")
            | (SelectivityShape::LogisticProducing { ato95, .. }, "ato95") => scalar(ato95, index),
            (SelectivityShape::Logistic { alpha, .. }, "alpha")
            | (SelectivityShape::LogisticProducing { alpha, .. }, "alpha")
            | (SelectivityShape::KnifeEdge { alpha, .. }, "alpha")
            | (SelectivityShape::DoubleNormal { alpha, .. }, "alpha") => scalar(alpha, index),
            (SelectivityShape::LogisticProducing { l, .. }, "l") => scalar(l, index),
            (SelectivityShape::LogisticProducing { h, .. }, "h") => scalar(h, index),
            (SelectivityShape::KnifeEdge { e, .. }, "e") => scalar(e, index),
            (SelectivityShape::DoubleNormal { mu, .. }, "mu") => scalar(mu, index),
            (SelectivityShape::DoubleNormal { sigma_l, .. }, "sigma_l") => scalar(sigma_l, index),
            (SelectivityShape::DoubleNormal { sigma_r, .. }, "sigma_r") => scalar(sigma_r, index),
            (SelectivityShape::AllValues { v }, "v") => vector_element(v, index),
            _ => None,
        }
    }
}

/// Label-indexed selectivity store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selectivities {
    items: Vec<Selectivity>,
    index: HashMap<String, SelectivityId>,
}

impl Selectivities {
    pub fn new(configs: &[SelectivityConfig]) -> BiologyResult<Self> {
        let mut out = Self::default();
        for config in configs {
            if out.index.contains_key(&config.label) {
                return Err(BiologyError::DuplicateLabel {
                    kind: "selectivity",
                    label: config.label.clone(),
                });
            }
            out.index.insert(config.label.clone(), SelectivityId(out.items.len()));
            out.items.push(Selectivity::new(config)?);
        }
        Ok(out)
    }

    pub fn id(&self, label: &str) -> BiologyResult<SelectivityId> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| BiologyError::UnknownSelectivity { label: label.to_string() })
    }

    /// Resolve a list of labels, broadcasting a single label to `n` entries.
    pub fn resolve_list(&self, labels: &[String], n: usize) -> BiologyResult<Vec<SelectivityId>> {
        let ids = labels.iter().map(|l| self.id(l)).collect::<BiologyResult<Vec<_>>>()?;
        if ids.len() == 1 && n > 1 {
            return Ok(vec![ids[0]; n]);
        }
        Ok(ids)
    }

    pub fn get(&self, id: SelectivityId) -> &Selectivity {
        &self.items[id.0]
    }

    pub fn by_label_mut(&mut self, label: &str) -> Option<&mut Selectivity> {
        let id = self.index.get(label)?;
        self.items.get_mut(id.0)
    }

    pub fn rebuild_all(&mut self, x_values: &[f64]) -> BiologyResult<()> {
        for s in &mut self.items {
            s.rebuild(x_values)?;
        }
        Ok(())
    }
}
