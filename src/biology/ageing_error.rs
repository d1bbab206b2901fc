//! biology::ageing_error — misclassification of read ages.
//!
//! Purpose
//! -------
//! Hold, per ageing error, the matrix whose row `i` gives the probability
//! that a fish of true age `min_age + i` is read as each model age, and
//! spread expected numbers at age through it.
//!
//! Key behaviors
//! -------------
//! - `normal`: a fish of age `a` is read from `N(a, a * cv)` rounded to
//!   the nearest age class. The youngest class absorbs the lower tail; the
//!   oldest absorbs the upper tail only when the model has a plus group.
//! - Ages below `k` are read without error.
//! - [`AgeingErrors::rebuild_all`] recomputes every matrix; the model calls
//!   it at every reset so an estimated `cv` takes effect.
//!
//! Conventions
//! -----------
//! - `cv` is addressable as `ageing_error[label].cv`.
use std::{collections::HashMap, f64::consts::SQRT_2};

use ndarray::Array2;
use serde::Deserialize;
use statrs::function::erf::erfc;

use crate::{
    biology::errors::{BiologyError, BiologyResult},
    model::objects::{Addressable, scalar},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgeingErrorShape {
    Normal {
        cv: f64,
        /// Youngest age that can be misread.
        #[serde(default)]
        k: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgeingErrorConfig {
    pub label: String,
    #[serde(flatten)]
    pub shape: AgeingErrorShape,
}

/// Handle into [`AgeingErrors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgeingErrorId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct AgeingError {
    label: String,
    shape: AgeingErrorShape,
    min_age: u32,
    max_age: u32,
    plus_group: bool,
    /// Rows are true ages, columns read ages.
    matrix: Array2<f64>,
}

impl AgeingError {
    /// Validate the shape against the model ages and build the matrix.
    ///
    /// Errors
    /// ------
    /// - `InvalidParameter` for `cv <= 0` or `k` above the model's maximum
    ///   age.
    pub fn new(config: &AgeingErrorConfig, min_age: u32, max_age: u32, plus_group: bool) -> BiologyResult<Self> {
        let AgeingErrorShape::Normal { k, .. } = config.shape;
        if k > max_age {
            return Err(BiologyError::InvalidParameter {
                label: config.label.clone(),
                parameter: "k",
                value: f64::from(k),
                reason: "cannot be greater than the maximum age in the model",
            });
        }
        let spread = (max_age - min_age + 1) as usize;
        let mut out = Self {
            label: config.label.clone(),
            shape: config.shape.clone(),
            min_age,
            max_age,
            plus_group,
            matrix: Array2::zeros((spread, spread)),
        };
        out.rebuild()?;
        Ok(out)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Recompute the misclassification matrix from the current shape.
    pub fn rebuild(&mut self) -> BiologyResult<()> {
        let AgeingErrorShape::Normal { cv, k } = self.shape;
        if cv.is_nan() || cv <= 0.0 {
            return Err(BiologyError::InvalidParameter {
                label: self.label.clone(),
                parameter: "cv",
                value: cv,
                reason: "must be greater than zero",
            });
        }
        let spread = self.matrix.nrows();
        for i in 0..spread {
            let age = f64::from(self.min_age) + i as f64;
            let sigma = age * cv;
            for j in 0..spread {
                let lower = f64::from(self.min_age) + j as f64 - 0.5;
                self.matrix[[i, j]] = if j == 0 {
                    normal_cdf(lower + 1.0, age, sigma)
                } else if j == spread - 1 && self.plus_group {
                    1.0 - normal_cdf(lower, age, sigma)
                } else {
                    normal_cdf(lower + 1.0, age, sigma) - normal_cdf(lower, age, sigma)
                };
            }
        }
        let exact = k.saturating_sub(self.min_age).min(self.max_age - self.min_age + 1) as usize;
        for i in 0..exact {
            for j in 0..exact {
                self.matrix[[i, j]] = 0.0;
            }
            self.matrix[[i, i]] = 1.0;
        }
        Ok(())
    }

    /// Numbers at read age from numbers at true age, both indexed from the
    /// model's minimum age.
    pub fn apply(&self, numbers: &[f64]) -> Vec<f64> {
        let n = numbers.len().min(self.matrix.nrows());
        let mut out = vec![0.0; numbers.len()];
        for (i, value) in numbers.iter().enumerate().take(n) {
            for (j, slot) in out.iter_mut().enumerate().take(n) {
                *slot += value * self.matrix[[i, j]];
            }
        }
        out
    }
}

impl Addressable for AgeingError {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match (&mut self.shape, parameter) {
            (AgeingErrorShape::Normal { cv, .. }, "cv") => scalar(cv, index),
            _ => None,
        }
    }
}

/// Normal CDF that degenerates to a step at `mu` when `sigma` is zero.
fn normal_cdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return if x < mu { 0.0 } else { 1.0 };
    }
    0.5 * erfc((mu - x) / (sigma * SQRT_2))
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgeingErrors {
    items: Vec<AgeingError>,
    index: HashMap<String, AgeingErrorId>,
}

impl AgeingErrors {
    pub fn new(configs: &[AgeingErrorConfig], min_age: u32, max_age: u32, plus_group: bool) -> BiologyResult<Self> {
        let mut out = Self::default();
        for config in configs {
            if out.index.contains_key(&config.label) {
                return Err(BiologyError::DuplicateLabel { kind: "ageing_error", label: config.label.clone() });
            }
            out.index.insert(config.label.clone(), AgeingErrorId(out.items.len()));
            out.items.push(AgeingError::new(config, min_age, max_age, plus_group)?);
        }
        Ok(out)
    }

    pub fn id(&self, label: &str) -> BiologyResult<AgeingErrorId> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| BiologyError::UnknownAgeingError { label: label.to_string() })
    }

    pub fn get(&self, id: AgeingErrorId) -> &AgeingError {
        &self.items[id.0]
    }

    pub fn by_label_mut(&mut self, label: &str) -> Option<&mut AgeingError> {
        let id = self.index.get(label)?;
        self.items.get_mut(id.0)
    }

    pub fn rebuild_all(&mut self) -> BiologyResult<()> {
        for a in &mut self.items {
            a.rebuild()?;
        }
        Ok(())
    }
}
