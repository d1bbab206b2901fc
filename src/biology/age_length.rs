//! biology::age_length — mean length at age and mean weight at length.
//!
//! Pure evaluators consumed by the model when it refreshes each
//! category's mean weight per slot. Weights are reported in tonnes.
use std::collections::HashMap;

use serde::Deserialize;

use crate::{
    biology::errors::{BiologyError, BiologyResult},
    model::objects::{Addressable, scalar},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnits {
    Grams,
    Kgs,
    #[default]
    Tonnes,
}

impl WeightUnits {
    fn to_tonnes(self) -> f64 {
        match self {
            WeightUnits::Grams => 1e-6,
            WeightUnits::Kgs => 1e-3,
            WeightUnits::Tonnes => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LengthWeightShape {
    None,
    Basic {
        a: f64,
        b: f64,
        #[serde(default)]
        units: WeightUnits,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LengthWeightConfig {
    pub label: String,
    #[serde(flatten)]
    pub shape: LengthWeightShape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LengthWeight {
    label: String,
    shape: LengthWeightShape,
}

impl LengthWeight {
    pub fn new(config: &LengthWeightConfig) -> BiologyResult<Self> {
        if let LengthWeightShape::Basic { a, b, .. } = &config.shape {
            if *a <= 0.0 {
                return Err(BiologyError::InvalidParameter {
                    label: config.label.clone(),
                    parameter: "a",
                    value: *a,
                    reason: "must be greater than zero",
                });
            }
            if *b <= 0.0 {
                return Err(BiologyError::InvalidParameter {
                    label: config.label.clone(),
                    parameter: "b",
                    value: *b,
                    reason: "must be greater than zero",
                });
            }
        }
        Ok(Self { label: config.label.clone(), shape: config.shape.clone() })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Mean weight (tonnes) at `length`.
    pub fn mean_weight(&self, length: f64) -> f64 {
        match &self.shape {
            LengthWeightShape::None => 1.0,
            LengthWeightShape::Basic { a, b, units } => a * length.powf(*b) * units.to_tonnes(),
        }
    }
}

impl Addressable for LengthWeight {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match (&mut self.shape, parameter) {
            (LengthWeightShape::Basic { a, .. }, "a") => scalar(a, index),
            (LengthWeightShape::Basic { b, .. }, "b") => scalar(b, index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgeLengthShape {
    None,
    VonBertalanffy { linf: f64, k: f64, t0: f64 },
    Schnute { y1: f64, y2: f64, tau1: f64, tau2: f64, a: f64, b: f64 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgeLengthConfig {
    pub label: String,
    #[serde(flatten)]
    pub shape: AgeLengthShape,
    #[serde(default)]
    pub length_weight: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgeLength {
    label: String,
    shape: AgeLengthShape,
    length_weight: Option<usize>,
}

impl AgeLength {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Mean length at `age`.
    pub fn mean_length(&self, age: f64) -> f64 {
        match &self.shape {
            AgeLengthShape::None => 0.0,
            AgeLengthShape::VonBertalanffy { linf, k, t0 } => linf * (1.0 - (-k * (age - t0)).exp()),
            AgeLengthShape::Schnute { y1, y2, tau1, tau2, a, b } => {
                let temp = if *a != 0.0 {
                    (1.0 - (-a * (age - tau1)).exp()) / (1.0 - (-a * (tau2 - tau1)).exp())
                } else {
                    (age - tau1) / (tau2 - tau1)
                };
                if *b != 0.0 {
                    (y1.powf(*b) + (y2.powf(*b) - y1.powf(*b)) * temp).powf(1.0 / b)
                } else {
                    y1 * ((y2 / y1).ln() * temp).exp()
                }
            }
        }
    }
}

impl Addressable for AgeLength {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match (&mut self.shape, parameter) {
            (AgeLengthShape::VonBertalanffy { linf, .. }, "linf") => scalar(linf, index),
            (AgeLengthShape::VonBertalanffy { k, .. }, "k") => scalar(k, index),
            (AgeLengthShape::VonBertalanffy { t0, .. }, "t0") => scalar(t0, index),
            (AgeLengthShape::Schnute { y1, .. }, "y1") => scalar(y1, index),
            (AgeLengthShape::Schnute { y2, .. }, "y2") => scalar(y2, index),
            (AgeLengthShape::Schnute { tau1, .. }, "tau1") => scalar(tau1, index),
            (AgeLengthShape::Schnute { tau2, .. }, "tau2") => scalar(tau2, index),
            (AgeLengthShape::Schnute { a, .. }, "a") => scalar(a, index),
            (AgeLengthShape::Schnute { b, .. }, "b") => scalar(b, index),
            _ => None,
        }
    }
}

/// Age-lengths and the length-weights they reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Growth {
    age_lengths: Vec<AgeLength>,
    age_length_index: HashMap<String, usize>,
    length_weights: Vec<LengthWeight>,
    length_weight_index: HashMap<String, usize>,
}

impl Growth {
    pub fn new(age_lengths: &[AgeLengthConfig], length_weights: &[LengthWeightConfig]) -> BiologyResult<Self> {
        let mut out = Self::default();
        for config in length_weights {
            if out.length_weight_index.contains_key(&config.label) {
                return Err(BiologyError::DuplicateLabel {
                    kind: "length_weight",
                    label: config.label.clone(),
                });
            }
            out.length_weight_index.insert(config.label.clone(), out.length_weights.len());
            out.length_weights.push(LengthWeight::new(config)?);
        }
        for config in age_lengths {
            if out.age_length_index.contains_key(&config.label) {
                return Err(BiologyError::DuplicateLabel {
                    kind: "age_length",
                    label: config.label.clone(),
                });
            }
            let length_weight = match &config.length_weight {
                Some(label) => Some(*out.length_weight_index.get(label).ok_or_else(|| {
                    BiologyError::UnknownLengthWeight { label: label.clone() }
                })?),
                None => None,
            };
            out.age_length_index.insert(config.label.clone(), out.age_lengths.len());
            out.age_lengths.push(AgeLength {
                label: config.label.clone(),
                shape: config.shape.clone(),
                length_weight,
            });
        }
        Ok(out)
    }

    pub fn age_length_index(&self, label: &str) -> Option<usize> {
        self.age_length_index.get(label).copied()
    }

    pub fn age_length_mut(&mut self, label: &str) -> Option<&mut AgeLength> {
        let i = *self.age_length_index.get(label)?;
        self.age_lengths.get_mut(i)
    }

    pub fn length_weight_mut(&mut self, label: &str) -> Option<&mut LengthWeight> {
        let i = *self.length_weight_index.get(label)?;
        self.length_weights.get_mut(i)
    }

    /// Mean weight at each age in `ages` for age-length `index`; `1.0`
    /// when it has no length-weight.
    pub fn mean_weights(&self, index: usize, ages: &[f64]) -> Vec<f64> {
        let al = &self.age_lengths[index];
        match al.length_weight {
            Some(lw) => {
                ages.iter().map(|a| self.length_weights[lw].mean_weight(al.mean_length(*a))).collect()
            }
            None => vec![1.0; ages.len()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - von Bertalanffy and Schnute mean length.
    // - Basic length-weight with unit conversion.
    // - Registry wiring between age-lengths and length-weights.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // von Bertalanffy mean length matches the closed form.
    //
    // Given
    // -----
    // - linf = 100, k = 0.2, t0 = -0.5, age 3.
    //
    // Expect
    // ------
    // - 100 (1 - exp(-0.7)).
    fn von_bertalanffy_matches_closed_form() {
        // Arrange
        let growth = Growth::new(
            &[AgeLengthConfig {
                label: "vb".to_string(),
                shape: AgeLengthShape::VonBertalanffy { linf: 100.0, k: 0.2, t0: -0.5 },
                length_weight: None,
            }],
            &[],
        )
        .unwrap();

        // Act
        let len = growth.age_lengths[0].mean_length(3.0);

        // Assert
        assert!((len - 100.0 * (1.0 - (-0.7_f64).exp())).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Schnute passes through y1 at tau1 and y2 at tau2.
    //
    // Given
    // -----
    // - y1 = 20, y2 = 80, tau1 = 1, tau2 = 20, a = 0.1, b = 1.
    //
    // Expect
    // ------
    // - Lengths 20 and 80 at the anchor ages.
    fn schnute_passes_through_anchors() {
        // Arrange
        let al = AgeLength {
            label: "s".to_string(),
            shape: AgeLengthShape::Schnute { y1: 20.0, y2: 80.0, tau1: 1.0, tau2: 20.0, a: 0.1, b: 1.0 },
            length_weight: None,
        };

        // Act / Assert
        assert!((al.mean_length(1.0) - 20.0).abs() < 1e-9);
        assert!((al.mean_length(20.0) - 80.0).abs() < 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Weights convert to tonnes.
    //
    // Given
    // -----
    // - a = 1e-2, b = 3, kgs, linf-only growth (k large).
    //
    // Expect
    // ------
    // - mean weight = 1e-2 * L^3 / 1000.
    fn mean_weight_converts_units() {
        // Arrange
        let growth = Growth::new(
            &[AgeLengthConfig {
                label: "vb".to_string(),
                shape: AgeLengthShape::VonBertalanffy { linf: 50.0, k: 50.0, t0: 0.0 },
                length_weight: Some("lw".to_string()),
            }],
            &[LengthWeightConfig {
                label: "lw".to_string(),
                shape: LengthWeightShape::Basic { a: 1e-2, b: 3.0, units: WeightUnits::Kgs },
            }],
        )
        .unwrap();

        // Act
        let w = growth.mean_weights(0, &[5.0]);

        // Assert
        assert!((w[0] - 1e-2 * 50.0_f64.powi(3) / 1000.0).abs() < 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // An undefined length-weight reference fails construction.
    //
    // Given
    // -----
    // - length_weight "missing".
    //
    // Expect
    // ------
    // - `UnknownLengthWeight`.
    fn unknown_length_weight_is_rejected() {
        // Act
        let err = Growth::new(
            &[AgeLengthConfig {
                label: "vb".to_string(),
                shape: AgeLengthShape::None,
                length_weight: Some("missing".to_string()),
            }],
            &[],
        )
        .unwrap_err();

        // Assert
        match err {
            BiologyError::UnknownLengthWeight { label } => assert_eq!(label, "missing"),
            other => panic!("expected UnknownLengthWeight, got {other:?}"),
        }
    }
}
