//! Catchabilities scale model abundance or biomass onto the index scale.
//!
//! - `free`: `q` is a parameter (`catchability[label].q`) that can be
//!   estimated like any other.
//! - `nuisance`: `q` is solved analytically from the comparisons each
//!   iteration, for normal or lognormal index likelihoods, then clamped to
//!   `[lower_bound, upper_bound]`.
use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    likelihoods::Comparisons,
    model::objects::{Addressable, scalar},
    observations::errors::{ObservationError, ObservationResult},
    utils::zero_fun,
};

const NUISANCE_FLOOR: f64 = 1e-10;

fn default_lower() -> f64 {
    1e-10
}

fn default_upper() -> f64 {
    1e10
}

/// Prior on an analytical `q`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NuisancePrior {
    #[default]
    None,
    UniformLog,
    Lognormal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatchabilityConfig {
    Free {
        label: String,
        q: f64,
    },
    Nuisance {
        label: String,
        #[serde(default = "default_lower")]
        lower_bound: f64,
        #[serde(default = "default_upper")]
        upper_bound: f64,
        #[serde(default)]
        prior: NuisancePrior,
        /// Lognormal prior mean and cv.
        #[serde(default)]
        mu: Option<f64>,
        #[serde(default)]
        cv: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Method {
    Free,
    Nuisance { lower_bound: f64, upper_bound: f64, prior: NuisancePrior, mu: f64, cv: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catchability {
    label: String,
    q: f64,
    method: Method,
}

impl Catchability {
    pub fn new(config: &CatchabilityConfig) -> ObservationResult<Self> {
        let invalid = |label: &str, reason: String| ObservationError::Nuisance { catchability: label.to_string(), reason };
        match config {
            CatchabilityConfig::Free { label, q } => {
                if *q <= 0.0 {
                    return Err(invalid(label, format!("q must be positive, got {q}")));
                }
                Ok(Self { label: label.clone(), q: *q, method: Method::Free })
            }
            CatchabilityConfig::Nuisance { label, lower_bound, upper_bound, prior, mu, cv } => {
                if lower_bound > upper_bound || *lower_bound <= 0.0 {
                    return Err(invalid(label, format!("invalid bounds [{lower_bound}, {upper_bound}]")));
                }
                let (mu, cv) = match prior {
                    NuisancePrior::Lognormal => match (mu, cv) {
                        (Some(m), Some(c)) if *m > 0.0 && *c > 0.0 => (*m, *c),
                        _ => return Err(invalid(label, "a lognormal prior needs positive mu and cv".to_string())),
                    },
                    _ => (0.0, 0.0),
                };
                Ok(Self {
                    label: label.clone(),
                    q: *lower_bound,
                    method: Method::Nuisance {
                        lower_bound: *lower_bound,
                        upper_bound: *upper_bound,
                        prior: *prior,
                        mu,
                        cv,
                    },
                })
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    pub fn is_nuisance(&self) -> bool {
        matches!(self.method, Method::Nuisance { .. })
    }

    /// Solve for `q` given comparisons whose expected values exclude it.
    ///
    /// Errors
    /// ------
    /// - `Nuisance` for likelihoods other than normal/lognormal, or a
    ///   normal likelihood with a lognormal prior.
    pub fn calculate_nuisance_q(&mut self, comparisons: &Comparisons, likelihood: &str) -> ObservationResult<()> {
        let Method::Nuisance { lower_bound, upper_bound, prior, mu, cv } = self.method else {
            return Ok(());
        };
        let fail = |reason: &str| ObservationError::Nuisance {
            catchability: self.label.clone(),
            reason: reason.to_string(),
        };
        let adjusted_cv = |e: f64, pe: f64| if e > 0.0 && pe > 0.0 { (e * e + pe * pe).sqrt() } else { e };
        let all = || comparisons.values().flatten();
        let n = all().count() as f64;
        let q = match likelihood {
            "normal" => {
                let (mut s1, mut s2) = (0.0, 0.0);
                for c in all() {
                    let cv = adjusted_cv(c.error_value, c.process_error);
                    let expected = zero_fun(c.expected, NUISANCE_FLOOR);
                    s1 += c.observed / (cv * cv * expected);
                    s2 += (c.observed / (cv * expected)).powi(2);
                }
                let m = match prior {
                    NuisancePrior::None => n,
                    NuisancePrior::UniformLog => n + 1.0,
                    NuisancePrior::Lognormal => return Err(fail("a lognormal prior requires a lognormal likelihood")),
                };
                (-s1 + (s1 * s1 + 4.0 * m * s2).sqrt()) / (2.0 * m)
            }
            "lognormal" | "lognormal_with_q" => {
                let (mut s3, mut s4) = (0.0, 0.0);
                for c in all() {
                    if c.expected <= NUISANCE_FLOOR {
                        warn!(catchability = %self.label, expected = c.expected, "expected value below floor");
                    }
                    let expected = zero_fun(c.expected, NUISANCE_FLOOR);
                    let cv = adjusted_cv(c.error_value, c.process_error);
                    let var = (1.0 + cv * cv).ln();
                    s3 += (c.observed / expected).ln() / var;
                    s4 += 1.0 / var;
                }
                match prior {
                    NuisancePrior::None => ((0.5 * n + s3) / s4).exp(),
                    NuisancePrior::UniformLog => ((0.5 * n - 1.0 + s3) / s4).exp(),
                    NuisancePrior::Lognormal => {
                        let var_q = (1.0 + cv * cv).ln();
                        ((0.5 * n - 1.5 + mu.ln() / var_q + s3) / (s4 + 1.0 / var_q)).exp()
                    }
                }
            }
            _ => return Err(fail("nuisance q needs a normal or lognormal likelihood")),
        };
        self.q = q.clamp(lower_bound, upper_bound);
        debug!(catchability = %self.label, q = self.q, "analytical q");
        Ok(())
    }
}

impl Addressable for Catchability {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match (parameter, &self.method) {
            ("q", Method::Free) => scalar(&mut self.q, index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CatchabilityId(pub usize);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catchabilities {
    items: Vec<Catchability>,
    index: HashMap<String, CatchabilityId>,
}

impl Catchabilities {
    pub fn new(configs: &[CatchabilityConfig]) -> ObservationResult<Self> {
        let mut out = Self::default();
        for config in configs {
            let item = Catchability::new(config)?;
            if out.index.contains_key(item.label()) {
                return Err(ObservationError::DuplicateLabel {
                    kind: "catchability",
                    label: item.label().to_string(),
                });
            }
            out.index.insert(item.label().to_string(), CatchabilityId(out.items.len()));
            out.items.push(item);
        }
        Ok(out)
    }

    pub fn id(&self, label: &str) -> Option<CatchabilityId> {
        self.index.get(label).copied()
    }

    pub fn get(&self, id: CatchabilityId) -> &Catchability {
        &self.items[id.0]
    }

    pub fn get_mut(&mut self, id: CatchabilityId) -> &mut Catchability {
        &mut self.items[id.0]
    }

    pub fn by_label_mut(&mut self, label: &str) -> Option<&mut Catchability> {
        let id = self.id(label)?;
        Some(&mut self.items[id.0])
    }
}
