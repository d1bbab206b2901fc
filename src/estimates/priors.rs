//! Prior densities on estimated parameters.
//!
//! Purpose
//! -------
//! Provide the negative log prior contribution of each estimate to the
//! objective. Scores are additive constants aside, matching the
//! conventional fisheries forms.
//!
//! Conventions
//! -----------
//! - `uniform`: 0.
//! - `uniform_log`: `ln v`.
//! - `normal{mu, cv}`: `0.5 ((v - mu) / (cv mu))^2`.
//! - `normal_by_stdev{mu, sigma}`: `0.5 ((v - mu) / sigma)^2`.
//! - `lognormal{mu, cv}`: `ln v + ln σ + 0.5 (ln(v / mu) / σ + σ / 2)^2`
//!   with `σ² = ln(1 + cv²)`.
//! - `beta{mu, sigma, a, b}`: a beta on `[a, b]` with mean `mu` and standard
//!   deviation `sigma`; `(1 - m) ln(v - a) + (1 - n) ln(b - v)`.
//!
//! Hyper-parameters are addressable as `estimate[label].mu` etc.
use serde::Deserialize;

use crate::{
    estimates::errors::{EstimateError, EstimateResult},
    model::objects::scalar,
};

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Prior {
    #[default]
    Uniform,
    UniformLog,
    Normal { mu: f64, cv: f64 },
    NormalByStdev { mu: f64, sigma: f64 },
    Lognormal { mu: f64, cv: f64 },
    Beta { mu: f64, sigma: f64, a: f64, b: f64 },
}

impl Prior {
    pub fn name(&self) -> &'static str {
        match self {
            Prior::Uniform => "uniform",
            Prior::UniformLog => "uniform_log",
            Prior::Normal { .. } => "normal",
            Prior::NormalByStdev { .. } => "normal_by_stdev",
            Prior::Lognormal { .. } => "lognormal",
            Prior::Beta { .. } => "beta",
        }
    }

    /// Check hyper-parameters against `[lower, upper]`.
    ///
    /// Errors
    /// ------
    /// - `InvalidPrior` for non-positive `cv`/`sigma`, a non-positive
    ///   lognormal `mu`, a Beta range that does not contain the bounds, or a
    ///   Beta `sigma` too large for its mean.
    pub fn validate(&self, label: &str, lower: f64, upper: f64) -> EstimateResult<()> {
        let fail = |reason: String| EstimateError::InvalidPrior { label: label.to_string(), prior: self.name(), reason };
        match *self {
            Prior::Uniform => {}
            Prior::UniformLog => {
                if lower <= 0.0 {
                    return Err(fail(format!("lower_bound {lower} must be positive")));
                }
            }
            Prior::Normal { mu, cv } => {
                if cv <= 0.0 {
                    return Err(fail(format!("cv ({cv}) must be greater than 0.0")));
                }
                if mu == 0.0 {
                    return Err(fail("mu must not be 0.0".to_string()));
                }
            }
            Prior::NormalByStdev { sigma, .. } => {
                if sigma <= 0.0 {
                    return Err(fail(format!("sigma ({sigma}) must be greater than 0.0")));
                }
            }
            Prior::Lognormal { mu, cv } => {
                if mu <= 0.0 || cv <= 0.0 {
                    return Err(fail(format!("mu ({mu}) and cv ({cv}) must be greater than 0.0")));
                }
                if lower <= 0.0 {
                    return Err(fail(format!("lower_bound {lower} must be positive")));
                }
            }
            Prior::Beta { mu, sigma, a, b } => {
                if a >= b {
                    return Err(fail(format!("a ({a}) must be less than b ({b})")));
                }
                if lower <= a || upper >= b {
                    return Err(fail(format!("the bounds must lie strictly inside ({a}, {b})")));
                }
                if !(a < mu && mu < b) {
                    return Err(fail(format!("mu ({mu}) must lie strictly inside ({a}, {b})")));
                }
                if sigma <= 0.0 || (mu - a) * (b - mu) <= sigma * sigma {
                    return Err(fail(format!("sigma ({sigma}) must satisfy 0 < sigma² < (mu - a)(b - mu)")));
                }
            }
        }
        Ok(())
    }

    /// Negative log prior at `value`.
    pub fn score(&self, value: f64) -> f64 {
        match *self {
            Prior::Uniform => 0.0,
            Prior::UniformLog => value.ln(),
            Prior::Normal { mu, cv } => 0.5 * ((value - mu) / (cv * mu)).powi(2),
            Prior::NormalByStdev { mu, sigma } => 0.5 * ((value - mu) / sigma).powi(2),
            Prior::Lognormal { mu, cv } => {
                let sigma = (1.0 + cv * cv).ln().sqrt();
                value.ln() + sigma.ln() + 0.5 * ((value / mu).ln() / sigma + 0.5 * sigma).powi(2)
            }
            Prior::Beta { mu, sigma, a, b } => {
                let v = (mu - a) / (b - a);
                let t = ((mu - a) * (b - mu) / (sigma * sigma)) - 1.0;
                let m = t * v;
                let n = t * (1.0 - v);
                (1.0 - m) * (value - a).ln() + (1.0 - n) * (b - value).ln()
            }
        }
    }

    pub fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        let value = match (self, parameter) {
            (Prior::Normal { mu, .. } | Prior::NormalByStdev { mu, .. } | Prior::Lognormal { mu, .. }, "mu") => mu,
            (Prior::Beta { mu, .. }, "mu") => mu,
            (Prior::Normal { cv, .. } | Prior::Lognormal { cv, .. }, "cv") => cv,
            (Prior::NormalByStdev { sigma, .. } | Prior::Beta { sigma, .. }, "sigma") => sigma,
            (Prior::Beta { a, .. }, "a") => a,
            (Prior::Beta { b, .. }, "b") => b,
            _ => return None,
        };
        scalar(value, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Closed-form scores of each prior at known points.
    // - Hyper-parameter validation and addressable lookup.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Scores match their closed forms.
    //
    // Given
    // -----
    // - v = 2 under each prior family.
    //
    // Expect
    // ------
    // - uniform 0, uniform_log ln 2, normal(1, 0.5) 2, normal_by_stdev(1, 2)
    //   0.125, lognormal at its median shifted by σ/2.
    fn scores_match_closed_forms() {
        assert_eq!(Prior::Uniform.score(2.0), 0.0);
        assert!((Prior::UniformLog.score(2.0) - 2f64.ln()).abs() < 1e-15);
        assert!((Prior::Normal { mu: 1.0, cv: 0.5 }.score(2.0) - 2.0).abs() < 1e-12);
        assert!((Prior::NormalByStdev { mu: 1.0, sigma: 2.0 }.score(2.0) - 0.125).abs() < 1e-12);

        let cv: f64 = 0.3;
        let sigma = (1.0 + cv * cv).ln().sqrt();
        let want = 2f64.ln() + sigma.ln() + 0.5 * (0.5 * sigma).powi(2);
        assert!((Prior::Lognormal { mu: 2.0, cv }.score(2.0) - want).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The Beta prior is symmetric about the midpoint for a central mean.
    //
    // Given
    // -----
    // - beta{mu 0.5, sigma 0.1, a 0, b 1} scored at 0.3 and 0.7.
    //
    // Expect
    // ------
    // - Equal finite scores, both higher than at the mean.
    fn beta_is_symmetric_for_central_mean() {
        // Arrange
        let prior = Prior::Beta { mu: 0.5, sigma: 0.1, a: 0.0, b: 1.0 };

        // Act
        let (left, mid, right) = (prior.score(0.3), prior.score(0.5), prior.score(0.7));

        // Assert
        assert!((left - right).abs() < 1e-12);
        assert!(left > mid && left.is_finite());
    }

    #[test]
    // Purpose
    // -------
    // Out-of-domain hyper-parameters are rejected.
    //
    // Given
    // -----
    // - normal with cv 0, beta whose bounds leave (a, b), lognormal with a
    //   zero lower bound.
    //
    // Expect
    // ------
    // - `InvalidPrior` for each.
    fn invalid_hyper_parameters_are_rejected() {
        let cases = [
            (Prior::Normal { mu: 1.0, cv: 0.0 }, 0.1, 2.0),
            (Prior::Beta { mu: 0.5, sigma: 0.1, a: 0.0, b: 1.0 }, 0.0, 0.9),
            (Prior::Lognormal { mu: 1.0, cv: 0.2 }, 0.0, 2.0),
        ];
        for (prior, lo, hi) in cases {
            match prior.validate("q", lo, hi) {
                Err(EstimateError::InvalidPrior { .. }) => {}
                other => panic!("expected InvalidPrior for {prior:?}, got {other:?}"),
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Hyper-parameters are reachable by name; absent ones are misses.
    fn hyper_parameters_are_addressable() {
        let mut prior = Prior::Lognormal { mu: 1.0, cv: 0.2 };
        *prior.addressable_mut("cv", None).unwrap() = 0.4;
        assert_eq!(prior, Prior::Lognormal { mu: 1.0, cv: 0.4 });
        assert!(prior.addressable_mut("sigma", None).is_none());
        assert!(Prior::Uniform.addressable_mut("mu", None).is_none());
    }
}
