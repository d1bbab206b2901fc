//! estimates — the free parameters the minimiser and MCMC move.
//!
//! Purpose
//! -------
//! Turn estimate configuration blocks into a flat, ordered list of scalar
//! estimates, and expose the "free" subset as the vector the minimiser
//! sees.
//!
//! Key behaviors
//! -------------
//! - A parameter with a brace list or range (`ycs_values{1995:1999}`)
//!   expands into one estimate per index, all sharing the block label.
//! - Estimates whose lower bound equals the upper bound are dropped with a
//!   warning; they are configuration constants, not estimates.
//! - `estimation_phase` gates which estimates are free in a phase; held
//!   estimates (derived by a group transformation) are never free.
//!
//! Invariants & assumptions
//! ------------------------
//! - A target is estimated at most once, counting `same` targets.
//! - The free vector is ordered by configuration order and expansion
//!   order, and that order is stable for a built model.
//!
//! Downstream usage
//! ----------------
//! - `Model` binds each estimate to its target's configured value, then
//!   writes `value` back to every target on reset.
//! - The objective sums `prior_score` over enabled estimates.
use std::collections::{HashMap, HashSet};

use tracing::warn;

pub mod errors;
pub mod estimate;
pub mod priors;

// ---- Re-exports (primary public surface) ----
pub use errors::{EstimateError, EstimateResult};
pub use estimate::{Estimate, EstimateConfig};
pub use priors::Prior;

use crate::model::objects::AddressableName;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Estimates {
    items: Vec<Estimate>,
}

impl Estimates {
    /// Expand and validate configuration blocks.
    ///
    /// Errors
    /// ------
    /// - `DuplicateLabel` for repeated block labels.
    /// - `InvalidParameter` for unparsable parameters or `same` lists whose
    ///   expansion does not pair with the parameter's.
    /// - `InvalidBounds` for a bound list that is neither one value nor one
    ///   per index.
    /// - `DuplicateParameter` when a target is estimated twice.
    pub fn new(configs: &[EstimateConfig]) -> EstimateResult<Self> {
        let mut labels = HashSet::new();
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for config in configs {
            let label = config.label().to_string();
            if !labels.insert(label.clone()) {
                return Err(EstimateError::DuplicateLabel { label });
            }
            let parameters = expand(&label, &config.parameter)?;
            let n = parameters.len();
            let same: Vec<Vec<AddressableName>> =
                config.same.iter().map(|s| expand(&label, s)).collect::<EstimateResult<_>>()?;
            let lower = per_index(&label, "lower_bound", &config.lower_bound, n)?;
            let upper = per_index(&label, "upper_bound", &config.upper_bound, n)?;

            for (i, parameter) in parameters.into_iter().enumerate() {
                let same_targets = paired_same(&label, &same, n, i)?;
                if lower[i] == upper[i] {
                    warn!(
                        estimate = %label,
                        parameter = %parameter,
                        "lower_bound equals upper_bound ({}); the parameter will not be estimated",
                        lower[i]
                    );
                    continue;
                }
                for target in std::iter::once(&parameter).chain(same_targets.iter()) {
                    if !seen.insert(target.full_name()) {
                        return Err(EstimateError::DuplicateParameter { parameter: target.full_name() });
                    }
                }
                items.push(Estimate::new(config, parameter, same_targets, lower[i], upper[i])?);
            }
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, i: usize) -> &Estimate {
        &self.items[i]
    }

    pub fn get_mut(&mut self, i: usize) -> &mut Estimate {
        &mut self.items[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Estimate> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Estimate> {
        self.items.iter_mut()
    }

    /// Positions of every estimate expanded from block `label`.
    pub fn indices_of(&self, label: &str) -> Vec<usize> {
        self.items.iter().enumerate().filter(|(_, e)| e.label == label).map(|(i, _)| i).collect()
    }

    /// Position of the estimate whose primary target is `full_name`.
    pub fn by_parameter(&self, full_name: &str) -> Option<usize> {
        self.items.iter().position(|e| e.parameter.full_name() == full_name)
    }

    pub fn max_phase(&self) -> usize {
        self.items.iter().map(|e| e.phase).max().unwrap_or(1)
    }

    /// Enable estimates whose phase is at most `phase`.
    pub fn set_phase(&mut self, phase: usize) {
        for e in &mut self.items {
            e.set_enabled(e.phase <= phase);
        }
    }

    /// Indices of free estimates in minimiser order.
    pub fn free_indices(&self) -> Vec<usize> {
        self.items.iter().enumerate().filter(|(_, e)| e.is_free()).map(|(i, _)| i).collect()
    }

    /// Free estimates that MCMC may propose moves for.
    pub fn mcmc_indices(&self) -> Vec<usize> {
        self.items.iter().enumerate().filter(|(_, e)| e.is_free() && !e.mcmc_fixed).map(|(i, _)| i).collect()
    }

    pub fn free_values(&self) -> Vec<f64> {
        self.items.iter().filter(|e| e.is_free()).map(|e| e.value).collect()
    }

    pub fn free_bounds(&self) -> (Vec<f64>, Vec<f64>) {
        self.items.iter().filter(|e| e.is_free()).map(|e| (e.lower_bound, e.upper_bound)).unzip()
    }

    /// Write a candidate vector into the free estimates.
    ///
    /// Errors
    /// ------
    /// - `ValueCount` when `values` does not have one entry per free
    ///   estimate.
    pub fn set_free_values(&mut self, values: &[f64]) -> EstimateResult<()> {
        let free = self.free_indices();
        if free.len() != values.len() {
            return Err(EstimateError::ValueCount { expected: free.len(), found: values.len() });
        }
        for (i, v) in free.into_iter().zip(values) {
            self.items[i].value = *v;
        }
        Ok(())
    }

    /// Values of every estimate, keyed by primary target name.
    pub fn values_by_parameter(&self) -> HashMap<String, f64> {
        self.items.iter().map(|e| (e.parameter.full_name(), e.value)).collect()
    }

    /// Hyper-parameter of the prior on a single-estimate block.
    pub fn addressable_mut(&mut self, label: &str, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        let matches = self.indices_of(label);
        let [i] = matches.as_slice() else {
            return None;
        };
        self.items[*i].prior.addressable_mut(parameter, index)
    }
}

// ---- Helper methods ----

fn expand(label: &str, parameter: &str) -> EstimateResult<Vec<AddressableName>> {
    let invalid = |reason: String| EstimateError::InvalidParameter {
        label: label.to_string(),
        parameter: parameter.to_string(),
        reason,
    };
    AddressableName::parse(parameter)
        .and_then(|name| name.expand_indices())
        .map_err(|err| invalid(err.to_string()))
}

fn per_index(label: &str, name: &str, values: &[f64], n: usize) -> EstimateResult<Vec<f64>> {
    match values.len() {
        1 => Ok(vec![values[0]; n]),
        m if m == n => Ok(values.to_vec()),
        m => Err(EstimateError::InvalidBounds {
            label: label.to_string(),
            reason: format!("{name} has {m} values; expected 1 or {n}"),
        }),
    }
}

/// `same` targets for the `i`th expanded estimate. A scalar estimate takes
/// every expanded `same` target; an indexed one pairs them by position.
fn paired_same(label: &str, same: &[Vec<AddressableName>], n: usize, i: usize) -> EstimateResult<Vec<AddressableName>> {
    if n == 1 {
        return Ok(same.iter().flatten().cloned().collect());
    }
    same.iter()
        .map(|targets| {
            if targets.len() != n {
                return Err(EstimateError::InvalidParameter {
                    label: label.to_string(),
                    parameter: targets.first().map(|t| t.full_name()).unwrap_or_default(),
                    reason: format!("same expands to {} targets; expected {n}", targets.len()),
                });
            }
            Ok(targets[i].clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Index expansion, bound broadcasting and the equal-bounds drop.
    // - Duplicate targets, including through `same`.
    // - Phase gating and the free-vector round trip.
    //
    // They intentionally DO NOT cover:
    // - Binding to model targets (see model.rs).
    // - Transformations (see estimate_transformations/).
    // -------------------------------------------------------------------------

    fn config(json: &str) -> EstimateConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // A year range expands into one estimate per year with per-index bounds.
    //
    // Given
    // -----
    // - ycs_values{1995:1997} with lower [0.1, 0.2, 0.3] and upper 10.
    //
    // Expect
    // ------
    // - Three estimates sharing the label, bounds applied positionally.
    fn range_expands_with_per_index_bounds() {
        // Arrange
        let c = config(
            r#"{"label": "ycs", "parameter": "process[recruitment].ycs_values{1995:1997}",
                "lower_bound": [0.1, 0.2, 0.3], "upper_bound": 10}"#,
        );

        // Act
        let estimates = Estimates::new(&[c]).unwrap();

        // Assert
        assert_eq!(estimates.len(), 3);
        assert_eq!(estimates.indices_of("ycs"), vec![0, 1, 2]);
        assert_eq!(estimates.get(2).parameter.index.as_deref(), Some("1997"));
        assert_eq!((estimates.get(1).lower_bound, estimates.get(1).upper_bound), (0.2, 10.0));
    }

    #[test]
    // Purpose
    // -------
    // Equal bounds drop the estimate instead of failing.
    //
    // Given
    // -----
    // - ycs_values{1995,1996} with lower [1, 0.5] and upper [1, 2].
    //
    // Expect
    // ------
    // - Only the 1996 estimate remains.
    fn equal_bounds_are_dropped() {
        // Arrange
        let c = config(
            r#"{"label": "ycs", "parameter": "process[recruitment].ycs_values{1995,1996}",
                "lower_bound": [1, 0.5], "upper_bound": [1, 2]}"#,
        );

        // Act
        let estimates = Estimates::new(&[c]).unwrap();

        // Assert
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates.get(0).parameter.index.as_deref(), Some("1996"));
    }

    #[test]
    // Purpose
    // -------
    // A target may be estimated once, counting `same`.
    //
    // Given
    // -----
    // - One block on r0 with same = [selectivity[s].a50], a second block on
    //   selectivity[s].a50.
    //
    // Expect
    // ------
    // - `DuplicateParameter` naming the a50 target.
    fn same_targets_count_towards_duplicates() {
        // Arrange
        let a = config(
            r#"{"parameter": "process[recruitment].r0", "same": ["selectivity[s].a50"],
                "lower_bound": 1, "upper_bound": 10}"#,
        );
        let b = config(r#"{"parameter": "selectivity[s].a50", "lower_bound": 1, "upper_bound": 10}"#);

        // Act
        let err = Estimates::new(&[a, b]).unwrap_err();

        // Assert
        match err {
            EstimateError::DuplicateParameter { parameter } => assert_eq!(parameter, "selectivity[s].a50"),
            other => panic!("expected DuplicateParameter, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Phases gate the free vector and writes land in the right slots.
    //
    // Given
    // -----
    // - r0 in phase 1 and m in phase 2.
    //
    // Expect
    // ------
    // - Phase 1 exposes only r0; phase 2 exposes both; a wrong-length write
    //   is `ValueCount`.
    fn phases_gate_the_free_vector() {
        // Arrange
        let mut estimates = Estimates::new(&[
            config(r#"{"parameter": "process[recruitment].r0", "lower_bound": 1, "upper_bound": 10}"#),
            config(r#"{"parameter": "process[m].m", "lower_bound": 0.01, "upper_bound": 1, "estimation_phase": 2}"#),
        ])
        .unwrap();

        // Act
        estimates.set_phase(1);
        let phase_one = estimates.free_indices();
        estimates.set_phase(2);
        estimates.set_free_values(&[5.0, 0.2]).unwrap();
        let err = estimates.set_free_values(&[5.0]).unwrap_err();

        // Assert
        assert_eq!(phase_one, vec![0]);
        assert_eq!(estimates.free_values(), vec![5.0, 0.2]);
        assert_eq!(err, EstimateError::ValueCount { expected: 2, found: 1 });
    }

    #[test]
    // Purpose
    // -------
    // Binding checks bounds only when the prior is on the untransformed
    // value.
    //
    // Given
    // -----
    // - Bounds [1, 10], once plain and once with prior_applies_to_transform.
    //
    // Expect
    // ------
    // - Binding 20 fails with `OutOfBounds` only for the plain estimate.
    fn bind_checks_bounds_for_untransformed_priors() {
        // Arrange
        let mut estimates = Estimates::new(&[
            config(r#"{"parameter": "process[a].r0", "lower_bound": 1, "upper_bound": 10}"#),
            config(
                r#"{"parameter": "process[b].r0", "lower_bound": 1, "upper_bound": 10,
                    "transformation": "log", "prior_applies_to_transform": true}"#,
            ),
        ])
        .unwrap();

        // Act
        let plain = estimates.get_mut(0).bind(20.0);
        let transformed = estimates.get_mut(1).bind(20.0);

        // Assert
        assert!(matches!(plain, Err(EstimateError::OutOfBounds { .. })));
        assert!(transformed.is_ok());
    }

    #[test]
    // Purpose
    // -------
    // A Jacobian on a prior that already lives on the transformed scale is
    // contradictory.
    fn jacobian_with_transformed_prior_is_rejected() {
        let c = config(
            r#"{"parameter": "process[a].r0", "lower_bound": 1, "upper_bound": 10, "transformation": "log",
                "transform_with_jacobian": true, "prior_applies_to_transform": true}"#,
        );
        assert!(matches!(Estimates::new(&[c]), Err(EstimateError::InconsistentFlags { .. })));
    }
}
