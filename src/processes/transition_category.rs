//! Category transitions (maturation, sex change, tag loss).
//!
//! Moves `N_from(slot) * proportion * sel(slot)` into the paired `to`
//! category. Every amount is computed from the pre-step partition before
//! any is applied, so chained pairs (`a -> b`, `b -> c`) do not cascade
//! within one step.
use serde::Deserialize;

use crate::{
    biology::SelectivityId,
    model::objects::Addressable,
    partition::CategoryId,
    processes::{
        BuildContext, ExecutionContext, Process, ProcessType, common,
        errors::{ProcessError, ProcessResult},
    },
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransitionCategoryConfig {
    pub label: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
    /// One value, or one per pair.
    pub proportions: Vec<f64>,
    pub selectivities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCategory {
    config: TransitionCategoryConfig,
    from_labels: Vec<String>,
    to_labels: Vec<String>,
    pairs: Vec<(CategoryId, CategoryId)>,
    selectivities: Vec<SelectivityId>,
}

impl TransitionCategory {
    pub fn new(config: TransitionCategoryConfig) -> Self {
        Self {
            config,
            from_labels: Vec::new(),
            to_labels: Vec::new(),
            pairs: Vec::new(),
            selectivities: Vec::new(),
        }
    }

    fn proportion(&self, i: usize) -> f64 {
        let p = &self.config.proportions;
        if p.len() == 1 { p[0] } else { p[i] }
    }
}

impl Addressable for TransitionCategory {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match parameter {
            "proportions" => common::vector_or_scalar(&mut self.config.proportions, index),
            _ => None,
        }
    }
}

impl Process for TransitionCategory {
    fn label(&self) -> &str {
        &self.config.label
    }

    fn process_type(&self) -> ProcessType {
        ProcessType::Transition
    }

    fn sub_type(&self) -> &'static str {
        "transition_category"
    }

    fn validate(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        let label = &self.config.label;
        self.from_labels = ctx.categories.expand_labels(&self.config.from, "from")?;
        self.to_labels = ctx.categories.expand_labels(&self.config.to, "to")?;
        let n = self.from_labels.len();
        if self.to_labels.len() != n {
            return Err(ProcessError::LengthMismatch {
                process: label.clone(),
                parameter: "to",
                expected: n,
                found: self.to_labels.len(),
            });
        }
        if let Some((f, _)) = self.from_labels.iter().zip(&self.to_labels).find(|(f, t)| f == t) {
            return Err(ProcessError::InvalidParameter {
                process: label.clone(),
                parameter: "to",
                reason: format!("'{f}' cannot transition into itself"),
            });
        }
        common::broadcast(&self.config.proportions, n, label, "proportions")?;
        common::check_range(label, "proportions", &self.config.proportions, 0.0, 1.0)?;
        common::broadcast_labels(&self.config.selectivities, n, label, "selectivities")?;
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        self.pairs = self
            .from_labels
            .iter()
            .zip(&self.to_labels)
            .map(|(f, t)| Ok((ctx.partition.id(f)?, ctx.partition.id(t)?)))
            .collect::<ProcessResult<Vec<_>>>()?;
        self.selectivities = ctx.selectivities.resolve_list(&self.config.selectivities, self.pairs.len())?;
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> ProcessResult<()> {
        let year = ctx.state.year;
        let mut moves = Vec::with_capacity(self.pairs.len());
        for (i, (from, to)) in self.pairs.iter().enumerate() {
            if !ctx.partition.get(*from).is_active(year) || !ctx.partition.get(*to).is_active(year) {
                continue;
            }
            let sel = ctx.selectivities.get(self.selectivities[i]);
            let proportion = self.proportion(i);
            let amounts: Vec<f64> = ctx
                .partition
                .get(*from)
                .data
                .iter()
                .enumerate()
                .map(|(slot, n)| n * proportion * sel.value(slot))
                .collect();
            moves.push((*from, *to, amounts));
        }

        for (from, to, amounts) in moves {
            let (source, destination) = ctx.partition.pair_mut(from, to);
            for (slot, amount) in amounts.into_iter().enumerate() {
                source.data[slot] -= amount;
                destination.data[slot] += amount;
            }
            if let Some((slot, value)) = source.data.iter().copied().enumerate().find(|(_, v)| *v < 0.0) {
                return Err(ProcessError::NegativeAbundance {
                    process: self.config.label.clone(),
                    category: source.name.clone(),
                    slot,
                    value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processes::test_support::{Fixture, constant};

    #[test]
    // Purpose
    // -------
    // Chained transitions use pre-step abundance.
    //
    // Given
    // -----
    // - a -> b and b -> c, both at proportion 0.5; N(a) = N(b) = 100.
    //
    // Expect
    // ------
    // - a = 50, b = 100 (50 in, 50 out), c = 50.
    fn chained_transitions_do_not_cascade() {
        // Arrange
        let mut fx = Fixture::new(
            &["a.male", "b.male", "c.male"],
            1,
            2,
            vec![constant("one", 1.0)],
            vec![],
        );
        let mut p = TransitionCategory::new(TransitionCategoryConfig {
            label: "maturation".to_string(),
            from: vec!["a.male".to_string(), "b.male".to_string()],
            to: vec!["b.male".to_string(), "c.male".to_string()],
            proportions: vec![0.5],
            selectivities: vec!["one".to_string()],
        });
        fx.prepare(&mut p).unwrap();
        fx.set("a.male", vec![100.0; 2]);
        fx.set("b.male", vec![100.0; 2]);

        // Act
        fx.run(&mut p, 2000, 0).unwrap();

        // Assert
        assert_eq!(fx.data("a.male"), vec![50.0; 2]);
        assert_eq!(fx.data("b.male"), vec![100.0; 2]);
        assert_eq!(fx.data("c.male"), vec![50.0; 2]);
    }

    #[test]
    // Purpose
    // -------
    // Proportions outside [0, 1] are rejected.
    //
    // Given
    // -----
    // - proportion 1.5.
    //
    // Expect
    // ------
    // - `InvalidParameter`.
    fn validate_rejects_proportion_above_one() {
        // Arrange
        let fx = Fixture::new(&["a.male", "b.male"], 1, 2, vec![constant("one", 1.0)], vec![]);
        let mut p = TransitionCategory::new(TransitionCategoryConfig {
            label: "maturation".to_string(),
            from: vec!["a.male".to_string()],
            to: vec!["b.male".to_string()],
            proportions: vec![1.5],
            selectivities: vec!["one".to_string()],
        });

        // Act
        let err = fx.prepare(&mut p).unwrap_err();

        // Assert
        assert!(matches!(err, ProcessError::InvalidParameter { .. }));
    }
}
