//! Ageing: shift every category one age class older.
use serde::Deserialize;

use crate::{
    model::objects::Addressable,
    partition::{CategoriesAccessor, PartitionStructure},
    processes::{
        BuildContext, ExecutionContext, Process, ProcessType,
        errors::{ProcessError, ProcessResult},
    },
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgeingConfig {
    pub label: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ageing {
    config: AgeingConfig,
    labels: Vec<String>,
    accessor: CategoriesAccessor,
}

impl Ageing {
    pub fn new(config: AgeingConfig) -> Self {
        Self { config, labels: Vec::new(), accessor: CategoriesAccessor::default() }
    }
}

impl Addressable for Ageing {
    fn addressable_mut(&mut self, _parameter: &str, _index: Option<&str>) -> Option<&mut f64> {
        None
    }
}

impl Process for Ageing {
    fn label(&self) -> &str {
        &self.config.label
    }

    fn process_type(&self) -> ProcessType {
        ProcessType::Ageing
    }

    fn sub_type(&self) -> &'static str {
        "ageing"
    }

    fn validate(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        if ctx.partition.structure() != PartitionStructure::Age {
            return Err(ProcessError::RequiresAgePartition { process: self.config.label.clone() });
        }
        self.labels = ctx.categories.expand_labels(&self.config.categories, "categories")?;
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        self.accessor = CategoriesAccessor::new(ctx.partition, &self.labels)?;
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> ProcessResult<()> {
        let plus_group = ctx.partition.plus_group();
        let active: Vec<_> = self.accessor.active(ctx.partition, ctx.state.year).collect();
        for (_, id) in active {
            let data = &mut ctx.partition.get_mut(id).data;
            let n = data.len();
            if n < 2 {
                if !plus_group {
                    data.iter_mut().for_each(|v| *v = 0.0);
                }
                continue;
            }
            let plus = if plus_group { data[n - 1] + data[n - 2] } else { data[n - 2] };
            data.copy_within(0..n - 1, 1);
            data[0] = 0.0;
            data[n - 1] = plus;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processes::test_support::Fixture;

    #[test]
    // Purpose
    // -------
    // Ageing shifts abundance up one age and accumulates the plus group.
    //
    // Given
    // -----
    // - Ages 1..=4 with [1, 2, 3, 4], plus group on.
    //
    // Expect
    // ------
    // - [0, 1, 2, 7].
    fn ageing_shifts_and_accumulates_plus_group() {
        // Arrange
        let mut fx = Fixture::new(&["immature.male"], 1, 4, vec![], vec![]);
        let mut p = Ageing::new(AgeingConfig {
            label: "ageing".to_string(),
            categories: vec!["*".to_string()],
        });
        fx.prepare(&mut p).unwrap();
        fx.set("immature.male", vec![1.0, 2.0, 3.0, 4.0]);

        // Act
        fx.run(&mut p, 2000, 0).unwrap();

        // Assert
        assert_eq!(fx.data("immature.male"), vec![0.0, 1.0, 2.0, 7.0]);
    }
}
