//! Constant recruitment: add `r0 * proportion` fish at the recruitment age.
use serde::Deserialize;

use crate::{
    model::objects::{Addressable, scalar, vector_element},
    partition::{CategoriesAccessor, PartitionStructure},
    processes::{
        BuildContext, ExecutionContext, Process, ProcessType, common,
        errors::{ProcessError, ProcessResult},
    },
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecruitmentConstantConfig {
    pub label: String,
    pub categories: Vec<String>,
    pub proportions: Vec<f64>,
    pub r0: f64,
    /// Defaults to the partition's minimum age.
    #[serde(default)]
    pub age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecruitmentConstant {
    config: RecruitmentConstantConfig,
    labels: Vec<String>,
    accessor: CategoriesAccessor,
    slot: usize,
}

impl RecruitmentConstant {
    pub fn new(config: RecruitmentConstantConfig) -> Self {
        Self { config, labels: Vec::new(), accessor: CategoriesAccessor::default(), slot: 0 }
    }
}

impl Addressable for RecruitmentConstant {
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64> {
        match parameter {
            "r0" => scalar(&mut self.config.r0, index),
            "proportions" => vector_element(&mut self.config.proportions, index),
            _ => None,
        }
    }
}

impl Process for RecruitmentConstant {
    fn label(&self) -> &str {
        &self.config.label
    }

    fn process_type(&self) -> ProcessType {
        ProcessType::Recruitment
    }

    fn sub_type(&self) -> &'static str {
        "recruitment_constant"
    }

    fn validate(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        let label = &self.config.label;
        if ctx.partition.structure() != PartitionStructure::Age {
            return Err(ProcessError::RequiresAgePartition { process: label.clone() });
        }
        self.labels = ctx.categories.expand_labels(&self.config.categories, "categories")?;
        if self.config.proportions.len() != self.labels.len() {
            return Err(ProcessError::LengthMismatch {
                process: label.clone(),
                parameter: "proportions",
                expected: self.labels.len(),
                found: self.config.proportions.len(),
            });
        }
        common::check_range(label, "proportions", &self.config.proportions, 0.0, 1.0)?;
        common::check_sums_to_one(label, "proportions", &self.config.proportions)?;
        if self.config.r0 < 0.0 {
            return Err(ProcessError::InvalidParameter {
                process: label.clone(),
                parameter: "r0",
                reason: format!("{} is negative", self.config.r0),
            });
        }
        let age = self.config.age.unwrap_or(ctx.partition.min_age());
        if age < ctx.partition.min_age() || age > ctx.partition.max_age() {
            return Err(ProcessError::InvalidParameter {
                process: label.clone(),
                parameter: "age",
                reason: format!(
                    "{age} is outside the partition ages [{}, {}]",
                    ctx.partition.min_age(),
                    ctx.partition.max_age()
                ),
            });
        }
        self.slot = (age - ctx.partition.min_age()) as usize;
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> ProcessResult<()> {
        self.accessor = CategoriesAccessor::new(ctx.partition, &self.labels)?;
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> ProcessResult<()> {
        let active: Vec<_> = self.accessor.active(ctx.partition, ctx.state.year).collect();
        for (i, id) in active {
            ctx.partition.get_mut(id).data[self.slot] += self.config.r0 * self.config.proportions[i];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processes::test_support::Fixture;

    fn config(proportions: Vec<f64>) -> RecruitmentConstantConfig {
        RecruitmentConstantConfig {
            label: "recruitment".to_string(),
            categories: vec!["immature.male".to_string(), "immature.female".to_string()],
            proportions,
            r0: 1000.0,
            age: None,
        }
    }

    #[test]
    // Purpose
    // -------
    // Recruits are split by proportion into the first age slot.
    //
    // Given
    // -----
    // - r0 = 1000 split 0.4 / 0.6.
    //
    // Expect
    // ------
    // - 400 and 600 added at the minimum age.
    fn execute_adds_proportioned_recruits() {
        // Arrange
        let mut fx = Fixture::new(&["immature.male", "immature.female"], 1, 5, vec![], vec![]);
        let mut p = RecruitmentConstant::new(config(vec![0.4, 0.6]));
        fx.prepare(&mut p).unwrap();

        // Act
        fx.run(&mut p, 2000, 0).unwrap();

        // Assert
        assert_eq!(fx.data("immature.male")[0], 400.0);
        assert_eq!(fx.data("immature.female")[0], 600.0);
        assert_eq!(fx.data("immature.male")[1], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Proportions that do not sum to one are rejected.
    //
    // Given
    // -----
    // - Proportions 0.4 / 0.4.
    //
    // Expect
    // ------
    // - `InvalidParameter` on `proportions`.
    fn validate_rejects_proportions_not_summing_to_one() {
        // Arrange
        let fx = Fixture::new(&["immature.male", "immature.female"], 1, 5, vec![], vec![]);
        let mut p = RecruitmentConstant::new(config(vec![0.4, 0.4]));

        // Act
        let err = fx.prepare(&mut p).unwrap_err();

        // Assert
        match err {
            ProcessError::InvalidParameter { parameter, .. } => assert_eq!(parameter, "proportions"),
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // r0 is reachable as an addressable.
    //
    // Given
    // -----
    // - A built process.
    //
    // Expect
    // ------
    // - Writing through `r0` changes the next recruitment.
    fn r0_is_addressable() {
        // Arrange
        let mut fx = Fixture::new(&["immature.male", "immature.female"], 1, 5, vec![], vec![]);
        let mut p = RecruitmentConstant::new(config(vec![0.5, 0.5]));
        fx.prepare(&mut p).unwrap();

        // Act
        *p.addressable_mut("r0", None).unwrap() = 10.0;
        fx.run(&mut p, 2000, 0).unwrap();

        // Assert
        assert_eq!(fx.data("immature.male")[0], 5.0);
    }
}
