//! Configuration enum for every process kind, keyed by `type`.
use serde::Deserialize;

use crate::processes::{
    Process,
    ageing::{Ageing, AgeingConfig},
    mortality_constant_rate::{MortalityConstantRate, MortalityConstantRateConfig},
    mortality_disease_rate::{MortalityDiseaseRate, MortalityDiseaseRateConfig},
    mortality_event::{MortalityEvent, MortalityEventConfig},
    mortality_instantaneous::{MortalityInstantaneous, MortalityInstantaneousConfig},
    recruitment_beverton_holt::{RecruitmentBevertonHolt, RecruitmentBevertonHoltConfig},
    recruitment_constant::{RecruitmentConstant, RecruitmentConstantConfig},
    tag_by_age::{TagByAge, TagByAgeConfig},
    transition_category::{TransitionCategory, TransitionCategoryConfig},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessConfig {
    Ageing(AgeingConfig),
    RecruitmentConstant(RecruitmentConstantConfig),
    RecruitmentBevertonHolt(RecruitmentBevertonHoltConfig),
    MortalityConstantRate(MortalityConstantRateConfig),
    MortalityEvent(MortalityEventConfig),
    MortalityInstantaneous(MortalityInstantaneousConfig),
    MortalityDiseaseRate(MortalityDiseaseRateConfig),
    TagByAge(TagByAgeConfig),
    TransitionCategory(TransitionCategoryConfig),
}

impl ProcessConfig {
    pub fn label(&self) -> &str {
        match self {
            Self::Ageing(c) => &c.label,
            Self::RecruitmentConstant(c) => &c.label,
            Self::RecruitmentBevertonHolt(c) => &c.label,
            Self::MortalityConstantRate(c) => &c.label,
            Self::MortalityEvent(c) => &c.label,
            Self::MortalityInstantaneous(c) => &c.label,
            Self::MortalityDiseaseRate(c) => &c.label,
            Self::TagByAge(c) => &c.label,
            Self::TransitionCategory(c) => &c.label,
        }
    }

    pub fn into_process(self) -> Box<dyn Process> {
        match self {
            Self::Ageing(c) => Box::new(Ageing::new(c)),
            Self::RecruitmentConstant(c) => Box::new(RecruitmentConstant::new(c)),
            Self::RecruitmentBevertonHolt(c) => Box::new(RecruitmentBevertonHolt::new(c)),
            Self::MortalityConstantRate(c) => Box::new(MortalityConstantRate::new(c)),
            Self::MortalityEvent(c) => Box::new(MortalityEvent::new(c)),
            Self::MortalityInstantaneous(c) => Box::new(MortalityInstantaneous::new(c)),
            Self::MortalityDiseaseRate(c) => Box::new(MortalityDiseaseRate::new(c)),
            Self::TagByAge(c) => Box::new(TagByAge::new(c)),
            Self::TransitionCategory(c) => Box::new(TransitionCategory::new(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // The `type` key selects the process variant.
    //
    // Given
    // -----
    // - JSON for a constant-rate mortality.
    //
    // Expect
    // ------
    // - The matching variant, label, and sub type.
    fn type_key_selects_variant() {
        // Arrange
        let json = r#"{
            "type": "mortality_constant_rate",
            "label": "halfm",
            "categories": ["*"],
            "m": [0.065],
            "selectivities": ["one"]
        }"#;

        // Act
        let config: ProcessConfig = serde_json::from_str(json).unwrap();
        let label = config.label().to_string();
        let process = config.into_process();

        // Assert
        assert_eq!(label, "halfm");
        assert_eq!(process.sub_type(), "mortality_constant_rate");
    }

    #[test]
    // Purpose
    // -------
    // Unknown process types are rejected at parse time.
    //
    // Given
    // -----
    // - `type: "mortality_hybrid"`.
    //
    // Expect
    // ------
    // - A deserialisation error.
    fn unknown_type_is_rejected() {
        // Act
        let result: Result<ProcessConfig, _> =
            serde_json::from_str(r#"{"type": "mortality_hybrid", "label": "x"}"#);

        // Assert
        assert!(result.is_err());
    }
}
