//! biology — pure evaluators consumed by processes and observations.
//!
//! Selectivity curves map an age or length to a multiplier; age-length and
//! length-weight relationships give the mean weight per partition slot;
//! ageing errors spread numbers at true age over the ages they are read as.
pub mod age_length;
pub mod ageing_error;
pub mod errors;
pub mod selectivity;

// ---- Re-exports (primary public surface) ----
pub use self::age_length::{
    AgeLength, AgeLengthConfig, AgeLengthShape, Growth, LengthWeight, LengthWeightConfig,
    LengthWeightShape, WeightUnits,
};
pub use self::ageing_error::{AgeingError, AgeingErrorConfig, AgeingErrorId, AgeingErrorShape, AgeingErrors};
pub use self::errors::{BiologyError, BiologyResult};
pub use self::selectivity::{
    Selectivities, Selectivity, SelectivityConfig, SelectivityId, SelectivityShape,
};
