//! model — configuration, assembly and run modes of a population model.
//!
//! Purpose
//! -------
//! Tie the partition, biology, processes, observations and estimation
//! layers into one [`Model`] built from a [`ModelConfig`].
//!
//! Key behaviors
//! -------------
//! - [`config`] deserialises the whole model description from JSON.
//! - [`objects`] parses addressable names (`type[label].parameter{index}`)
//!   and defines the [`Addressable`] seam every estimable object implements.
//! - [`derived_quantities`] records partition summaries that recruitment and
//!   observations read back.
//! - [`runner`] owns the annual cycle and the run modes.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every error from a lower layer converts into [`ModelError`].
//! - Run state ([`RunState`]) is threaded explicitly; no global state.
//!
//! Downstream usage
//! ----------------
//! - `Model::build(ModelConfig::from_json_file(path)?)?.run_basic()?`.
pub mod config;
pub mod derived_quantities;
pub mod errors;
pub mod objects;
pub mod runner;
pub mod state;

// ---- Re-exports (primary public surface) ----
pub use self::config::{InitialisationPhaseConfig, ModelConfig, ModelStructureConfig, TimeStepConfig};
pub use self::derived_quantities::{DerivedQuantities, DerivedQuantity, DerivedQuantityConfig, DerivedQuantityKind};
pub use self::errors::{ModelError, ModelResult};
pub use self::objects::{Addressable, AddressableName, AddressableType};
pub use self::runner::Model;
pub use self::state::{Phase, RunMode, RunState};
