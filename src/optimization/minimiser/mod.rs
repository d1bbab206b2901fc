//! minimiser — L-BFGS minimisation of a scalar objective via argmin.
//!
//! Purpose
//! -------
//! Minimise an [`Objective`] over an unconstrained parameter vector. The
//! model's bounded estimates are mapped into that space by
//! [`crate::optimization::bounded`] before they reach this module.
//!
//! Key behaviors
//! -------------
//! - [`minimise`] selects More-Thuente or Hager-Zhang line search.
//! - Gradients come from [`Objective::grad`] or finite differences.
//! - Objective errors raised inside argmin are recovered unchanged.
//!
//! Downstream usage
//! ----------------
//! - `Model::run_estimation` minimises once per estimation phase.
pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----
pub use self::api::minimise;
pub use self::finite_diff::cost_hessian;
pub use self::traits::{LineSearcher, MinimiserConfig, MinimiserOptions, MinimiserOutcome, Objective, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Hessian, Theta};

pub mod prelude {
    pub use super::api::minimise;
    pub use super::traits::{MinimiserOptions, MinimiserOutcome, Objective, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
