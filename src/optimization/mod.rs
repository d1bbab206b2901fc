//! optimization — minimiser stack behind `Model::run_estimation`.
//!
//! - [`minimiser`]: L-BFGS over an unconstrained vector (argmin).
//! - [`bounded`]: the sine scaling that keeps bounded estimates inside
//!   their box while the minimiser searches freely.
//! - [`covariance`]: Hessian pseudo-inverse at the point estimate.
//! - [`errors`]: [`OptError`] and its conversion from argmin errors.
pub mod bounded;
pub mod covariance;
pub mod errors;
pub mod minimiser;

// ---- Re-exports (primary public surface) ----
pub use self::bounded::BoundedObjective;
pub use self::covariance::covariance_from_hessian;
pub use self::errors::{OptError, OptResult};
pub use self::minimiser::{MinimiserConfig, MinimiserOutcome, minimise};
