//! stock_assessment — age-structured population dynamics and estimation.
//!
//! Purpose
//! -------
//! Serve as the crate root for a fisheries stock-assessment engine: a
//! partitioned population advanced through years and time steps by
//! processes, compared against observations through likelihoods, and
//! fitted by penalised likelihood minimisation or MCMC.
//!
//! Key behaviors
//! -------------
//! - [`model`] builds a [`model::Model`] from a JSON [`model::ModelConfig`]
//!   and runs it in basic, estimation, MCMC or simulation mode.
//! - [`partition`], [`biology`] and [`processes`] carry the population
//!   state and its dynamics.
//! - [`observations`], [`likelihoods`], [`penalties`], [`estimates`],
//!   [`estimate_transformations`] and [`objective`] turn a run into one
//!   scalar score.
//! - [`optimization`] and [`mcmc`] search that score; [`mpd`] stores the
//!   point estimate between the two.
//!
//! Invariants & assumptions
//! ------------------------
//! - All randomness flows through an explicit, seeded [`rng::ModelRng`].
//! - Fatal configuration and runtime problems are returned as typed errors
//!   that convert into [`model::ModelError`]; warnings go to `tracing`.
//!
//! Conventions
//! -----------
//! - Objects are referenced by label in configuration and resolved to
//!   indices once at build time.
//! - Every score is a negative log density; the minimiser minimises it
//!   as is.
//!
//! Downstream usage
//! ----------------
//! - Call [`logging::init_tracing`] once to see build and run events.
//! - `use stock_assessment::prelude::*;` brings in the everyday surface.

pub mod biology;
pub mod estimate_transformations;
pub mod estimates;
pub mod likelihoods;
pub mod logging;
pub mod mcmc;
pub mod model;
pub mod mpd;
pub mod objective;
pub mod observations;
pub mod optimization;
pub mod partition;
pub mod penalties;
pub mod processes;
pub mod rng;
pub mod utils;

// ---- Optional convenience prelude for downstream crates ----

pub mod prelude {
    pub use crate::{
        mcmc::{ChainLink, McmcConfig},
        model::{AddressableName, Model, ModelConfig, ModelError, ModelResult, RunMode},
        mpd::Mpd,
        objective::ObjectiveFunction,
        rng::ModelRng,
    };
}
