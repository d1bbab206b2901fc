//! Shared runner for both L-BFGS variants.
use argmin::core::{Executor, State};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;
use tracing::debug;

use crate::optimization::{
    errors::OptResult,
    minimiser::{
        adapter::ArgMinAdapter,
        traits::{MinimiserOptions, MinimiserOutcome, Objective},
        types::{Grad, Theta},
    },
};

/// Run `solver` from `theta0` and collect the best point found.
///
/// With the `obs_slog` feature and `opts.verbose`, a terminal slog
/// observer reports every iteration.
///
/// Errors
/// ------
/// - Any argmin runtime error, including objective failures raised inside
///   the adapter, through `From<argmin::core::Error>`.
/// - Validation errors from [`MinimiserOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MinimiserOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<MinimiserOutcome>
where
    F: Objective,
    S: argmin::core::Solver<ArgMinAdapter<'a, F>, argmin::core::IterState<Theta, Grad, (), (), (), f64>>
        + Send
        + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    debug!(iterations, status = ?termination, best = result.get_best_cost(), "minimiser finished");
    let grad = result.take_gradient();
    MinimiserOutcome::new(result.take_best_param(), result.get_best_cost(), termination, iterations, function_counts, grad)
}

// ---- Helper methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state<F: Objective>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()> {
    let c0 = problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    tracing::info!(cost = c0, grad_norm = ?g0n, "minimiser starting point");
    Ok(())
}
