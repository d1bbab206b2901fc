//! Entry point: minimise an [`Objective`] with L-BFGS.
use crate::optimization::{
    errors::OptResult,
    minimiser::{
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, MinimiserOptions, MinimiserOutcome, Objective},
        types::Theta,
    },
};

/// Minimise `f` starting at `theta0`.
///
/// Errors
/// ------
/// - Solver construction errors for invalid tolerances.
/// - Any error raised while evaluating `f`, or validating the outcome.
pub fn minimise<F: Objective>(f: &F, theta0: Theta, opts: &MinimiserOptions) -> OptResult<MinimiserOutcome> {
    let problem = ArgMinAdapter::new(f);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        minimiser::{
            traits::Tolerances,
            types::{Cost, Grad},
        },
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Convergence on a shifted quadratic with analytic and numerical
    //   gradients, for both line searches.
    // - Propagation of objective failures.
    // -------------------------------------------------------------------------

    struct Shifted {
        analytic: bool,
    }

    impl Objective for Shifted {
        fn value(&self, theta: &Theta) -> OptResult<Cost> {
            Ok((theta[0] - 1.5).powi(2) + 3.0 * (theta[1] + 0.5).powi(2) + 2.0)
        }

        fn grad(&self, theta: &Theta) -> OptResult<Grad> {
            if !self.analytic {
                return Err(OptError::GradientNotImplemented);
            }
            Ok(array![2.0 * (theta[0] - 1.5), 6.0 * (theta[1] + 0.5)])
        }
    }

    struct Failing;

    impl Objective for Failing {
        fn value(&self, _theta: &Theta) -> OptResult<Cost> {
            Err(OptError::ObjectiveFailed { reason: "model error".to_string() })
        }
    }

    fn options(line_searcher: LineSearcher) -> MinimiserOptions {
        let tols = Tolerances::new(Some(1e-8), None, Some(200)).unwrap();
        MinimiserOptions::new(tols, line_searcher, false, None).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Both line searches find the minimum with either gradient source.
    //
    // Given
    // -----
    // - c = (x - 1.5)^2 + 3(y + 0.5)^2 + 2 from the origin.
    //
    // Expect
    // ------
    // - theta_hat near (1.5, -0.5), value near 2, converged.
    fn minimise_shifted_quadratic() {
        for line_searcher in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            for analytic in [true, false] {
                // Act
                let out = minimise(&Shifted { analytic }, array![0.0, 0.0], &options(line_searcher)).unwrap();

                // Assert
                assert!((out.theta_hat[0] - 1.5).abs() < 1e-4, "{line_searcher:?} {analytic}: {out:?}");
                assert!((out.theta_hat[1] + 0.5).abs() < 1e-4, "{line_searcher:?} {analytic}: {out:?}");
                assert!((out.value - 2.0).abs() < 1e-6);
                assert!(out.converged);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // A failing objective is reported as its own error.
    //
    // Given
    // -----
    // - An objective that always fails.
    //
    // Expect
    // ------
    // - `ObjectiveFailed` carrying the model's reason.
    fn minimise_propagates_objective_failure() {
        // Act
        let result = minimise(&Failing, array![0.0], &options(LineSearcher::MoreThuente));

        // Assert
        match result {
            Err(OptError::ObjectiveFailed { reason }) => assert_eq!(reason, "model error"),
            other => panic!("expected ObjectiveFailed, got {other:?}"),
        }
    }
}
