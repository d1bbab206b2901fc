//! Adapter exposing an [`Objective`] as an argmin problem.
//!
//! `cost` forwards the objective value unchanged. `gradient` uses the
//! objective's analytic gradient when it has one, otherwise central
//! differences of the cost with a forward-difference retry when any
//! evaluation failed or the result is not finite.
use std::cell::RefCell;

use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

use crate::optimization::{
    errors::OptError,
    minimiser::{
        finite_diff::run_fd_diff,
        traits::Objective,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};

#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: Objective> {
    pub f: &'a F,
}

impl<'a, F: Objective> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F) -> Self {
        Self { f }
    }
}

impl<F: Objective> CostFunction for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let value = self.f.value(theta)?;
        if !value.is_finite() {
            return Err(OptError::NonFiniteCost { value }.into());
        }
        Ok(value)
    }
}

impl<F: Objective> Gradient for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(g)
            }
            Err(OptError::GradientNotImplemented) => {
                // finitediff closures return f64, so the first failure is
                // parked here and NaN is returned in its place.
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost = |t: &Theta| -> f64 {
                    self.cost(t).unwrap_or_else(|e| {
                        closure_err.borrow_mut().get_or_insert(e);
                        f64::NAN
                    })
                };
                let central = theta.central_diff(&cost);
                if closure_err.borrow().is_none() && validate_grad(&central, dim).is_ok() {
                    return Ok(central);
                }
                Ok(run_fd_diff(theta, &cost, &closure_err)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}
