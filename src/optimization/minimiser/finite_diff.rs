//! minimiser::finite_diff — finite-difference gradients and Hessians.
//!
//! Purpose
//! -------
//! Give the adapter and the covariance calculation derivatives of a scalar
//! objective without exposing the `finitediff` API.
//!
//! Key behaviors
//! -------------
//! - [`run_fd_diff`]: forward-difference gradient with error capture.
//! - [`compute_hessian`]: central-difference Hessian of a gradient map,
//!   falling back to forward differences when validation fails, then
//!   symmetrised.
//! - [`cost_hessian`]: the Hessian of a cost function, differentiating
//!   its central-difference gradient.
//!
//! Invariants & assumptions
//! ------------------------
//! - Results satisfy [`validate_grad`] / [`validate_hessian`] on the path
//!   that produced them.
use std::cell::RefCell;

use argmin::core::Error;
use finitediff::FiniteDiff;

use crate::optimization::{
    errors::{OptError, OptResult},
    minimiser::{
        types::{Grad, Hessian, Theta},
        validation::{validate_grad, validate_hessian},
    },
};

/// Forward-difference gradient of `func` at `theta`.
///
/// `func` is expected to park any evaluation error in `closure_err` and
/// return `NaN`; the cell is cleared on entry.
///
/// Errors
/// ------
/// - The captured error, converted through `From<argmin::core::Error>`.
/// - `GradientDimMismatch` / `InvalidGradient` from validation.
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// Hessian of the gradient map `f` at `theta`, symmetrised.
///
/// Errors
/// ------
/// - `HessianDimMismatch` / `InvalidHessian` when the forward-difference
///   fallback also fails validation.
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut hess = theta.central_hessian(f);
    if validate_hessian(&hess, dim).is_err() {
        hess = theta.forward_hessian(f);
        validate_hessian(&hess, dim)?;
    }
    symmetrize_hess(&mut hess);
    Ok(hess)
}

/// Hessian of a fallible cost function at `theta`.
///
/// Errors
/// ------
/// - `ObjectiveFailed` (or whatever `cost` returned) for the first failed
///   evaluation.
/// - Validation errors from [`compute_hessian`].
pub fn cost_hessian<C: Fn(&Theta) -> OptResult<f64>>(cost: &C, theta: &Theta) -> OptResult<Hessian> {
    let failure: RefCell<Option<OptError>> = RefCell::new(None);
    let value = |t: &Theta| -> f64 {
        cost(t).unwrap_or_else(|e| {
            failure.borrow_mut().get_or_insert(e);
            f64::NAN
        })
    };
    let gradient = |t: &Theta| -> Grad { t.central_diff(&value) };
    let hess = compute_hessian(&gradient, theta);
    if let Some(err) = failure.take() {
        return Err(err);
    }
    hess
}

// ---- Helper methods ----

/// Average each off-diagonal pair in place.
fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}
