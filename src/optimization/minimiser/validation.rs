//! Consistency checks shared by the minimiser, the finite-difference
//! helpers and the covariance calculation. Each returns the first
//! offending element as a specific [`OptError`].
use crate::optimization::{
    errors::{OptError, OptResult},
    minimiser::types::{Grad, Hessian, Theta},
};

fn check_tolerance(tol: Option<f64>) -> Result<(), (f64, &'static str)> {
    match tol {
        Some(t) if !t.is_finite() => Err((t, "Tolerance must be finite.")),
        Some(t) if t <= 0.0 => Err((t, "Tolerance must be positive.")),
        _ => Ok(()),
    }
}

pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    check_tolerance(tol).map_err(|(tol, reason)| OptError::InvalidTolGrad { tol, reason })
}

pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    check_tolerance(tol).map_err(|(tol, reason)| OptError::InvalidTolCost { tol, reason })
}

pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    match grad.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        Some((index, &value)) => {
            Err(OptError::InvalidGradient { index, value, reason: "Gradient elements must be finite." })
        }
        None => Ok(()),
    }
}

pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(OptError::InvalidThetaHat { index, value, reason: "Parameter estimates must be finite." });
    }
    Ok(theta)
}

pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.nrows() != dim || hessian.ncols() != dim {
        return Err(OptError::HessianDimMismatch { expected: dim, found: (hessian.nrows(), hessian.ncols()) });
    }
    match hessian.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), &value)) => Err(OptError::InvalidHessian { row, col, value }),
        None => Ok(()),
    }
}
