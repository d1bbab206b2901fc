//! minimiser::types — numeric aliases and solver wiring.
//!
//! Every minimiser module uses these aliases instead of naming `ndarray`
//! or argmin generics directly.
use std::collections::HashMap;

use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};

/// Point in the minimiser's (scaled) parameter space.
pub type Theta = Array1<f64>;

/// Gradient of the objective with respect to [`Theta`].
pub type Grad = Array1<f64>;

/// Dense `n × n` second derivative matrix.
pub type Hessian = Array2<f64>;

/// Objective value; the minimiser always minimises.
pub type Cost = f64;

/// Function-evaluation counters reported by argmin (`cost_count`, ...).
pub type FnEvalMap = HashMap<String, u64>;

/// Default L-BFGS history size.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
