//! optimization::covariance — covariance matrix from a Hessian.
//!
//! The Hessian of the objective (a negative log posterior) at its minimum
//! is the observed information. Its Moore-Penrose pseudo-inverse is built
//! from a symmetric eigendecomposition; eigenvalues at or below
//! [`EIGEN_EPS`] are dropped, which leaves flat directions with zero
//! variance rather than dividing by noise.
use nalgebra::DMatrix;
use ndarray::Array2;

use crate::optimization::{
    errors::{OptError, OptResult},
    minimiser::Hessian,
};

/// Eigenvalues no larger than this are treated as zero.
pub const EIGEN_EPS: f64 = 1e-12;

/// Pseudo-inverse of a symmetric `n × n` Hessian.
///
/// Errors
/// ------
/// - `HessianDimMismatch` for a non-square matrix.
/// - `InvalidHessian` for a non-finite entry.
pub fn covariance_from_hessian(hessian: &Hessian) -> OptResult<Array2<f64>> {
    let n = hessian.nrows();
    if hessian.ncols() != n {
        return Err(OptError::HessianDimMismatch { expected: n, found: hessian.dim() });
    }
    if let Some(((row, col), &value)) = hessian.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(OptError::InvalidHessian { row, col, value });
    }

    let eigen = to_dmatrix(hessian).symmetric_eigen();
    let q = eigen.eigenvectors;
    let kept: Vec<(usize, f64)> =
        eigen.eigenvalues.iter().copied().enumerate().filter(|(_, lambda)| *lambda > EIGEN_EPS).collect();
    let mut covariance = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let v: f64 = kept.iter().map(|&(k, lambda)| q[(i, k)] * q[(j, k)] / lambda).sum();
            covariance[[i, j]] = v;
            covariance[[j, i]] = v;
        }
    }
    Ok(covariance)
}

/// Correlation matrix of a covariance matrix; zero-variance rows are zero.
pub fn correlation(covariance: &Array2<f64>) -> Array2<f64> {
    let sd: Vec<f64> = covariance.diag().iter().map(|v| v.max(0.0).sqrt()).collect();
    Array2::from_shape_fn(covariance.dim(), |(i, j)| {
        if sd[i] > 0.0 && sd[j] > 0.0 { covariance[[i, j]] / (sd[i] * sd[j]) } else { 0.0 }
    })
}

// ---- Helper methods ----

pub(crate) fn to_dmatrix(m: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[[i, j]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement with the analytic inverse for a well-conditioned Hessian.
    // - Truncation of a singular direction.
    // - Shape and finiteness checks.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A positive-definite Hessian is inverted exactly.
    //
    // Given
    // -----
    // - H = [[4, 1], [1, 2]], det 7.
    //
    // Expect
    // ------
    // - [[2/7, -1/7], [-1/7, 4/7]] within 1e-12; correlation -1/sqrt(8).
    fn covariance_inverts_positive_definite_hessian() {
        // Arrange
        let h = array![[4.0, 1.0], [1.0, 2.0]];

        // Act
        let cov = covariance_from_hessian(&h).unwrap();

        // Assert
        let want = array![[2.0 / 7.0, -1.0 / 7.0], [-1.0 / 7.0, 4.0 / 7.0]];
        for (got, want) in cov.iter().zip(want.iter()) {
            assert!((got - want).abs() < 1e-12, "{cov:?}");
        }
        let corr = correlation(&cov);
        assert!((corr[[0, 1]] + 1.0 / 8f64.sqrt()).abs() < 1e-12);
        assert!((corr[[1, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A zero eigenvalue contributes nothing instead of blowing up.
    //
    // Given
    // -----
    // - H = diag(2, 0).
    //
    // Expect
    // ------
    // - diag(0.5, 0).
    fn singular_direction_is_truncated() {
        // Act
        let cov = covariance_from_hessian(&array![[2.0, 0.0], [0.0, 0.0]]).unwrap();

        // Assert
        assert!((cov[[0, 0]] - 0.5).abs() < 1e-12);
        assert_eq!(cov[[1, 1]], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Invalid input is reported, not decomposed.
    //
    // Given
    // -----
    // - A 2x3 matrix and a matrix holding NaN.
    //
    // Expect
    // ------
    // - `HessianDimMismatch` and `InvalidHessian` at (1, 0).
    fn invalid_hessian_is_rejected() {
        let wide = Array2::<f64>::zeros((2, 3));
        assert!(matches!(covariance_from_hessian(&wide), Err(OptError::HessianDimMismatch { .. })));
        match covariance_from_hessian(&array![[1.0, 0.0], [f64::NAN, 1.0]]) {
            Err(OptError::InvalidHessian { row, col, .. }) => assert_eq!((row, col), (1, 0)),
            other => panic!("expected InvalidHessian, got {other:?}"),
        }
    }
}
