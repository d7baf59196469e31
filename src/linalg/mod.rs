pub(crate) mod cholesky;
pub(crate) mod lu;
pub(crate) mod qr;
pub(crate) mod svd;

pub use cholesky::{Cholesky, Half};
pub use lu::Lu;
pub use qr::Qr;
pub use svd::singular_values;

use crate::matrix::Matrix;
use crate::traits::{FloatScalar, MatrixRef};

/// Errors from linear algebra operations.
///
/// Returned by decomposition constructors and the accessor/solve surface.
///
/// ```
/// use dynalg::{Matrix, LinalgError};
///
/// let not_pd = Matrix::from_rows(2, 2, &[1.0_f64, 5.0, 5.0, 1.0]);
/// let chol = not_pd.cholesky().unwrap();
/// assert_eq!(chol.determinant().unwrap_err(), LinalgError::NotPositiveDefinite);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinalgError {
    /// Input shapes disagree with the required contract.
    Dimension {
        /// Expected `(rows, cols)`.
        expected: (usize, usize),
        /// Got `(rows, cols)`.
        got: (usize, usize),
    },
    /// Matrix is singular or nearly singular.
    Singular,
    /// Matrix is not positive definite (required for the standard Cholesky
    /// solve/inverse/determinant surface).
    NotPositiveDefinite,
    /// The robust LDLᵀ decomposition hit an exactly-zero pivot; the factor
    /// is unusable.
    Undefined,
    /// QR factor has an exactly-zero diagonal entry; least-squares solve
    /// is unavailable.
    RankDeficient,
    /// Iterative algorithm did not converge within its sweep budget.
    ConvergenceFailure,
}

impl core::fmt::Display for LinalgError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinalgError::Dimension { expected, got } => write!(
                f,
                "dimension mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, got.0, got.1
            ),
            LinalgError::Singular => write!(f, "matrix is singular"),
            LinalgError::NotPositiveDefinite => {
                write!(f, "matrix is not positive definite")
            }
            LinalgError::Undefined => write!(f, "decomposition is undefined"),
            LinalgError::RankDeficient => write!(f, "matrix is rank deficient"),
            LinalgError::ConvergenceFailure => {
                write!(f, "iterative algorithm did not converge")
            }
        }
    }
}

impl std::error::Error for LinalgError {}

/// Overflow-safe hypotenuse: `sqrt(a² + b²)` without squaring the larger
/// magnitude directly.
#[inline]
pub(crate) fn hypot<T: FloatScalar>(a: T, b: T) -> T {
    let (a, b) = (a.abs(), b.abs());
    if a > b {
        let r = b / a;
        a * (T::one() + r * r).sqrt()
    } else if b != T::zero() {
        let r = a / b;
        b * (T::one() + r * r).sqrt()
    } else {
        T::zero()
    }
}

/// Solve `L·x = b` by forward substitution, where L is lower triangular.
#[inline]
pub(crate) fn forward_substitute<T: FloatScalar>(l: &impl MatrixRef<T>, b: &[T], x: &mut [T]) {
    let n = l.nrows();
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum = sum - *l.get(i, j) * x[j];
        }
        x[i] = sum / *l.get(i, i);
    }
}

/// Solve `Lᵀ·x = b` by back substitution, where L is lower triangular.
#[inline]
pub(crate) fn back_substitute_lt<T: FloatScalar>(l: &impl MatrixRef<T>, b: &[T], x: &mut [T]) {
    let n = l.nrows();
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum = sum - *l.get(j, i) * x[j];
        }
        x[i] = sum / *l.get(i, i);
    }
}

// ── Dispatch / probe surface on Matrix ──────────────────────────────

impl<T: FloatScalar> Matrix<T> {
    /// Determinant.
    ///
    /// With `symmetric = true` the caller asserts the matrix is symmetric
    /// positive definite and the much cheaper Cholesky path is taken. The
    /// assertion is not verified: a non-PD input surfaces
    /// [`LinalgError::NotPositiveDefinite`] from the internal Cholesky
    /// rather than a silently wrong result. With `symmetric = false` the
    /// LU path is used.
    ///
    /// ```
    /// use dynalg::Matrix;
    /// let a = Matrix::from_rows(2, 2, &[4.0_f64, 2.0, 2.0, 3.0]);
    /// let d_chol = a.determinant(true).unwrap();
    /// let d_lu = a.determinant(false).unwrap();
    /// assert!((d_chol - 8.0).abs() < 1e-12);
    /// assert!((d_chol - d_lu).abs() < 1e-12);
    /// ```
    pub fn determinant(&self, symmetric: bool) -> Result<T, LinalgError> {
        if symmetric {
            Cholesky::new(self, Half::Lower)?.determinant()
        } else {
            Ok(Lu::new(self)?.det())
        }
    }

    /// Natural logarithm of the determinant, computed without forming the
    /// (possibly overflowing) determinant itself.
    pub fn log_determinant(&self, symmetric: bool) -> Result<T, LinalgError> {
        if symmetric {
            Cholesky::new(self, Half::Lower)?.log_determinant()
        } else {
            Ok(Lu::new(self)?.log_abs_det())
        }
    }

    /// Numerical rank from the singular-value spectrum.
    ///
    /// ```
    /// use dynalg::Matrix;
    /// let a = Matrix::from_rows(2, 2, &[1.0_f64, 2.0, 2.0, 4.0]);
    /// assert_eq!(a.rank().unwrap(), 1);
    /// ```
    pub fn rank(&self) -> Result<usize, LinalgError> {
        let sv = singular_values(self)?;
        let max_sv = sv.first().copied().unwrap_or_else(T::zero);
        let dim = T::from(self.nrows().max(self.ncols())).unwrap_or_else(T::one);
        let tol = dim * T::epsilon() * max_sv;
        Ok(sv.iter().filter(|&&s| s > tol).count())
    }

    /// Whether a square matrix is singular (rank below full).
    pub fn is_singular(&self) -> Result<bool, LinalgError> {
        Ok(self.rank()? < self.nrows().min(self.ncols()))
    }

    /// Whether the matrix is symmetric positive definite, probed via
    /// Cholesky.
    ///
    /// ```
    /// use dynalg::Matrix;
    /// let pd = Matrix::from_rows(2, 2, &[4.0_f64, 2.0, 2.0, 3.0]);
    /// assert!(pd.is_positive_definite());
    /// let not_pd = Matrix::from_rows(2, 2, &[1.0_f64, 5.0, 5.0, 1.0]);
    /// assert!(!not_pd.is_positive_definite());
    /// ```
    pub fn is_positive_definite(&self) -> bool {
        match Cholesky::new(self, Half::Lower) {
            Ok(chol) => chol.positive_definite(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hypot_matches_naive() {
        assert!((hypot(3.0_f64, 4.0) - 5.0).abs() < 1e-12);
        assert!((hypot(-3.0_f64, 4.0) - 5.0).abs() < 1e-12);
        assert_eq!(hypot(0.0_f64, 0.0), 0.0);
    }

    #[test]
    fn hypot_avoids_overflow() {
        let big = 1e200_f64;
        let h = hypot(big, big);
        assert!(h.is_finite());
        assert!((h / big - core::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn determinant_dispatch_agrees() {
        let a = Matrix::from_rows(3, 3, &[4.0_f64, 2.0, 1.0, 2.0, 10.0, 3.5, 1.0, 3.5, 4.5]);
        let d_chol = a.determinant(true).unwrap();
        let d_lu = a.determinant(false).unwrap();
        assert!((d_chol - d_lu).abs() < 1e-10);
    }

    #[test]
    fn determinant_symmetric_lie_fails_fast() {
        // Caller asserts symmetric/PD for a matrix that is neither: the
        // internal Cholesky reports non-positive-definiteness instead of
        // returning a silently wrong value.
        let a = Matrix::from_rows(2, 2, &[1.0, 5.0, 5.0, 1.0]);
        assert_eq!(
            a.determinant(true).unwrap_err(),
            LinalgError::NotPositiveDefinite
        );
    }

    #[test]
    fn log_determinant() {
        let a = Matrix::from_rows(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        let ld = a.log_determinant(true).unwrap();
        assert!((ld - 8.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn rank_full_and_deficient() {
        let full = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(full.rank().unwrap(), 2);
        assert!(!full.is_singular().unwrap());

        let deficient = Matrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 1.0, 1.0]);
        assert_eq!(deficient.rank().unwrap(), 2);
        assert!(deficient.is_singular().unwrap());
    }
}
