use crate::linalg::{hypot, LinalgError};
use crate::matrix::vector::Vector;
use crate::matrix::Matrix;
use crate::traits::FloatScalar;

/// QR decomposition of a rectangular matrix using Householder reflections.
///
/// For an m×n input with `m >= n`, produces an orthogonal Q and upper
/// triangular R with `A = Q·R`. The Householder vectors are stored in
/// place of the factored columns; the diagonal of R is kept separately
/// (as the negated, sign-matched column norm), so rank checks are exact.
///
/// The `economy` flag controls whether `q()`/`r()` return the minimal
/// m×n / n×n factors or the full m×m / m×n pair.
///
/// # Example
///
/// ```
/// use dynalg::{Matrix, Vector};
///
/// // Least-squares fit: y = c0 + c1*x to points (0,1), (1,2), (2,4)
/// let a = Matrix::from_rows(3, 2, &[1.0_f64, 0.0, 1.0, 1.0, 1.0, 2.0]);
/// let b = Vector::from_slice(&[1.0, 2.0, 4.0]);
/// let x = a.qr().unwrap().solve_vector(&b).unwrap();
/// assert!((x[0] - 5.0 / 6.0).abs() < 1e-10);
/// assert!((x[1] - 3.0 / 2.0).abs() < 1e-10);
/// ```
#[derive(Debug)]
pub struct Qr<T> {
    /// Packed factorization: upper triangle (excluding diagonal) holds R,
    /// the rest holds the scaled Householder vectors.
    qr: Matrix<T>,
    /// Diagonal of R, stored separately as the negated column norm.
    rdiag: Vec<T>,
    economy: bool,
}

impl<T: FloatScalar> Qr<T> {
    /// Decompose a matrix with `rows >= cols`.
    ///
    /// Fails with a dimension error otherwise; see [`Qr::new_transposed`]
    /// for wide input. Rank-deficient matrices decompose successfully —
    /// only the solve surface requires [`Qr::full_rank`].
    pub fn new(a: &Matrix<T>, economy: bool) -> Result<Self, LinalgError> {
        let (m, n) = (a.nrows(), a.ncols());
        if m < n {
            return Err(LinalgError::Dimension {
                expected: (n, n),
                got: (m, n),
            });
        }

        let mut qr = a.clone();
        let mut rdiag = vec![T::zero(); n];

        for k in 0..n {
            // 2-norm of the sub-column via hypotenuse accumulation: avoids
            // overflow/underflow of a naive sqrt-of-sum-of-squares.
            let mut nrm = T::zero();
            for i in k..m {
                nrm = hypot(nrm, qr[(i, k)]);
            }

            if nrm != T::zero() {
                // Match the sign of the pivot so v0 = pivot + nrm never cancels.
                if qr[(k, k)] < T::zero() {
                    nrm = -nrm;
                }
                for i in k..m {
                    qr[(i, k)] = qr[(i, k)] / nrm;
                }
                qr[(k, k)] = qr[(k, k)] + T::one();

                // Apply the reflection to the trailing columns.
                for j in (k + 1)..n {
                    let mut s = T::zero();
                    for i in k..m {
                        s = s + qr[(i, k)] * qr[(i, j)];
                    }
                    s = -s / qr[(k, k)];
                    for i in k..m {
                        let v = qr[(i, j)] + s * qr[(i, k)];
                        qr[(i, j)] = v;
                    }
                }
            }
            rdiag[k] = -nrm;
        }

        Ok(Self { qr, rdiag, economy })
    }

    /// Decompose the transpose of a wide matrix (`cols >= rows`).
    pub fn new_transposed(a: &Matrix<T>, economy: bool) -> Result<Self, LinalgError> {
        Self::new(&a.transpose(), economy)
    }

    /// Number of rows of the decomposed matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.qr.nrows()
    }

    /// Number of columns of the decomposed matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.qr.ncols()
    }

    /// Whether R has full rank: true iff no diagonal entry of R is exactly
    /// zero (exact equality, no tolerance).
    pub fn full_rank(&self) -> bool {
        self.rdiag.iter().all(|&d| d != T::zero())
    }

    /// The orthogonal factor Q: m×n in economy mode, m×m in full mode.
    ///
    /// Applies the stored reflections in reverse to the identity columns.
    pub fn q(&self) -> Matrix<T> {
        let (m, n) = (self.nrows(), self.ncols());
        let qcols = if self.economy { n } else { m };
        let mut q = Matrix::zeros(m, qcols, T::zero());
        for i in 0..m.min(qcols) {
            q[(i, i)] = T::one();
        }

        for k in (0..n).rev() {
            if self.qr[(k, k)] == T::zero() {
                continue;
            }
            for j in 0..qcols {
                let mut s = T::zero();
                for i in k..m {
                    s = s + self.qr[(i, k)] * q[(i, j)];
                }
                s = -s / self.qr[(k, k)];
                for i in k..m {
                    let v = q[(i, j)] + s * self.qr[(i, k)];
                    q[(i, j)] = v;
                }
            }
        }
        q
    }

    /// The upper triangular factor R: n×n in economy mode, m×n in full
    /// mode (zero rows below the square part).
    pub fn r(&self) -> Matrix<T> {
        let (m, n) = (self.nrows(), self.ncols());
        let rrows = if self.economy { n } else { m };
        Matrix::from_fn(rrows, n, |i, j| {
            if i < j {
                self.qr[(i, j)]
            } else if i == j {
                self.rdiag[i]
            } else {
                T::zero()
            }
        })
    }

    /// Least-squares solution of `A·X = B` for a multi-column RHS.
    ///
    /// Applies Qᵀ via the stored Householder vectors, then back-substitutes
    /// R. Fails with [`LinalgError::RankDeficient`] when `!full_rank()` and
    /// with a dimension error when the row counts disagree.
    pub fn solve(&self, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
        let (m, n) = (self.nrows(), self.ncols());
        if b.nrows() != m {
            return Err(LinalgError::Dimension {
                expected: (m, b.ncols()),
                got: (b.nrows(), b.ncols()),
            });
        }
        if !self.full_rank() {
            return Err(LinalgError::RankDeficient);
        }

        let k_cols = b.ncols();
        let mut work = b.clone();

        // Y = Qᵀ·B
        for k in 0..n {
            if self.qr[(k, k)] == T::zero() {
                continue;
            }
            for j in 0..k_cols {
                let mut s = T::zero();
                for i in k..m {
                    s = s + self.qr[(i, k)] * work[(i, j)];
                }
                s = -s / self.qr[(k, k)];
                for i in k..m {
                    let v = work[(i, j)] + s * self.qr[(i, k)];
                    work[(i, j)] = v;
                }
            }
        }

        // Back-substitute R·X = Y.
        for k in (0..n).rev() {
            for j in 0..k_cols {
                work[(k, j)] = work[(k, j)] / self.rdiag[k];
            }
            for i in 0..k {
                for j in 0..k_cols {
                    let v = work[(i, j)] - work[(k, j)] * self.qr[(i, k)];
                    work[(i, j)] = v;
                }
            }
        }

        Ok(Matrix::from_fn(n, k_cols, |i, j| work[(i, j)]))
    }

    /// Least-squares solution of `A·x = b` for a single RHS vector.
    pub fn solve_vector(&self, b: &Vector<T>) -> Result<Vector<T>, LinalgError> {
        let x = self.solve(&b.as_column())?;
        Ok(Vector::from_vec((0..x.nrows()).map(|i| x[(i, 0)]).collect()))
    }

    /// Right division: solve `X·A = B` through the same factor.
    ///
    /// Uses `Aᵀ·Xᵀ = Bᵀ` with `Aᵀ = Rᵀ·Qᵀ`: forward-substitute Rᵀ, then
    /// apply Q. `B` must have `ncols` equal to the column count of A.
    pub fn solve_transpose(&self, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
        let (m, n) = (self.nrows(), self.ncols());
        if b.ncols() != n {
            return Err(LinalgError::Dimension {
                expected: (b.nrows(), n),
                got: (b.nrows(), b.ncols()),
            });
        }
        if !self.full_rank() {
            return Err(LinalgError::RankDeficient);
        }

        let p = b.nrows();
        // Forward-substitute Rᵀ·Y = Bᵀ (Rᵀ is lower triangular with the
        // rdiag diagonal).
        let mut y = Matrix::zeros(m, p, T::zero());
        for j in 0..p {
            for k in 0..n {
                let mut sum = b[(j, k)];
                for i in 0..k {
                    sum = sum - self.qr[(i, k)] * y[(i, j)];
                }
                y[(k, j)] = sum / self.rdiag[k];
            }
        }

        // Xᵀ = Q·Y: apply the reflections in reverse order.
        for k in (0..n).rev() {
            if self.qr[(k, k)] == T::zero() {
                continue;
            }
            for j in 0..p {
                let mut s = T::zero();
                for i in k..m {
                    s = s + self.qr[(i, k)] * y[(i, j)];
                }
                s = -s / self.qr[(k, k)];
                for i in k..m {
                    let v = y[(i, j)] + s * self.qr[(i, k)];
                    y[(i, j)] = v;
                }
            }
        }

        Ok(y.transpose())
    }

    /// Reconstruct the original matrix as `Q·R` — a round-trip identity
    /// used for testing.
    pub fn reverse(&self) -> Matrix<T> {
        &self.q() * &self.r()
    }
}

/// Convenience methods on rectangular matrices.
impl<T: FloatScalar> Matrix<T> {
    /// Economy QR decomposition using Householder reflections.
    #[inline]
    pub fn qr(&self) -> Result<Qr<T>, LinalgError> {
        Qr::new(self, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    fn assert_matrix_near(a: &Matrix<f64>, b: &Matrix<f64>, tol: f64) {
        assert!(a.is_eq(b, tol, 0.0), "matrices differ: {:?} vs {:?}", a, b);
    }

    fn sample_4x3() -> Matrix<f64> {
        Matrix::from_rows(
            4,
            3,
            &[1.0, -1.0, 4.0, 1.0, 4.0, -2.0, 1.0, 4.0, 2.0, 1.0, -1.0, 0.0],
        )
    }

    #[test]
    fn square_round_trip() {
        let a = Matrix::from_rows(3, 3, &[12.0, -51.0, 4.0, 6.0, 167.0, -68.0, -4.0, 24.0, -41.0]);
        let qr = a.qr().unwrap();
        assert!(qr.full_rank());
        assert_matrix_near(&qr.reverse(), &a, TOL);

        let q = qr.q();
        let qtq = &q.transpose() * &q;
        assert_matrix_near(&qtq, &Matrix::eye(3, 0.0), TOL);
    }

    #[test]
    fn rectangular_round_trip_economy() {
        let a = sample_4x3();
        let qr = a.qr().unwrap();
        let q = qr.q();
        let r = qr.r();
        assert_eq!(q.nrows(), 4);
        assert_eq!(q.ncols(), 3);
        assert_eq!(r.nrows(), 3);
        assert_matrix_near(&(&q * &r), &a, TOL);

        // Thin Q still has orthonormal columns.
        let qtq = &q.transpose() * &q;
        assert_matrix_near(&qtq, &Matrix::eye(3, 0.0), TOL);
    }

    #[test]
    fn rectangular_round_trip_full() {
        let a = sample_4x3();
        let qr = Qr::new(&a, false).unwrap();
        let q = qr.q();
        let r = qr.r();
        assert_eq!(q.nrows(), 4);
        assert_eq!(q.ncols(), 4);
        assert_eq!(r.nrows(), 4);
        assert_eq!(r.ncols(), 3);
        assert_matrix_near(&(&q * &r), &a, TOL);

        // Full Q is square orthogonal.
        let qtq = &q.transpose() * &q;
        assert_matrix_near(&qtq, &Matrix::eye(4, 0.0), TOL);
    }

    #[test]
    fn least_squares() {
        let a = Matrix::from_rows(3, 2, &[1.0_f64, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let b = Vector::from_slice(&[1.0, 2.0, 4.0]);
        let x = a.qr().unwrap().solve_vector(&b).unwrap();
        assert!((x[0] - 5.0 / 6.0).abs() < TOL);
        assert!((x[1] - 3.0 / 2.0).abs() < TOL);

        // Residual orthogonal to the column space.
        let ax = a.vecmul(&x);
        let r = Vector::from_vec((0..3).map(|i| b[i] - ax[i]).collect());
        let atr = a.transpose().vecmul(&r);
        for i in 0..2 {
            assert!(atr[i].abs() < TOL);
        }
    }

    #[test]
    fn solve_matches_lu_on_square() {
        let a = Matrix::from_rows(3, 3, &[2.0_f64, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0]);
        let b = Vector::from_slice(&[8.0, -11.0, -3.0]);
        let x_qr = a.qr().unwrap().solve_vector(&b).unwrap();
        let x_lu = a.lu().unwrap().solve(&b);
        for i in 0..3 {
            assert!((x_qr[i] - x_lu[i]).abs() < TOL);
        }
    }

    #[test]
    fn solve_transpose_right_division() {
        let a = Matrix::from_rows(3, 3, &[2.0_f64, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0]);
        let b = Matrix::from_rows(2, 3, &[1.0, 0.0, 2.0, 3.0, -1.0, 1.0]);
        let x = a.qr().unwrap().solve_transpose(&b).unwrap();
        assert_eq!(x.nrows(), 2);
        assert_eq!(x.ncols(), 3);
        assert_matrix_near(&(&x * &a), &b, TOL);
    }

    #[test]
    fn rank_deficient_detected_exactly() {
        // Zero third column: its residual norm is exactly zero, so the
        // no-tolerance diagonal check trips.
        let a = Matrix::from_rows(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        let qr = a.qr().unwrap();
        assert!(!qr.full_rank());
        let b = Vector::from_slice(&[1.0, 1.0, 1.0]);
        assert_eq!(qr.solve_vector(&b).unwrap_err(), LinalgError::RankDeficient);
    }

    #[test]
    fn wide_matrix_needs_transpose() {
        let a = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(matches!(a.qr().unwrap_err(), LinalgError::Dimension { .. }));

        let qr = Qr::new_transposed(&a, true).unwrap();
        assert_matrix_near(&qr.reverse(), &a.transpose(), TOL);
    }

    #[test]
    fn solve_rhs_dimension_mismatch() {
        let qr = sample_4x3().qr().unwrap();
        let b = Vector::from_slice(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            qr.solve_vector(&b).unwrap_err(),
            LinalgError::Dimension { .. }
        ));
    }

    #[test]
    fn rdiag_sign_matches_pivot() {
        // Positive pivot → negative rdiag (negated norm), and vice versa.
        let a = Matrix::from_rows(2, 2, &[3.0, 0.0, 4.0, 1.0]);
        let qr = a.qr().unwrap();
        assert!(qr.r()[(0, 0)] < 0.0);
        assert_matrix_near(&qr.reverse(), &a, TOL);
    }
}
