use crate::linalg::LinalgError;
use crate::matrix::vector::Vector;
use crate::matrix::Matrix;
use crate::traits::{FloatScalar, MatrixMut, MatrixRef};

/// LU decomposition with partial pivoting, in place.
///
/// On return, `a` contains both L and U packed together:
/// - Upper triangle (including diagonal): U
/// - Lower triangle (excluding diagonal): L (diagonal of L is implicitly 1)
///
/// `perm` is filled with the row permutation indices.
/// Returns `true` if the number of row swaps was even.
pub fn lu_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    perm: &mut [usize],
) -> Result<bool, LinalgError> {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "LU decomposition requires a square matrix");
    assert_eq!(n, perm.len(), "permutation slice length must match matrix size");

    for (i, p) in perm.iter_mut().enumerate() {
        *p = i;
    }

    let mut even = true;

    for col in 0..n {
        // Partial pivoting: find the row with the largest magnitude in this column.
        let mut max_row = col;
        let mut max_val = a.get(col, col).abs();
        for row in (col + 1)..n {
            let val = a.get(row, col).abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < T::epsilon() {
            return Err(LinalgError::Singular);
        }

        if max_row != col {
            perm.swap(col, max_row);
            for j in 0..n {
                let tmp = *a.get(col, j);
                *a.get_mut(col, j) = *a.get(max_row, j);
                *a.get_mut(max_row, j) = tmp;
            }
            even = !even;
        }

        let pivot = *a.get(col, col);
        let inv_pivot = T::one() / pivot;

        for row in (col + 1)..n {
            let factor = *a.get(row, col) * inv_pivot;
            *a.get_mut(row, col) = factor;
            for j in (col + 1)..n {
                let val = *a.get(row, j) - factor * *a.get(col, j);
                *a.get_mut(row, j) = val;
            }
        }
    }

    Ok(even)
}

/// Solve `A·x = b` given the packed LU decomposition and permutation.
pub fn lu_solve<T: FloatScalar>(lu: &impl MatrixRef<T>, perm: &[usize], b: &[T], x: &mut [T]) {
    let n = lu.nrows();

    // Apply the permutation and forward-substitute (solve Ly = Pb).
    for i in 0..n {
        let mut sum = b[perm[i]];
        for j in 0..i {
            sum = sum - *lu.get(i, j) * x[j];
        }
        x[i] = sum;
    }

    // Back substitution (solve Ux = y).
    for i in (0..n).rev() {
        let mut sum = x[i];
        for j in (i + 1)..n {
            sum = sum - *lu.get(i, j) * x[j];
        }
        x[i] = sum / *lu.get(i, i);
    }
}

/// LU decomposition of a square matrix.
///
/// Stores the packed L/U factors and permutation vector. Used as the
/// general (non-symmetric) branch of the determinant dispatch.
///
/// # Example
///
/// ```
/// use dynalg::{Matrix, Vector};
///
/// let a = Matrix::from_rows(2, 2, &[2.0_f64, 1.0, 5.0, 3.0]);
/// let lu = a.lu().unwrap();
///
/// let b = Vector::from_slice(&[4.0, 11.0]);
/// let x = lu.solve(&b);
/// assert!((x[0] - 1.0).abs() < 1e-12);
/// assert!((x[1] - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct Lu<T> {
    lu: Matrix<T>,
    perm: Vec<usize>,
    even: bool,
}

impl<T: FloatScalar> Lu<T> {
    /// Decompose a matrix. Fails with a dimension error for non-square
    /// input and [`LinalgError::Singular`] for a singular one.
    pub fn new(a: &Matrix<T>) -> Result<Self, LinalgError> {
        if !a.is_square() {
            return Err(LinalgError::Dimension {
                expected: (a.nrows(), a.nrows()),
                got: (a.nrows(), a.ncols()),
            });
        }
        let n = a.nrows();
        let mut lu = a.clone();
        let mut perm = vec![0usize; n];
        let even = lu_in_place(&mut lu, &mut perm)?;
        Ok(Self { lu, perm, even })
    }

    /// Solve `A·x = b` for x.
    pub fn solve(&self, b: &Vector<T>) -> Vector<T> {
        let n = self.lu.nrows();
        assert_eq!(b.len(), n, "rhs length mismatch");
        let mut x = vec![T::zero(); n];
        lu_solve(&self.lu, &self.perm, b.as_slice(), &mut x);
        Vector::from_vec(x)
    }

    /// Compute the matrix inverse.
    pub fn inverse(&self) -> Matrix<T> {
        let n = self.lu.nrows();
        let mut inv = Matrix::zeros(n, n, T::zero());
        let mut col_buf = vec![T::zero(); n];
        let mut e = vec![T::zero(); n];

        for col in 0..n {
            if col > 0 {
                e[col - 1] = T::zero();
            }
            e[col] = T::one();
            lu_solve(&self.lu, &self.perm, &e, &mut col_buf);
            for row in 0..n {
                inv[(row, col)] = col_buf[row];
            }
        }
        inv
    }

    /// Compute the determinant.
    pub fn det(&self) -> T {
        let n = self.lu.nrows();
        let mut d = if self.even { T::one() } else { T::zero() - T::one() };
        for i in 0..n {
            d = d * self.lu[(i, i)];
        }
        d
    }

    /// Natural logarithm of `|det(A)|`, summed over the pivots to avoid
    /// overflow for large matrices.
    pub fn log_abs_det(&self) -> T {
        let n = self.lu.nrows();
        let mut sum = T::zero();
        for i in 0..n {
            sum = sum + self.lu[(i, i)].abs().ln();
        }
        sum
    }
}

/// Convenience methods on square matrices.
impl<T: FloatScalar> Matrix<T> {
    /// LU decomposition with partial pivoting.
    #[inline]
    pub fn lu(&self) -> Result<Lu<T>, LinalgError> {
        Lu::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn lu_solve_3x3() {
        let a = Matrix::from_rows(3, 3, &[2.0_f64, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0]);
        let b = Vector::from_slice(&[8.0, -11.0, -3.0]);
        let x = a.lu().unwrap().solve(&b);
        assert!((x[0] - 2.0).abs() < TOL);
        assert!((x[1] - 3.0).abs() < TOL);
        assert!((x[2] - (-1.0)).abs() < TOL);
    }

    #[test]
    fn lu_det() {
        let a = Matrix::from_rows(3, 3, &[6.0_f64, 1.0, 1.0, 4.0, -2.0, 5.0, 2.0, 8.0, 7.0]);
        // det = -306
        assert!((a.lu().unwrap().det() - (-306.0)).abs() < 1e-10);
    }

    #[test]
    fn lu_log_abs_det() {
        let a = Matrix::from_rows(2, 2, &[3.0, 0.0, 0.0, 4.0]);
        let lu = a.lu().unwrap();
        assert!((lu.log_abs_det() - 12.0_f64.ln()).abs() < TOL);
    }

    #[test]
    fn lu_inverse() {
        let a = Matrix::from_rows(2, 2, &[4.0, 7.0, 2.0, 6.0]);
        let inv = a.lu().unwrap().inverse();
        let id = &a * &inv;
        assert!(id.is_eq(&Matrix::eye(2, 0.0), 1e-12, 0.0));
    }

    #[test]
    fn lu_singular() {
        let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert_eq!(a.lu().unwrap_err(), LinalgError::Singular);
    }

    #[test]
    fn lu_non_square() {
        let a = Matrix::zeros(2, 3, 0.0_f64);
        assert!(matches!(a.lu().unwrap_err(), LinalgError::Dimension { .. }));
    }

    #[test]
    fn lu_pivoting_needed() {
        // Zero leading pivot forces a row swap.
        let a = Matrix::from_rows(2, 2, &[0.0_f64, 1.0, 1.0, 0.0]);
        let lu = a.lu().unwrap();
        let b = Vector::from_slice(&[2.0, 3.0]);
        let x = lu.solve(&b);
        assert!((x[0] - 3.0).abs() < TOL);
        assert!((x[1] - 2.0).abs() < TOL);
        assert!((lu.det() - (-1.0)).abs() < TOL);
    }
}
