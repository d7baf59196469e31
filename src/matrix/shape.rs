use crate::linalg::LinalgError;
use crate::traits::{FloatScalar, Scalar};

use super::Matrix;

/// Describes how a matrix's populated region should be interpreted.
///
/// Not stored per-matrix — passed per call to the triangular conversion
/// routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixType {
    /// Both halves populated and equal.
    Symmetric,
    /// Only the lower triangle (and diagonal) is authoritative.
    LowerTriangular,
    /// Only the upper triangle (and diagonal) is authoritative.
    UpperTriangular,
    /// Only the diagonal is populated.
    Diagonal,
    /// General rectangular matrix.
    Rectangular,
    /// General square matrix.
    Square,
}

// ── Transpose ───────────────────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Allocating transpose.
    ///
    /// ```
    /// use dynalg::Matrix;
    /// let m = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    /// let t = m.transpose();
    /// assert_eq!(t.nrows(), 3);
    /// assert_eq!(t[(2, 1)], 6.0);
    /// ```
    pub fn transpose(&self) -> Matrix<T> {
        Matrix::from_fn(self.ncols, self.nrows, |i, j| self[(j, i)])
    }

    /// In-place transpose. Only defined for square matrices; fails with a
    /// dimension error otherwise.
    ///
    /// ```
    /// use dynalg::Matrix;
    /// let mut m = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    /// m.transpose_in_place().unwrap();
    /// assert_eq!(m[(0, 1)], 3.0);
    ///
    /// let mut rect = Matrix::zeros(2, 3, 0.0_f64);
    /// assert!(rect.transpose_in_place().is_err());
    /// ```
    pub fn transpose_in_place(&mut self) -> Result<(), LinalgError> {
        if !self.is_square() {
            return Err(LinalgError::Dimension {
                expected: (self.nrows, self.nrows),
                got: (self.nrows, self.ncols),
            });
        }
        let n = self.nrows;
        for i in 0..n {
            for j in (i + 1)..n {
                self.data.swap(j * n + i, i * n + j);
            }
        }
        Ok(())
    }
}

// ── Triangular extraction / conversion ──────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Copy of the lower triangle with the upper region zeroed.
    ///
    /// `include_diagonal` toggles whether the diagonal is kept.
    ///
    /// ```
    /// use dynalg::Matrix;
    /// let m = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    /// let l = m.lower_triangle(true);
    /// assert_eq!(l[(0, 1)], 0.0);
    /// assert_eq!(l[(1, 0)], 3.0);
    /// assert_eq!(l[(1, 1)], 4.0);
    /// ```
    pub fn lower_triangle(&self, include_diagonal: bool) -> Matrix<T> {
        Matrix::from_fn(self.nrows, self.ncols, |i, j| {
            if i > j || (i == j && include_diagonal) {
                self[(i, j)]
            } else {
                T::zero()
            }
        })
    }

    /// Copy of the upper triangle with the lower region zeroed.
    pub fn upper_triangle(&self, include_diagonal: bool) -> Matrix<T> {
        Matrix::from_fn(self.nrows, self.ncols, |i, j| {
            if i < j || (i == j && include_diagonal) {
                self[(i, j)]
            } else {
                T::zero()
            }
        })
    }

    /// Convert a matrix whose populated region is described by `from` into
    /// lower-triangular form.
    ///
    /// An upper-triangular source is transposed; a lower-triangular or
    /// diagonal source is copied; anything else has its upper region
    /// zeroed.
    pub fn to_lower_triangular(&self, from: MatrixType) -> Matrix<T> {
        match from {
            MatrixType::LowerTriangular | MatrixType::Diagonal => self.clone(),
            MatrixType::UpperTriangular => self.transpose(),
            MatrixType::Symmetric | MatrixType::Square | MatrixType::Rectangular => {
                self.lower_triangle(true)
            }
        }
    }

    /// Convert a matrix whose populated region is described by `from` into
    /// upper-triangular form.
    pub fn to_upper_triangular(&self, from: MatrixType) -> Matrix<T> {
        match from {
            MatrixType::UpperTriangular | MatrixType::Diagonal => self.clone(),
            MatrixType::LowerTriangular => self.transpose(),
            MatrixType::Symmetric | MatrixType::Square | MatrixType::Rectangular => {
                self.upper_triangle(true)
            }
        }
    }
}

// ── Trace / diagonal ────────────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Sum of the diagonal elements.
    ///
    /// ```
    /// use dynalg::Matrix;
    /// let m = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    /// assert_eq!(m.trace(), 5.0);
    /// ```
    pub fn trace(&self) -> T {
        let mut sum = T::zero();
        for i in 0..self.nrows.min(self.ncols) {
            sum = sum + self[(i, i)];
        }
        sum
    }

    /// Copy of the diagonal.
    pub fn diagonal(&self) -> Vec<T> {
        (0..self.nrows.min(self.ncols)).map(|i| self[(i, i)]).collect()
    }
}

// ── Reshape / flatten ───────────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Reinterpret the elements (row-major reading order) with new
    /// dimensions. Fails with a dimension error if the element count
    /// changes.
    ///
    /// ```
    /// use dynalg::Matrix;
    /// let m = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    /// let r = m.reshape(3, 2).unwrap();
    /// assert_eq!(r[(0, 1)], 2.0);
    /// assert_eq!(r[(2, 0)], 5.0);
    /// ```
    pub fn reshape(&self, nrows: usize, ncols: usize) -> Result<Matrix<T>, LinalgError> {
        if nrows * ncols != self.nrows * self.ncols {
            return Err(LinalgError::Dimension {
                expected: (self.nrows, self.ncols),
                got: (nrows, ncols),
            });
        }
        Ok(Matrix::from_rows(nrows, ncols, &self.flatten()))
    }

    /// Elements in row-major reading order.
    pub fn flatten(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.nrows * self.ncols);
        for i in 0..self.nrows {
            for j in 0..self.ncols {
                out.push(self[(i, j)]);
            }
        }
        out
    }
}

// ── Tolerance equality ──────────────────────────────────────────────

impl<T: FloatScalar> Matrix<T> {
    /// Element-wise equality with absolute and relative tolerance.
    ///
    /// With both tolerances zero this is exact equality. Otherwise each
    /// pair passes when `|a - b| <= max(atol, rtol * max(|a|, |b|))`.
    /// Matrices of different shape are never equal.
    ///
    /// ```
    /// use dynalg::Matrix;
    /// let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    /// let b = Matrix::from_rows(2, 2, &[1.0 + 1e-12, 2.0, 3.0, 4.0]);
    /// assert!(!a.is_eq(&b, 0.0, 0.0));
    /// assert!(a.is_eq(&b, 1e-10, 0.0));
    /// assert!(a.is_eq(&b, 0.0, 1e-10));
    /// ```
    pub fn is_eq(&self, other: &Matrix<T>, atol: T, rtol: T) -> bool {
        if self.nrows != other.nrows || self.ncols != other.ncols {
            return false;
        }
        if atol == T::zero() && rtol == T::zero() {
            return self.data == other.data;
        }
        self.data.iter().zip(other.data.iter()).all(|(&a, &b)| {
            let threshold = atol.max(rtol * a.abs().max(b.abs()));
            (a - b).abs() <= threshold
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_rectangular() {
        let m = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let t = m.transpose();
        assert_eq!(t.nrows(), 3);
        assert_eq!(t.ncols(), 2);
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(t[(j, i)], m[(i, j)]);
            }
        }
    }

    #[test]
    fn transpose_in_place_square() {
        let mut m = Matrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        m.transpose_in_place().unwrap();
        assert_eq!(m[(0, 1)], 4.0);
        assert_eq!(m[(2, 0)], 3.0);
    }

    #[test]
    fn transpose_in_place_rectangular_fails() {
        let mut m = Matrix::zeros(2, 3, 0.0_f64);
        assert!(matches!(
            m.transpose_in_place().unwrap_err(),
            LinalgError::Dimension { .. }
        ));
    }

    #[test]
    fn triangles() {
        let m = Matrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let l = m.lower_triangle(true);
        assert_eq!(l[(0, 1)], 0.0);
        assert_eq!(l[(1, 1)], 5.0);
        assert_eq!(l[(2, 0)], 7.0);

        let l_no_diag = m.lower_triangle(false);
        assert_eq!(l_no_diag[(1, 1)], 0.0);
        assert_eq!(l_no_diag[(2, 1)], 8.0);

        let u = m.upper_triangle(true);
        assert_eq!(u[(1, 0)], 0.0);
        assert_eq!(u[(0, 2)], 3.0);
    }

    #[test]
    fn triangular_conversion() {
        let u = Matrix::from_rows(2, 2, &[1.0, 2.0, 0.0, 3.0]);
        // Upper-triangular source transposed into lower form
        let l = u.to_lower_triangular(MatrixType::UpperTriangular);
        assert_eq!(l[(1, 0)], 2.0);
        assert_eq!(l[(0, 1)], 0.0);

        // Symmetric source keeps the lower half
        let s = Matrix::from_rows(2, 2, &[1.0, 2.0, 2.0, 3.0]);
        let ls = s.to_lower_triangular(MatrixType::Symmetric);
        assert_eq!(ls[(0, 1)], 0.0);
        assert_eq!(ls[(1, 0)], 2.0);

        // Round trip: lower → upper → lower
        let back = l
            .to_upper_triangular(MatrixType::LowerTriangular)
            .to_lower_triangular(MatrixType::UpperTriangular);
        assert_eq!(back, l);
    }

    #[test]
    fn trace_and_diagonal() {
        let m = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.trace(), 6.0);
        assert_eq!(m.diagonal(), vec![1.0, 5.0]);
    }

    #[test]
    fn reshape_preserves_row_order() {
        let m = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let r = m.reshape(3, 2).unwrap();
        assert_eq!(r.flatten(), m.flatten());
        assert!(matches!(
            m.reshape(4, 2).unwrap_err(),
            LinalgError::Dimension { .. }
        ));
    }

    #[test]
    fn is_eq_exact_when_tolerances_zero() {
        let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = a.clone();
        assert!(a.is_eq(&b, 0.0, 0.0));
        let mut c = a.clone();
        c[(0, 0)] += 1e-15;
        assert!(!a.is_eq(&c, 0.0, 0.0));
    }

    #[test]
    fn is_eq_shape_mismatch() {
        let a = Matrix::zeros(2, 2, 0.0_f64);
        let b = Matrix::zeros(2, 3, 0.0_f64);
        assert!(!a.is_eq(&b, 1.0, 1.0));
    }

    #[test]
    fn is_eq_relative() {
        let a = Matrix::from_rows(1, 2, &[1000.0, 1.0]);
        let b = Matrix::from_rows(1, 2, &[1000.5, 1.0]);
        assert!(a.is_eq(&b, 0.0, 1e-3));
        assert!(!a.is_eq(&b, 0.0, 1e-6));
    }
}
