use std::ops::{Add, Mul, Neg, Sub};

use crate::traits::Scalar;

use super::vector::Vector;
use super::Matrix;

fn assert_same_shape<T>(a: &Matrix<T>, b: &Matrix<T>) {
    assert_eq!(
        (a.nrows, a.ncols),
        (b.nrows, b.ncols),
        "dimension mismatch: {}x{} vs {}x{}",
        a.nrows,
        a.ncols,
        b.nrows,
        b.ncols,
    );
}

// ── Element-wise arithmetic ─────────────────────────────────────────

impl<T: Scalar> Add for &Matrix<T> {
    type Output = Matrix<T>;

    fn add(self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_same_shape(self, rhs);
        Matrix {
            data: self
                .data
                .iter()
                .zip(rhs.data.iter())
                .map(|(&a, &b)| a + b)
                .collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<T: Scalar> Sub for &Matrix<T> {
    type Output = Matrix<T>;

    fn sub(self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_same_shape(self, rhs);
        Matrix {
            data: self
                .data
                .iter()
                .zip(rhs.data.iter())
                .map(|(&a, &b)| a - b)
                .collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<T: Scalar + Neg<Output = T>> Neg for &Matrix<T> {
    type Output = Matrix<T>;

    fn neg(self) -> Matrix<T> {
        self.map(|x| -x)
    }
}

/// Scalar multiplication: `&m * s`.
impl<T: Scalar> Mul<T> for &Matrix<T> {
    type Output = Matrix<T>;

    fn mul(self, rhs: T) -> Matrix<T> {
        self.map(|x| x * rhs)
    }
}

// ── Matrix multiplication ───────────────────────────────────────────

impl<T: Scalar> Mul for &Matrix<T> {
    type Output = Matrix<T>;

    /// Matrix product. Panics if inner dimensions disagree.
    ///
    /// ```
    /// use dynalg::Matrix;
    /// let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    /// let b = Matrix::from_rows(2, 2, &[5.0, 6.0, 7.0, 8.0]);
    /// let c = &a * &b;
    /// assert_eq!(c[(0, 0)], 19.0);
    /// assert_eq!(c[(1, 1)], 50.0);
    /// ```
    fn mul(self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_eq!(
            self.ncols, rhs.nrows,
            "dimension mismatch: {}x{} * {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        let mut out = Matrix::zeros(self.nrows, rhs.ncols, T::zero());
        for j in 0..rhs.ncols {
            for k in 0..self.ncols {
                let b_kj = rhs[(k, j)];
                for i in 0..self.nrows {
                    out[(i, j)] = out[(i, j)] + self[(i, k)] * b_kj;
                }
            }
        }
        out
    }
}

impl<T: Scalar> Matrix<T> {
    /// Matrix-vector product `A·v`.
    ///
    /// ```
    /// use dynalg::{Matrix, Vector};
    /// let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    /// let v = Vector::from_slice(&[1.0, 1.0]);
    /// let r = a.vecmul(&v);
    /// assert_eq!(r[0], 3.0);
    /// assert_eq!(r[1], 7.0);
    /// ```
    pub fn vecmul(&self, v: &Vector<T>) -> Vector<T> {
        assert_eq!(
            self.ncols,
            v.len(),
            "dimension mismatch: {}x{} * {}",
            self.nrows,
            self.ncols,
            v.len(),
        );
        let mut out = vec![T::zero(); self.nrows];
        for j in 0..self.ncols {
            let vj = v[j];
            for i in 0..self.nrows {
                out[i] = out[i] + self[(i, j)] * vj;
            }
        }
        Vector::from_vec(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub() {
        let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = Matrix::from_rows(2, 2, &[4.0, 3.0, 2.0, 1.0]);
        let s = &a + &b;
        assert_eq!(s[(0, 0)], 5.0);
        assert_eq!(s[(1, 1)], 5.0);
        let d = &a - &b;
        assert_eq!(d[(0, 0)], -3.0);
        assert_eq!(d[(1, 1)], 3.0);
    }

    #[test]
    fn neg_and_scale() {
        let a = Matrix::from_rows(2, 2, &[1.0, -2.0, 3.0, -4.0]);
        let n = -&a;
        assert_eq!(n[(0, 1)], 2.0);
        let s = &a * 2.0;
        assert_eq!(s[(1, 0)], 6.0);
    }

    #[test]
    fn matmul_rectangular() {
        // (2x3) * (3x2) = (2x2)
        let a = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = Matrix::from_rows(3, 2, &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let c = &a * &b;
        assert_eq!(c.nrows(), 2);
        assert_eq!(c.ncols(), 2);
        assert_eq!(c[(0, 0)], 58.0);
        assert_eq!(c[(0, 1)], 64.0);
        assert_eq!(c[(1, 0)], 139.0);
        assert_eq!(c[(1, 1)], 154.0);
    }

    #[test]
    #[should_panic(expected = "dimension mismatch")]
    fn matmul_bad_dims() {
        let a = Matrix::zeros(2, 3, 0.0_f64);
        let b = Matrix::zeros(2, 2, 0.0_f64);
        let _ = &a * &b;
    }

    #[test]
    fn identity_product() {
        let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let id = Matrix::eye(2, 0.0_f64);
        assert_eq!(&a * &id, a);
        assert_eq!(&id * &a, a);
    }
}
