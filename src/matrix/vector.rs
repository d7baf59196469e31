use std::ops::{Index, IndexMut};

use crate::traits::{FloatScalar, Scalar};

use super::Matrix;

/// Dynamically-sized vector (wraps a 1×N [`Matrix`]).
///
/// Enforces the single-row constraint and provides single-index access
/// `v[i]`.
///
/// # Examples
///
/// ```
/// use dynalg::Vector;
///
/// let v = Vector::from_slice(&[1.0_f64, 2.0, 3.0]);
/// assert_eq!(v[0], 1.0);
/// assert_eq!(v.len(), 3);
/// assert!((v.dot(&v) - 14.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<T> {
    pub(crate) inner: Matrix<T>,
}

impl<T: Scalar> Vector<T> {
    /// Create a vector from a flat slice.
    pub fn from_slice(data: &[T]) -> Self {
        Self {
            inner: Matrix::from_vec(1, data.len(), data.to_vec()),
        }
    }

    /// Create a vector from an owned `Vec`.
    pub fn from_vec(data: Vec<T>) -> Self {
        let n = data.len();
        Self {
            inner: Matrix::from_vec(1, n, data),
        }
    }

    /// Create a zero vector of length `n`.
    ///
    /// The `_zero` parameter is only used for type inference.
    pub fn zeros(n: usize, _zero: T) -> Self {
        Self {
            inner: Matrix::zeros(1, n, T::zero()),
        }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.ncols()
    }

    /// Whether the vector is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dot product.
    ///
    /// ```
    /// use dynalg::Vector;
    /// let a = Vector::from_slice(&[1.0, 2.0, 3.0]);
    /// let b = Vector::from_slice(&[4.0, 5.0, 6.0]);
    /// assert_eq!(a.dot(&b), 32.0);
    /// ```
    pub fn dot(&self, rhs: &Self) -> T {
        assert_eq!(self.len(), rhs.len(), "vector length mismatch");
        let mut sum = T::zero();
        for i in 0..self.len() {
            sum = sum + self[i] * rhs[i];
        }
        sum
    }

    /// View the vector data as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }

    /// View the vector data as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.inner.as_mut_slice()
    }

    /// Reinterpret as an N×1 column matrix.
    pub fn as_column(&self) -> Matrix<T> {
        Matrix::from_vec(self.len(), 1, self.as_slice().to_vec())
    }
}

impl<T: FloatScalar> Vector<T> {
    /// Euclidean (2-) norm.
    ///
    /// ```
    /// use dynalg::Vector;
    /// let v = Vector::from_slice(&[3.0_f64, 4.0]);
    /// assert!((v.norm() - 5.0).abs() < 1e-12);
    /// ```
    pub fn norm(&self) -> T {
        self.dot(self).sqrt()
    }

    /// Infinity (max-absolute) norm.
    pub fn norm_inf(&self) -> T {
        let mut max = T::zero();
        for &x in self.as_slice() {
            if x.abs() > max {
                max = x.abs();
            }
        }
        max
    }
}

// ── Index ───────────────────────────────────────────────────────────

impl<T> Index<usize> for Vector<T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.inner.data[i]
    }
}

impl<T> IndexMut<usize> for Vector<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.inner.data[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_and_index() {
        let v = Vector::from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(v.len(), 3);
        assert_eq!(v[1], 2.0);
    }

    #[test]
    fn dot() {
        let a = Vector::from_slice(&[1.0, 2.0, 3.0]);
        let b = Vector::from_slice(&[4.0, 5.0, 6.0]);
        assert_eq!(a.dot(&b), 32.0);
    }

    #[test]
    fn norms() {
        let v = Vector::from_slice(&[3.0_f64, -4.0]);
        assert!((v.norm() - 5.0).abs() < 1e-12);
        assert_eq!(v.norm_inf(), 4.0);
    }

    #[test]
    fn zeros() {
        let v = Vector::zeros(4, 0.0_f64);
        assert_eq!(v.len(), 4);
        assert_eq!(v[3], 0.0);
    }

    #[test]
    fn as_column() {
        let v = Vector::from_slice(&[1.0, 2.0]);
        let c = v.as_column();
        assert_eq!(c.nrows(), 2);
        assert_eq!(c.ncols(), 1);
        assert_eq!(c[(1, 0)], 2.0);
    }
}
