use rayon::prelude::*;

use crate::linalg::{back_substitute_lt, forward_substitute, LinalgError};
use crate::matrix::vector::Vector;
use crate::matrix::Matrix;
use crate::traits::FloatScalar;

/// Selects which triangular half of a symmetric input is authoritative.
///
/// The other half is never read, so callers may leave it unpopulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    /// Read `a[i][j]` for `i >= j`.
    Lower,
    /// Read `a[j][i]` for `i >= j`.
    Upper,
}

#[inline]
fn source<T: FloatScalar>(a: &Matrix<T>, half: Half, i: usize, j: usize) -> T {
    // Caller guarantees i >= j.
    match half {
        Half::Lower => a[(i, j)],
        Half::Upper => a[(j, i)],
    }
}

/// Relative pivot tolerance for the positive-definiteness test.
///
/// A pivot is accepted when `s > 1e-14 * |a[j][j]|`, tolerating the
/// floating round-off a strict `s > 0` would reject.
fn pivot_tolerance<T: FloatScalar>() -> T {
    T::from(1e-14).unwrap()
}

/// Standard Cholesky decomposition in place: `A = L·Lᵀ`.
///
/// Reads the half of `a` selected by `half` and writes L into the lower
/// triangle (including diagonal). The complementary region is left
/// unchanged.
///
/// Returns whether the matrix was positive definite. The sweep always
/// completes: a non-PD pivot stores `sqrt(max(s, 0))` and clears the flag,
/// so callers can still inspect the partial factor while the solve surface
/// refuses to use it.
pub fn cholesky_in_place<T: FloatScalar>(a: &mut Matrix<T>, half: Half) -> bool {
    let n = a.nrows();
    let tol = pivot_tolerance::<T>();
    let mut positive_definite = true;

    for j in 0..n {
        let mut s = source(a, half, j, j);
        for k in 0..j {
            let ljk = a[(j, k)];
            s = s - ljk * ljk;
        }

        positive_definite = positive_definite && s > tol * source(a, half, j, j).abs();

        let ljj = s.max(T::zero()).sqrt();
        a[(j, j)] = ljj;

        for i in (j + 1)..n {
            let mut v = source(a, half, i, j);
            for k in 0..j {
                v = v - a[(i, k)] * a[(j, k)];
            }
            a[(i, j)] = if ljj > T::zero() { v / ljj } else { T::zero() };
        }
    }

    positive_definite
}

/// Robust square-root-free decomposition in place: `A = L·D·Lᵀ`.
///
/// L is unit lower triangular (ones stored on the diagonal), D lands in
/// `d`. Returns `false` if an exactly-zero pivot was hit, in which case the
/// partial factor is unusable.
///
/// The per-column inner loop is independent across rows: each row value
/// depends only on already-final columns, so the rows fan out across the
/// rayon pool and join before the next column.
pub fn ldlt_in_place<T: FloatScalar + Send + Sync>(
    a: &mut Matrix<T>,
    half: Half,
    d: &mut [T],
) -> bool {
    let n = a.nrows();
    assert_eq!(d.len(), n, "diagonal slice length must match matrix size");

    for j in 0..n {
        let mut dj = source(a, half, j, j);
        for k in 0..j {
            let ljk = a[(j, k)];
            dj = dj - ljk * ljk * d[k];
        }
        d[j] = dj;

        if dj == T::zero() {
            return false;
        }

        a[(j, j)] = T::one();

        let col: Vec<T> = {
            let a_ref: &Matrix<T> = a;
            let d_ref: &[T] = d;
            ((j + 1)..n)
                .into_par_iter()
                .map(|i| {
                    let mut v = source(a_ref, half, i, j);
                    for k in 0..j {
                        v = v - a_ref[(i, k)] * a_ref[(j, k)] * d_ref[k];
                    }
                    v / dj
                })
                .collect()
        };
        for (offset, v) in col.into_iter().enumerate() {
            a[(j + 1 + offset, j)] = v;
        }
    }

    true
}

/// Invert a lower-triangular factor in place, column by column.
///
/// Processing columns left to right and rows top to bottom only ever reads
/// entries that are still original, so the factor storage is reused.
fn invert_lower_in_place<T: FloatScalar>(l: &mut Matrix<T>) {
    let n = l.nrows();
    for j in 0..n {
        let sjj = T::one() / l[(j, j)];
        l[(j, j)] = sjj;
        for i in (j + 1)..n {
            let mut sum = T::zero();
            for k in j..i {
                sum = sum + l[(i, k)] * l[(k, j)];
            }
            l[(i, j)] = -sum / l[(i, i)];
        }
    }
}

/// Cholesky decomposition of a symmetric positive-definite (or, robustly,
/// any symmetric) matrix.
///
/// The standard form factors `A = L·Lᵀ`; the robust form factors
/// `A = L·D·Lᵀ` without square roots, tolerating indefinite input as long
/// as no pivot is exactly zero.
///
/// # Example
///
/// ```
/// use dynalg::{Matrix, Vector};
///
/// let a = Matrix::from_rows(2, 2, &[4.0_f64, 2.0, 2.0, 3.0]);
/// let chol = a.cholesky().unwrap();
///
/// let b = Vector::from_slice(&[8.0, 7.0]);
/// let x = chol.solve_vector(&b).unwrap();
/// let det = chol.determinant().unwrap();
/// assert!((det - 8.0).abs() < 1e-12);
/// assert!((x[0] - 1.25).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct Cholesky<T> {
    /// Factor storage. Lower triangle (including diagonal) holds L; for the
    /// robust form the diagonal is unit and D lives in `d`.
    l: Matrix<T>,
    /// Diagonal of D (robust form only; empty for the standard form).
    d: Vec<T>,
    robust: bool,
    positive_definite: bool,
    undefined: bool,
}

// Send + Sync is only needed by the robust constructors (rayon fan-out);
// the standard form and the whole accessor surface stay on FloatScalar.
impl<T: FloatScalar + Send + Sync> Cholesky<T> {
    /// Robust square-root-free LDLᵀ decomposition.
    ///
    /// An exactly-zero pivot marks the decomposition undefined; every
    /// factor-dependent accessor then fails with [`LinalgError::Undefined`].
    pub fn robust(a: &Matrix<T>, half: Half) -> Result<Self, LinalgError> {
        Self::robust_in_place(a.clone(), half)
    }

    /// Robust decomposition reusing the input's storage.
    pub fn robust_in_place(mut a: Matrix<T>, half: Half) -> Result<Self, LinalgError> {
        check_square(&a)?;
        let n = a.nrows();
        let mut d = vec![T::zero(); n];
        let defined = ldlt_in_place(&mut a, half, &mut d);
        let positive_definite = defined && d.iter().all(|&x| x > T::zero());
        Ok(Self {
            l: a,
            d,
            robust: true,
            positive_definite,
            undefined: !defined,
        })
    }
}

impl<T: FloatScalar> Cholesky<T> {
    /// Standard decomposition of a symmetric matrix, reading the `half`
    /// triangle. Copies the input; see [`Cholesky::new_in_place`] to reuse
    /// its storage.
    ///
    /// Fails with a dimension error for non-square input. Non-positive-
    /// definite input is accepted here; the PD-only operations fail later
    /// with [`LinalgError::NotPositiveDefinite`].
    pub fn new(a: &Matrix<T>, half: Half) -> Result<Self, LinalgError> {
        Self::new_in_place(a.clone(), half)
    }

    /// Standard decomposition reusing the input's storage for the factor.
    pub fn new_in_place(mut a: Matrix<T>, half: Half) -> Result<Self, LinalgError> {
        check_square(&a)?;
        let positive_definite = cholesky_in_place(&mut a, half);
        Ok(Self {
            l: a,
            d: Vec::new(),
            robust: false,
            positive_definite,
            undefined: false,
        })
    }

    /// Build a decomposition directly from a known lower-triangular factor,
    /// bypassing the decomposition sweep.
    ///
    /// Sets the positive-definite flag unconditionally — it is the caller's
    /// responsibility that `l` really is a Cholesky factor.
    pub fn from_left_triangular(l: Matrix<T>) -> Result<Self, LinalgError> {
        check_square(&l)?;
        Ok(Self {
            l,
            d: Vec::new(),
            robust: false,
            positive_definite: true,
            undefined: false,
        })
    }

    /// Order of the decomposed matrix.
    #[inline]
    pub fn n(&self) -> usize {
        self.l.nrows()
    }

    /// Whether the input passed the tolerance-based positive-definiteness
    /// test during the sweep.
    #[inline]
    pub fn positive_definite(&self) -> bool {
        self.positive_definite
    }

    /// Whether the robust sweep hit an exactly-zero pivot.
    #[inline]
    pub fn undefined(&self) -> bool {
        self.undefined
    }

    fn check_defined(&self) -> Result<(), LinalgError> {
        if self.undefined {
            Err(LinalgError::Undefined)
        } else {
            Ok(())
        }
    }

    /// Factor-dependent operations on the standard form additionally
    /// require positive definiteness; the robust form does not.
    fn check_usable(&self) -> Result<(), LinalgError> {
        self.check_defined()?;
        if !self.robust && !self.positive_definite {
            return Err(LinalgError::NotPositiveDefinite);
        }
        Ok(())
    }

    /// The left (lower) triangular factor L, with the region above the
    /// diagonal zeroed.
    pub fn left_triangular_factor(&self) -> Result<Matrix<T>, LinalgError> {
        self.check_defined()?;
        Ok(self.l.lower_triangle(true))
    }

    /// Diagonal of D: the pivots of the robust form, or ones for the
    /// standard form (where `A = L·Lᵀ` has no separate D).
    pub fn diagonal(&self) -> Result<Vec<T>, LinalgError> {
        self.check_defined()?;
        if self.robust {
            Ok(self.d.clone())
        } else {
            Ok(vec![T::one(); self.n()])
        }
    }

    /// Determinant: `Π L[j][j]²` (standard) or `Π D[j]` (robust).
    pub fn determinant(&self) -> Result<T, LinalgError> {
        self.check_usable()?;
        let n = self.n();
        if self.robust {
            let mut prod = T::one();
            for &dj in &self.d {
                prod = prod * dj;
            }
            Ok(prod)
        } else {
            let mut prod = T::one();
            for i in 0..n {
                prod = prod * self.l[(i, i)];
            }
            Ok(prod * prod)
        }
    }

    /// Log-determinant: `2·Σ ln L[j][j]` (standard) or `Σ ln D[j]` (robust).
    ///
    /// More numerically stable than `determinant()` for large matrices.
    /// The robust form additionally requires all pivots positive.
    pub fn log_determinant(&self) -> Result<T, LinalgError> {
        self.check_usable()?;
        if self.robust {
            if !self.positive_definite {
                return Err(LinalgError::NotPositiveDefinite);
            }
            let mut sum = T::zero();
            for &dj in &self.d {
                sum = sum + dj.ln();
            }
            Ok(sum)
        } else {
            let two = T::one() + T::one();
            let mut sum = T::zero();
            for i in 0..self.n() {
                sum = sum + self.l[(i, i)].ln();
            }
            Ok(sum * two)
        }
    }

    /// Whether the decomposed matrix is nonsingular.
    pub fn nonsingular(&self) -> Result<bool, LinalgError> {
        self.check_defined()?;
        if self.robust {
            Ok(self.d.iter().all(|&x| x != T::zero()))
        } else {
            Ok(self.positive_definite)
        }
    }

    /// Solve `A·X = B` for a multi-column right-hand side.
    ///
    /// Fails with a dimension error when `B` has the wrong row count, with
    /// [`LinalgError::NotPositiveDefinite`] for the standard factor of a
    /// non-PD matrix, and with [`LinalgError::Undefined`] when undefined.
    pub fn solve(&self, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
        self.check_usable()?;
        let n = self.n();
        if b.nrows() != n {
            return Err(LinalgError::Dimension {
                expected: (n, b.ncols()),
                got: (b.nrows(), b.ncols()),
            });
        }

        let mut x = Matrix::zeros(n, b.ncols(), T::zero());
        let mut rhs = vec![T::zero(); n];
        let mut y = vec![T::zero(); n];
        let mut col = vec![T::zero(); n];

        for j in 0..b.ncols() {
            for i in 0..n {
                rhs[i] = b[(i, j)];
            }
            self.substitute(&rhs, &mut y, &mut col);
            for i in 0..n {
                x[(i, j)] = col[i];
            }
        }
        Ok(x)
    }

    /// Solve `A·x = b` for a single right-hand side vector.
    pub fn solve_vector(&self, b: &Vector<T>) -> Result<Vector<T>, LinalgError> {
        self.check_usable()?;
        let n = self.n();
        if b.len() != n {
            return Err(LinalgError::Dimension {
                expected: (n, 1),
                got: (b.len(), 1),
            });
        }
        let mut y = vec![T::zero(); n];
        let mut x = vec![T::zero(); n];
        self.substitute(b.as_slice(), &mut y, &mut x);
        Ok(Vector::from_vec(x))
    }

    /// Forward/back substitution through L (and D when robust).
    fn substitute(&self, b: &[T], y: &mut [T], x: &mut [T]) {
        forward_substitute(&self.l, b, y);
        if self.robust {
            for (yi, &di) in y.iter_mut().zip(self.d.iter()) {
                *yi = *yi / di;
            }
        }
        back_substitute_lt(&self.l, y, x);
    }

    /// Full matrix inverse, by substituting the identity column by column.
    pub fn inverse(&self) -> Result<Matrix<T>, LinalgError> {
        self.check_usable()?;
        let n = self.n();
        let mut inv = Matrix::zeros(n, n, T::zero());
        let mut e = vec![T::zero(); n];
        let mut y = vec![T::zero(); n];
        let mut x = vec![T::zero(); n];

        for col in 0..n {
            if col > 0 {
                e[col - 1] = T::zero();
            }
            e[col] = T::one();
            self.substitute(&e, &mut y, &mut x);
            for row in 0..n {
                inv[(row, col)] = x[row];
            }
        }
        Ok(inv)
    }

    /// Diagonal of `A⁻¹` without materializing the full inverse.
    ///
    /// Back-substitutes the identity implicitly: column `i` of `L⁻¹` is
    /// obtained by one truncated forward substitution, and
    /// `(A⁻¹)[i][i] = Σ_k (L⁻¹)[k][i]² (/ D[k] when robust)`.
    pub fn inverse_diagonal(&self) -> Result<Vec<T>, LinalgError> {
        self.check_usable()?;
        let n = self.n();
        let mut diag = vec![T::zero(); n];
        let mut y = vec![T::zero(); n];

        for i in 0..n {
            // Forward-substitute e_i; entries before i stay zero.
            for k in i..n {
                let mut sum = if k == i { T::one() } else { T::zero() };
                for j in i..k {
                    sum = sum - self.l[(k, j)] * y[j];
                }
                y[k] = sum / self.l[(k, k)];
            }
            let mut acc = T::zero();
            for k in i..n {
                let contrib = y[k] * y[k];
                acc = acc + if self.robust { contrib / self.d[k] } else { contrib };
            }
            diag[i] = acc;
        }
        Ok(diag)
    }

    /// Sum of the diagonal of `A⁻¹` (trace of the inverse) without
    /// materializing it.
    pub fn inverse_trace(&self) -> Result<T, LinalgError> {
        let diag = self.inverse_diagonal()?;
        let mut sum = T::zero();
        for v in diag {
            sum = sum + v;
        }
        Ok(sum)
    }

    /// Storage-reusing variant of [`Cholesky::inverse_diagonal`].
    ///
    /// Consumes the decomposition: the factor storage is overwritten with
    /// `L⁻¹` and cannot be queried afterwards — the ownership transfer is
    /// the type-state replacement for a runtime "destroyed" flag.
    pub fn into_inverse_diagonal(mut self) -> Result<Vec<T>, LinalgError> {
        self.check_usable()?;
        let n = self.n();
        invert_lower_in_place(&mut self.l);
        let mut diag = vec![T::zero(); n];
        for i in 0..n {
            let mut acc = T::zero();
            for k in i..n {
                let s = self.l[(k, i)];
                let contrib = s * s;
                acc = acc + if self.robust { contrib / self.d[k] } else { contrib };
            }
            diag[i] = acc;
        }
        Ok(diag)
    }

    /// Storage-reusing variant of [`Cholesky::inverse_trace`]; consumes the
    /// decomposition.
    pub fn into_inverse_trace(self) -> Result<T, LinalgError> {
        let diag = self.into_inverse_diagonal()?;
        let mut sum = T::zero();
        for v in diag {
            sum = sum + v;
        }
        Ok(sum)
    }

    /// Reconstruct the original matrix: `L·Lᵀ` (standard) or `L·D·Lᵀ`
    /// (robust). Round-trip identity used for testing.
    pub fn reverse(&self) -> Result<Matrix<T>, LinalgError> {
        self.check_defined()?;
        let l = self.l.lower_triangle(true);
        if self.robust {
            let n = self.n();
            // L·D with D diagonal: scale column k of L by d[k].
            let mut ld = l.clone();
            for k in 0..n {
                for i in 0..n {
                    ld[(i, k)] = ld[(i, k)] * self.d[k];
                }
            }
            Ok(&ld * &l.transpose())
        } else {
            Ok(&l * &l.transpose())
        }
    }
}

fn check_square<T>(a: &Matrix<T>) -> Result<(), LinalgError> {
    if !a.is_square() {
        return Err(LinalgError::Dimension {
            expected: (a.nrows(), a.nrows()),
            got: (a.nrows(), a.ncols()),
        });
    }
    Ok(())
}

/// Convenience methods on square matrices.
impl<T: FloatScalar> Matrix<T> {
    /// Standard Cholesky decomposition reading the lower triangle.
    #[inline]
    pub fn cholesky(&self) -> Result<Cholesky<T>, LinalgError> {
        Cholesky::new(self, Half::Lower)
    }
}

impl<T: FloatScalar + Send + Sync> Matrix<T> {
    /// Robust LDLᵀ decomposition reading the lower triangle.
    #[inline]
    pub fn cholesky_robust(&self) -> Result<Cholesky<T>, LinalgError> {
        Cholesky::robust(self, Half::Lower)
    }
}
