use crate::linalg::LinalgError;
use crate::matrix::Matrix;
use crate::traits::FloatScalar;

const MAX_SWEEPS: usize = 60;

/// Singular values of a rectangular matrix, sorted descending.
///
/// One-sided Jacobi: orthogonalizes column pairs with plane rotations
/// until every pair is numerically orthogonal; the singular values are the
/// resulting column norms. Values only — no U/V factors — which is all the
/// rank and singularity probes need.
///
/// ```
/// use dynalg::linalg::singular_values;
/// use dynalg::Matrix;
///
/// let a = Matrix::from_rows(2, 2, &[3.0_f64, 0.0, 0.0, 4.0]);
/// let sv = singular_values(&a).unwrap();
/// assert!((sv[0] - 4.0).abs() < 1e-12);
/// assert!((sv[1] - 3.0).abs() < 1e-12);
/// ```
pub fn singular_values<T: FloatScalar>(a: &Matrix<T>) -> Result<Vec<T>, LinalgError> {
    // Work tall: rotate the shorter dimension's columns.
    let mut w = if a.nrows() >= a.ncols() {
        a.clone()
    } else {
        a.transpose()
    };
    let m = w.nrows();
    let n = w.ncols();

    // Columns driven to (near) zero by earlier rotations can never pass a
    // relative orthogonality test against themselves; treat any column whose
    // squared norm has fallen below eps² times the total mass as converged,
    // otherwise rank-deficient inputs rotate forever.
    let mut frob_sq = T::zero();
    for j in 0..n {
        for i in 0..m {
            let x = w[(i, j)];
            frob_sq = frob_sq + x * x;
        }
    }
    let floor = T::epsilon() * T::epsilon() * frob_sq;

    let mut converged = false;
    for _ in 0..MAX_SWEEPS {
        let mut rotated = false;

        for p in 0..n {
            for q in (p + 1)..n {
                let mut alpha = T::zero();
                let mut beta = T::zero();
                let mut gamma = T::zero();
                for i in 0..m {
                    let wp = w[(i, p)];
                    let wq = w[(i, q)];
                    alpha = alpha + wp * wp;
                    beta = beta + wq * wq;
                    gamma = gamma + wp * wq;
                }

                if alpha <= floor
                    || beta <= floor
                    || gamma == T::zero()
                    || gamma.abs() <= T::epsilon() * (alpha * beta).sqrt()
                {
                    continue;
                }

                let two = T::one() + T::one();
                let zeta = (beta - alpha) / (two * gamma);
                let t = zeta.signum() / (zeta.abs() + (T::one() + zeta * zeta).sqrt());
                let c = T::one() / (T::one() + t * t).sqrt();
                let s = c * t;

                for i in 0..m {
                    let wp = w[(i, p)];
                    let wq = w[(i, q)];
                    w[(i, p)] = c * wp - s * wq;
                    w[(i, q)] = s * wp + c * wq;
                }
                rotated = true;
            }
        }

        if !rotated {
            converged = true;
            break;
        }
    }
    if !converged {
        return Err(LinalgError::ConvergenceFailure);
    }

    let mut sv: Vec<T> = (0..n)
        .map(|j| {
            let mut sum = T::zero();
            for i in 0..m {
                let x = w[(i, j)];
                sum = sum + x * x;
            }
            sum.sqrt()
        })
        .collect();
    sv.sort_by(|a, b| b.partial_cmp(a).unwrap_or(core::cmp::Ordering::Equal));
    Ok(sv)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn diagonal_matrix() {
        let a = Matrix::from_rows(3, 3, &[2.0_f64, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 1.0]);
        let sv = singular_values(&a).unwrap();
        assert!((sv[0] - 5.0).abs() < TOL);
        assert!((sv[1] - 2.0).abs() < TOL);
        assert!((sv[2] - 1.0).abs() < TOL);
    }

    #[test]
    fn known_values() {
        // Singular values of [[1,0],[0,1],[1,1]] are sqrt(3) and 1.
        let a = Matrix::from_rows(3, 2, &[1.0_f64, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let sv = singular_values(&a).unwrap();
        assert!((sv[0] - 3.0_f64.sqrt()).abs() < TOL);
        assert!((sv[1] - 1.0).abs() < TOL);
    }

    #[test]
    fn wide_matches_tall() {
        let a = Matrix::from_rows(2, 3, &[1.0_f64, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let sv_wide = singular_values(&a).unwrap();
        let sv_tall = singular_values(&a.transpose()).unwrap();
        for (x, y) in sv_wide.iter().zip(sv_tall.iter()) {
            assert!((x - y).abs() < TOL);
        }
    }

    #[test]
    fn rank_one_matrix() {
        let a = Matrix::from_rows(2, 2, &[1.0_f64, 2.0, 2.0, 4.0]);
        let sv = singular_values(&a).unwrap();
        assert!((sv[0] - 5.0).abs() < TOL);
        assert!(sv[1].abs() < 1e-12);
    }

    #[test]
    fn rank_deficient_square_converges() {
        // Row 2 is twice row 1: rank 2. The collapsed column must not keep
        // the sweep loop alive.
        let a = Matrix::from_rows(
            3,
            3,
            &[1.0_f64, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 1.0, 1.0],
        );
        let sv = singular_values(&a).unwrap();
        assert!(sv[0] > sv[1] && sv[1] > 1e-8);
        assert!(sv[2].abs() < 1e-10);
    }

    #[test]
    fn frobenius_identity() {
        // Σ σ² equals the squared Frobenius norm.
        let a = Matrix::from_rows(3, 3, &[1.0_f64, -2.0, 3.0, 0.5, 4.0, -1.0, 2.0, 2.0, 2.0]);
        let sv = singular_values(&a).unwrap();
        let sum_sq: f64 = sv.iter().map(|s| s * s).sum();
        let frob: f64 = a.as_slice().iter().map(|x| x * x).sum();
        assert!((sum_sq - frob).abs() < 1e-9);
    }
}
