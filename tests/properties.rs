//! Cross-module identities exercised through the public API.

use dynalg::integrate::{MonteCarlo, Range};
use dynalg::linalg::Half;
use dynalg::metrics::{jaccard_distance, jaccard_similarity, Minkowski};
use dynalg::optim::{BoundedBfgs, OptimStatus};
use dynalg::{Cholesky, LinalgError, Matrix, Qr};

const TOL: f64 = 1e-9;

fn assert_matrix_near(a: &Matrix<f64>, b: &Matrix<f64>, tol: f64, msg: &str) {
    assert!(a.is_eq(b, tol, tol), "{}: {:?} vs {:?}", msg, a, b);
}

// ── Decomposition round-trips ────────────────────────────────────────

fn spd_matrix() -> Matrix<f64> {
    Matrix::from_rows(
        3,
        3,
        &[4.0, 2.0, 0.6, 2.0, 5.0, 1.2, 0.6, 1.2, 3.0],
    )
}

#[test]
fn cholesky_reverse_round_trip() {
    let a = spd_matrix();
    let chol = Cholesky::new(&a, Half::Lower).unwrap();
    assert_matrix_near(&chol.reverse().unwrap(), &a, TOL, "L·Lᵗ");
}

#[test]
fn robust_cholesky_reverse_round_trip() {
    let a = spd_matrix();
    let chol = Cholesky::robust(&a, Half::Lower).unwrap();
    assert_matrix_near(&chol.reverse().unwrap(), &a, TOL, "L·D·Lᵗ");
}

#[test]
fn qr_reverse_round_trip() {
    let a = Matrix::from_rows(4, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0, 2.0, -1.0, 0.5]);
    let qr = Qr::new(&a, true).unwrap();
    assert_matrix_near(&qr.reverse(), &a, TOL, "Q·R");
}

#[test]
fn qr_orthogonal_factor() {
    let a = Matrix::from_rows(4, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0, 2.0, -1.0, 0.5]);
    let q = Qr::new(&a, true).unwrap().q();
    let qtq = &q.transpose() * &q;
    assert_matrix_near(&qtq, &Matrix::eye(3, 0.0), TOL, "QᵗQ");
}

#[test]
fn cholesky_inverse_consistency() {
    // Solving against the inverse must give the identity.
    let a = spd_matrix();
    let chol = Cholesky::new(&a, Half::Lower).unwrap();
    let inv = chol.inverse().unwrap();
    let solved = chol.solve(&Matrix::eye(3, 0.0)).unwrap();
    assert_matrix_near(&solved, &inv, TOL, "solve(I) vs inverse");
    assert_matrix_near(&(&a * &inv), &Matrix::eye(3, 0.0), TOL, "A·A⁻¹");
}

#[test]
fn cholesky_requires_square() {
    let a = Matrix::zeros(2, 3, 0.0_f64);
    assert!(matches!(
        Cholesky::new(&a, Half::Lower),
        Err(LinalgError::Dimension { .. })
    ));
}

// ── Metric identities ────────────────────────────────────────────────

#[test]
fn minkowski_special_orders() {
    let x = [0.5_f64, -1.0, 2.0, 0.0];
    let y = [1.5, 1.0, -2.0, 3.0];

    let euclidean: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt();
    let manhattan: f64 = x.iter().zip(y.iter()).map(|(a, b)| (a - b).abs()).sum();

    assert!((Minkowski::new(2.0).unwrap().distance(&x, &y) - euclidean).abs() < TOL);
    assert!((Minkowski::new(1.0).unwrap().distance(&x, &y) - manhattan).abs() < TOL);
}

#[test]
fn jaccard_complement_identity() {
    let x = [1.0, 0.0, 2.0, 0.0, 5.0];
    let y = [0.0, 3.0, 2.0, 0.0, 1.0];
    let total = jaccard_distance(&x, &y) + jaccard_similarity(&x, &y);
    assert!((total - 1.0).abs() < TOL);
}

// ── Optimizer end-to-end ─────────────────────────────────────────────

#[test]
fn gaussian_wells_minimum() {
    let mut opt = BoundedBfgs::new(2).unwrap();
    opt.set_start(&[3.0, -1.0]).unwrap();
    let converged = opt
        .minimize(
            |x| -(-(x[0] - 1.0).powi(2)).exp() - (-(x[1] - 2.0).powi(2) / 2.0).exp(),
            |x| {
                let e0 = (-(x[0] - 1.0).powi(2)).exp();
                let e1 = (-(x[1] - 2.0).powi(2) / 2.0).exp();
                vec![2.0 * (x[0] - 1.0) * e0, (x[1] - 2.0) * e1]
            },
        )
        .unwrap();
    assert!(converged);
    assert!(matches!(
        opt.status(),
        OptimStatus::FunctionConvergence | OptimStatus::GradientConvergence
    ));
    assert!((opt.solution()[0] - 1.0).abs() < 1e-3);
    assert!((opt.solution()[1] - 2.0).abs() < 1e-3);
    assert!((opt.value() + 2.0).abs() < 1e-6);
}

#[test]
fn optimizer_configuration_fails_fast() {
    let mut opt = BoundedBfgs::new(2).unwrap();
    assert!(opt.set_corrections(0).is_err());
    assert!(opt.set_function_tolerance(-1e-6).is_err());
}

// ── Monte Carlo ──────────────────────────────────────────────────────

#[test]
fn unit_circle_area() {
    let mut mc = MonteCarlo::new(2, |x| {
        if x[0] * x[0] + x[1] * x[1] <= 1.0 {
            1.0
        } else {
            0.0
        }
    })
    .unwrap();
    mc.set_range(&[Range::new(-1.0, 1.0), Range::new(-1.0, 1.0)])
        .unwrap();
    mc.set_seed(2024).set_iterations(100_000);
    mc.compute();
    assert!((mc.area() - core::f64::consts::PI).abs() < 0.05);
    // The reported error bound should cover the actual deviation here.
    assert!(mc.error() > 0.0 && mc.error() < 0.02);
}
