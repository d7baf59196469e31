//! # dynalg
//!
//! Dense numerical linear algebra and optimization for runtime-sized
//! matrices: Cholesky and QR decompositions, bounded L-BFGS minimization,
//! distance metrics, and Monte Carlo integration.
//!
//! ## Quick start
//!
//! ```
//! use dynalg::{Matrix, Vector};
//!
//! // Solve a symmetric positive-definite system Ax = b via Cholesky
//! let a = Matrix::from_rows(2, 2, &[4.0_f64, 2.0, 2.0, 3.0]);
//! let chol = a.cholesky().unwrap();
//! let b = Vector::from_slice(&[8.0, 7.0]);
//! let x = chol.solve_vector(&b).unwrap();
//! assert!((x[0] - 1.25).abs() < 1e-12);
//! assert!((x[1] - 1.5).abs() < 1e-12);
//! ```
//!
//! ## Modules
//!
//! - [`matrix`] — Heap-allocated `Matrix<T>` with runtime dimensions
//!   (`Vec<T>` column-major storage) and the [`Vector<T>`] newtype.
//!   Includes arithmetic, indexing, triangular extraction/conversion,
//!   transpose, tolerance equality, reshape, and jagged conversion.
//!
//! - [`linalg`] — Cholesky (standard `A = L·Lᵀ` and square-root-free
//!   `A = L·D·Lᵀ`), QR (Householder, economy or full), and LU (partial
//!   pivoting) decompositions; singular-value rank probes. Free functions
//!   operate on `&mut impl MatrixMut<T>` for in-place use; wrapper structs
//!   offer a higher-level API with `solve()`, `inverse()`, and `det()`.
//!
//! - [`optim`] — Bounded limited-memory quasi-Newton minimization
//!   ([`optim::BoundedBfgs`]) with box constraints, cooperative
//!   cancellation, progress reporting, and typed termination status;
//!   the [`optim::NonlinearConstraint`] builder.
//!
//! - [`metrics`] — Pairwise distance/similarity functions: Jaccard,
//!   Kulczynski, Minkowski, Sokal-Michener, weighted Euclidean.
//!
//! - [`integrate`] — Stochastic multidimensional integration
//!   ([`integrate::MonteCarlo`]) with running mean/variance error estimate.
//!
//! - [`traits`] — Element trait hierarchy ([`Scalar`], [`FloatScalar`])
//!   and the [`MatrixRef`] / [`MatrixMut`] access traits used by the
//!   in-place decomposition kernels.

pub mod integrate;
pub mod linalg;
pub mod matrix;
pub mod metrics;
pub mod optim;
pub mod traits;

pub use linalg::{Cholesky, Half, LinalgError, Lu, Qr};
pub use matrix::vector::Vector;
pub use matrix::{Matrix, MatrixType};
pub use optim::{BoundedBfgs, OptimError, OptimStatus};
pub use traits::{FloatScalar, MatrixMut, MatrixRef, Scalar};
