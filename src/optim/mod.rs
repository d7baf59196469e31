//! Bounded quasi-Newton minimization.
//!
//! - [`BoundedBfgs`] — limited-memory BFGS with per-variable box bounds
//!   (L-BFGS-B), driven by a resumable internal step state machine
//! - [`NonlinearConstraint`] — a comparison-against-target constraint with
//!   explicit function/gradient closures, for callers layering constrained
//!   problems on top of the bounded minimizer
//!
//! The driver owns the solution vector, bounds, counters, and termination
//! status; callers construct it once per problem, configure tolerances and
//! bounds through fallible setters, then call [`BoundedBfgs::minimize`].

mod bounded_bfgs;
mod constraint;
pub(crate) mod step;


pub use bounded_bfgs::{BoundedBfgs, Progress};
pub use constraint::{ConstraintRelation, NonlinearConstraint};

/// Errors from optimizer configuration and evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimError {
    /// Correction history depth must be strictly positive.
    InvalidCorrections,
    /// A tolerance was negative or not finite.
    InvalidTolerance,
    /// A bounds or starting-point vector does not match the variable count.
    Dimension { expected: usize, got: usize },
    /// A lower bound exceeds the matching upper bound.
    InvalidBounds,
    /// The objective or gradient produced NaN or infinity.
    NotFinite,
}

impl core::fmt::Display for OptimError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OptimError::InvalidCorrections => {
                write!(f, "correction count must be greater than zero")
            }
            OptimError::InvalidTolerance => {
                write!(f, "tolerances must be finite and non-negative")
            }
            OptimError::Dimension { expected, got } => {
                write!(f, "expected {} variables, got {}", expected, got)
            }
            OptimError::InvalidBounds => {
                write!(f, "lower bound exceeds upper bound")
            }
            OptimError::NotFinite => {
                write!(f, "objective or gradient is NaN or infinity")
            }
        }
    }
}

impl std::error::Error for OptimError {}

/// Termination status of a bounded minimization.
///
/// Line-search failure is an expected outcome of nonconvex or
/// ill-conditioned problems (often a sign of an inconsistent gradient), so
/// it is reported here rather than as an [`OptimError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimStatus {
    /// Optimization has not yet reached a terminal state.
    InProgress,
    /// Relative function decrease fell below the function tolerance.
    FunctionConvergence,
    /// Projected gradient infinity-norm fell below the gradient tolerance.
    GradientConvergence,
    /// Iteration cap reached before convergence.
    MaximumIterations,
    /// The line search could not find a sufficient decrease.
    LineSearchFailed,
}

impl core::fmt::Display for OptimStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OptimStatus::InProgress => write!(f, "in progress"),
            OptimStatus::FunctionConvergence => write!(f, "function convergence"),
            OptimStatus::GradientConvergence => write!(f, "gradient convergence"),
            OptimStatus::MaximumIterations => write!(f, "maximum iterations reached"),
            OptimStatus::LineSearchFailed => write!(f, "line search failed"),
        }
    }
}
