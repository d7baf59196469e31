use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::step::{BoundedStep, Convergence, Task};
use super::{OptimError, OptimStatus};

/// Snapshot passed to the progress callback after every evaluation and at
/// exit. Observation only; it cannot alter the optimization.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// Completed outer iterations.
    pub iterations: usize,
    /// Objective/gradient evaluations so far.
    pub evaluations: usize,
    /// Objective value at the most recent evaluation.
    pub value: f64,
    /// Gradient at the most recent evaluation.
    pub gradient: &'a [f64],
    /// True only for the final notification.
    pub finished: bool,
}

/// Limited-memory BFGS minimizer with per-variable box bounds.
///
/// Construct with the variable count, configure bounds and tolerances
/// through the fallible setters, then call [`minimize`](Self::minimize).
/// Afterwards [`solution`](Self::solution), [`value`](Self::value), and
/// [`status`](Self::status) describe the outcome. Configuration errors
/// fail at the setter, never at minimize time.
///
/// ```
/// use dynalg::optim::BoundedBfgs;
///
/// let mut opt = BoundedBfgs::new(2).unwrap();
/// opt.set_start(&[0.0, 0.0]).unwrap();
/// let converged = opt
///     .minimize(
///         |x| (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2),
///         |x| vec![2.0 * (x[0] - 1.0), 2.0 * (x[1] - 2.0)],
///     )
///     .unwrap();
/// assert!(converged);
/// assert!((opt.solution()[0] - 1.0).abs() < 1e-5);
/// assert!((opt.solution()[1] - 2.0).abs() < 1e-5);
/// ```
pub struct BoundedBfgs {
    n: usize,
    corrections: usize,
    lower: Vec<f64>,
    upper: Vec<f64>,
    f_tol: f64,
    g_tol: f64,
    max_iterations: usize,
    x: Vec<f64>,
    value: f64,
    iterations: usize,
    evaluations: usize,
    status: OptimStatus,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<Box<dyn FnMut(&Progress<'_>)>>,
}

impl BoundedBfgs {
    /// Default correction history depth.
    pub const DEFAULT_CORRECTIONS: usize = 5;

    /// Create a minimizer over `n` variables, unbounded in every
    /// direction, starting at the origin.
    pub fn new(n: usize) -> Result<Self, OptimError> {
        if n == 0 {
            return Err(OptimError::Dimension { expected: 1, got: 0 });
        }
        Ok(Self {
            n,
            corrections: Self::DEFAULT_CORRECTIONS,
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
            f_tol: 1e7 * f64::EPSILON,
            g_tol: 1e-5,
            max_iterations: 0,
            x: vec![0.0; n],
            value: 0.0,
            iterations: 0,
            evaluations: 0,
            status: OptimStatus::InProgress,
            cancel: None,
            progress: None,
        })
    }

    /// History depth `m`; must be strictly positive.
    pub fn set_corrections(&mut self, m: usize) -> Result<&mut Self, OptimError> {
        if m == 0 {
            return Err(OptimError::InvalidCorrections);
        }
        self.corrections = m;
        Ok(self)
    }

    /// Tolerance on the relative function decrease between accepted steps.
    pub fn set_function_tolerance(&mut self, tol: f64) -> Result<&mut Self, OptimError> {
        if !tol.is_finite() || tol < 0.0 {
            return Err(OptimError::InvalidTolerance);
        }
        self.f_tol = tol;
        Ok(self)
    }

    /// Tolerance on the projected gradient infinity-norm.
    pub fn set_gradient_tolerance(&mut self, tol: f64) -> Result<&mut Self, OptimError> {
        if !tol.is_finite() || tol < 0.0 {
            return Err(OptimError::InvalidTolerance);
        }
        self.g_tol = tol;
        Ok(self)
    }

    /// Iteration cap; `0` means unlimited.
    pub fn set_max_iterations(&mut self, max: usize) -> &mut Self {
        self.max_iterations = max;
        self
    }

    /// Per-variable lower bounds; use `f64::NEG_INFINITY` for unbounded
    /// variables.
    pub fn set_lower_bounds(&mut self, lower: &[f64]) -> Result<&mut Self, OptimError> {
        self.check_len(lower.len())?;
        if lower.iter().zip(self.upper.iter()).any(|(l, u)| l > u) {
            return Err(OptimError::InvalidBounds);
        }
        self.lower.copy_from_slice(lower);
        Ok(self)
    }

    /// Per-variable upper bounds; use `f64::INFINITY` for unbounded
    /// variables.
    pub fn set_upper_bounds(&mut self, upper: &[f64]) -> Result<&mut Self, OptimError> {
        self.check_len(upper.len())?;
        if self.lower.iter().zip(upper.iter()).any(|(l, u)| l > u) {
            return Err(OptimError::InvalidBounds);
        }
        self.upper.copy_from_slice(upper);
        Ok(self)
    }

    /// Starting point; projected into the box when minimize runs.
    pub fn set_start(&mut self, x0: &[f64]) -> Result<&mut Self, OptimError> {
        self.check_len(x0.len())?;
        self.x.copy_from_slice(x0);
        Ok(self)
    }

    /// Cooperative cancellation flag, checked at the top of every
    /// iteration. Setting it mid-evaluation takes effect at the next
    /// iteration boundary.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) -> &mut Self {
        self.cancel = Some(flag);
        self
    }

    /// Progress callback, fired after every evaluation and once at exit.
    pub fn on_progress(&mut self, callback: impl FnMut(&Progress<'_>) + 'static) -> &mut Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Current solution vector (the best point seen once minimize has run).
    pub fn solution(&self) -> &[f64] {
        &self.x
    }

    /// Objective value at [`solution`](Self::solution).
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Completed outer iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Objective/gradient evaluations. An iteration may need several
    /// (line-search trials) or none.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Termination status of the last minimize call.
    pub fn status(&self) -> OptimStatus {
        self.status
    }

    /// Run the minimization. `f` and `grad` are evaluated exactly once per
    /// `Fg` request, together.
    ///
    /// Returns `Ok(true)` on convergence and `Ok(false)` when the run ended
    /// without it (cancellation, iteration cap, or line-search failure —
    /// inspect [`status`](Self::status) to tell them apart). A NaN or
    /// infinite objective/gradient value is a hard error.
    pub fn minimize(
        &mut self,
        mut f: impl FnMut(&[f64]) -> f64,
        mut grad: impl FnMut(&[f64]) -> Vec<f64>,
    ) -> Result<bool, OptimError> {
        self.iterations = 0;
        self.evaluations = 0;
        self.status = OptimStatus::InProgress;

        let mut stepper = BoundedStep::new(
            &self.x,
            &self.lower,
            &self.upper,
            self.corrections,
            self.f_tol,
            self.g_tol,
        );

        let mut task = stepper.start();
        let converged = loop {
            match task {
                Task::Fg => {
                    let fx = f(stepper.point());
                    let gx = grad(stepper.point());
                    if gx.len() != self.n {
                        return Err(OptimError::Dimension {
                            expected: self.n,
                            got: gx.len(),
                        });
                    }
                    self.evaluations += 1;
                    // The per-evaluation notification (and a final one) must
                    // still reach the callback when the evaluation itself is
                    // rejected as non-finite.
                    let next = stepper.evaluated(fx, &gx);
                    self.notify(&stepper, false);
                    match next {
                        Ok(t) => task = t,
                        Err(err) => {
                            self.x.copy_from_slice(stepper.point());
                            self.value = stepper.value();
                            self.notify(&stepper, true);
                            return Err(err);
                        }
                    }
                }
                Task::NewX => {
                    self.iterations += 1;
                    if self.cancelled() {
                        break false;
                    }
                    if self.max_iterations > 0 && self.iterations >= self.max_iterations {
                        self.status = OptimStatus::MaximumIterations;
                        break false;
                    }
                    task = stepper.proceed();
                }
                Task::Convergence(kind) => {
                    self.status = match kind {
                        Convergence::Function => OptimStatus::FunctionConvergence,
                        Convergence::Gradient => OptimStatus::GradientConvergence,
                    };
                    break true;
                }
                Task::Abnormal => {
                    self.status = OptimStatus::LineSearchFailed;
                    break false;
                }
            }
        };

        self.x.copy_from_slice(stepper.point());
        self.value = stepper.value();
        self.notify(&stepper, true);
        Ok(converged)
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn notify(&mut self, stepper: &BoundedStep, finished: bool) {
        if let Some(callback) = self.progress.as_mut() {
            callback(&Progress {
                iterations: self.iterations,
                evaluations: self.evaluations,
                value: stepper.value(),
                gradient: stepper.gradient(),
                finished,
            });
        }
    }

    fn check_len(&self, got: usize) -> Result<(), OptimError> {
        if got != self.n {
            return Err(OptimError::Dimension {
                expected: self.n,
                got,
            });
        }
        Ok(())
    }
}

impl core::fmt::Debug for BoundedBfgs {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoundedBfgs")
            .field("n", &self.n)
            .field("corrections", &self.corrections)
            .field("iterations", &self.iterations)
            .field("evaluations", &self.evaluations)
            .field("status", &self.status)
            .finish()
    }
}
