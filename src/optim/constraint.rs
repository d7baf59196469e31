/// How a constraint function compares against its target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintRelation {
    /// `c(x) ≤ target`
    LessOrEqual,
    /// `c(x) ≥ target`
    GreaterOrEqual,
    /// `c(x) = target` (within the violation tolerance)
    Equal,
}

/// A nonlinear constraint `c(x) <relation> target` with an explicit
/// function closure and an optional gradient closure.
///
/// Immutable after construction; not itself iterative. Callers layering a
/// constrained problem on top of [`super::BoundedBfgs`] query
/// [`violation`](Self::violation) to build penalty terms and
/// [`is_satisfied`](Self::is_satisfied) to check feasibility.
pub struct NonlinearConstraint {
    relation: ConstraintRelation,
    target: f64,
    tolerance: f64,
    function: Box<dyn Fn(&[f64]) -> f64>,
    gradient: Option<Box<dyn Fn(&[f64]) -> Vec<f64>>>,
}

impl NonlinearConstraint {
    /// Default violation tolerance.
    pub const DEFAULT_TOLERANCE: f64 = 1e-8;

    pub fn new(
        relation: ConstraintRelation,
        target: f64,
        function: impl Fn(&[f64]) -> f64 + 'static,
    ) -> Self {
        Self {
            relation,
            target,
            tolerance: Self::DEFAULT_TOLERANCE,
            function: Box::new(function),
            gradient: None,
        }
    }

    /// Attach an analytic gradient of the constraint function.
    pub fn with_gradient(mut self, gradient: impl Fn(&[f64]) -> Vec<f64> + 'static) -> Self {
        self.gradient = Some(Box::new(gradient));
        self
    }

    /// Override the violation tolerance used by
    /// [`is_satisfied`](Self::is_satisfied).
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn relation(&self) -> ConstraintRelation {
        self.relation
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Constraint function value at `x`.
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        (self.function)(x)
    }

    /// Gradient of the constraint function at `x`, when one was supplied.
    pub fn gradient(&self, x: &[f64]) -> Option<Vec<f64>> {
        self.gradient.as_ref().map(|g| g(x))
    }

    /// How far `c(x)` is on the infeasible side of the target; zero when
    /// the constraint holds.
    pub fn violation(&self, x: &[f64]) -> f64 {
        let c = self.evaluate(x);
        match self.relation {
            ConstraintRelation::LessOrEqual => (c - self.target).max(0.0),
            ConstraintRelation::GreaterOrEqual => (self.target - c).max(0.0),
            ConstraintRelation::Equal => (c - self.target).abs(),
        }
    }

    pub fn is_satisfied(&self, x: &[f64]) -> bool {
        self.violation(x) <= self.tolerance
    }
}

impl core::fmt::Debug for NonlinearConstraint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NonlinearConstraint")
            .field("relation", &self.relation)
            .field("target", &self.target)
            .field("tolerance", &self.tolerance)
            .field("has_gradient", &self.gradient.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn less_or_equal_violation() {
        let c = NonlinearConstraint::new(ConstraintRelation::LessOrEqual, 1.0, |x| {
            x[0] * x[0] + x[1] * x[1]
        });
        assert_eq!(c.violation(&[0.5, 0.5]), 0.0);
        assert!(c.is_satisfied(&[0.5, 0.5]));
        assert!((c.violation(&[1.0, 1.0]) - 1.0).abs() < 1e-15);
        assert!(!c.is_satisfied(&[1.0, 1.0]));
    }

    #[test]
    fn greater_or_equal_violation() {
        let c = NonlinearConstraint::new(ConstraintRelation::GreaterOrEqual, 2.0, |x| x[0]);
        assert_eq!(c.violation(&[3.0]), 0.0);
        assert_eq!(c.violation(&[1.5]), 0.5);
    }

    #[test]
    fn equality_uses_tolerance() {
        let c = NonlinearConstraint::new(ConstraintRelation::Equal, 1.0, |x| x[0])
            .with_tolerance(1e-3);
        assert!(c.is_satisfied(&[1.0005]));
        assert!(!c.is_satisfied(&[1.01]));
    }

    #[test]
    fn gradient_passthrough() {
        let c = NonlinearConstraint::new(ConstraintRelation::Equal, 0.0, |x| x[0] * x[1])
            .with_gradient(|x| vec![x[1], x[0]]);
        let g = c.gradient(&[2.0, 3.0]).unwrap();
        assert_eq!(g, vec![3.0, 2.0]);

        let no_grad = NonlinearConstraint::new(ConstraintRelation::Equal, 0.0, |x| x[0]);
        assert!(no_grad.gradient(&[1.0]).is_none());
    }
}
