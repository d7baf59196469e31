//! Monte Carlo estimation of definite integrals over a box.
//!
//! [`MonteCarlo`] draws uniform samples inside per-dimension [`Range`]s,
//! accumulates the integrand's running sum and sum of squares, and reports
//! the volume-scaled mean as the integral estimate with a standard-error
//! bound. Accumulation is incremental: repeated [`compute`](MonteCarlo::compute)
//! calls refine the same estimate, and [`reset`](MonteCarlo::reset) clears
//! the accumulators without forgetting the configuration.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Errors from integrator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationError {
    /// The integrand must have at least one parameter.
    NoParameters,
    /// A range vector does not match the parameter count.
    Dimension { expected: usize, got: usize },
    /// A sampling interval is inverted or non-finite.
    InvalidRange { index: usize },
}

impl core::fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IntegrationError::NoParameters => {
                write!(f, "parameter count must be greater than zero")
            }
            IntegrationError::Dimension { expected, got } => {
                write!(f, "expected {} ranges, got {}", expected, got)
            }
            IntegrationError::InvalidRange { index } => {
                write!(f, "range {} must be finite with min <= max", index)
            }
        }
    }
}

impl std::error::Error for IntegrationError {}

/// Inclusive sampling interval for one integration variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn length(&self) -> f64 {
        self.max - self.min
    }
}

/// Monte Carlo integrator over an axis-aligned box.
///
/// ```
/// use dynalg::integrate::{MonteCarlo, Range};
///
/// // ∫₀¹ x² dx = 1/3
/// let mut mc = MonteCarlo::new(1, |x| x[0] * x[0]).unwrap();
/// mc.set_range(&[Range::new(0.0, 1.0)]).unwrap();
/// mc.set_seed(7);
/// mc.compute();
/// assert!((mc.area() - 1.0 / 3.0).abs() < 0.01);
/// ```
pub struct MonteCarlo {
    parameters: usize,
    function: Box<dyn Fn(&[f64]) -> f64>,
    ranges: Vec<Range>,
    iterations: usize,
    rng: StdRng,

    count: usize,
    sum: f64,
    sum2: f64,
}

impl MonteCarlo {
    /// Samples drawn per [`compute`](Self::compute) call unless overridden.
    pub const DEFAULT_ITERATIONS: usize = 100_000;

    /// Create an integrator for a function of `parameters` variables,
    /// sampling the unit box until ranges are configured.
    pub fn new(
        parameters: usize,
        function: impl Fn(&[f64]) -> f64 + 'static,
    ) -> Result<Self, IntegrationError> {
        if parameters == 0 {
            return Err(IntegrationError::NoParameters);
        }
        Ok(Self {
            parameters,
            function: Box::new(function),
            ranges: vec![Range::new(0.0, 1.0); parameters],
            iterations: Self::DEFAULT_ITERATIONS,
            rng: StdRng::from_entropy(),
            count: 0,
            sum: 0.0,
            sum2: 0.0,
        })
    }

    /// Per-dimension sampling intervals; must supply one per parameter.
    /// Intervals are validated here so a bad configuration cannot reach the
    /// sampling loop.
    pub fn set_range(&mut self, ranges: &[Range]) -> Result<&mut Self, IntegrationError> {
        if ranges.len() != self.parameters {
            return Err(IntegrationError::Dimension {
                expected: self.parameters,
                got: ranges.len(),
            });
        }
        for (index, r) in ranges.iter().enumerate() {
            if !r.min.is_finite() || !r.max.is_finite() || r.min > r.max {
                return Err(IntegrationError::InvalidRange { index });
            }
        }
        self.ranges.copy_from_slice(ranges);
        Ok(self)
    }

    /// Samples per compute call.
    pub fn set_iterations(&mut self, iterations: usize) -> &mut Self {
        self.iterations = iterations;
        self
    }

    /// Reseed the sampler for reproducible runs.
    pub fn set_seed(&mut self, seed: u64) -> &mut Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn parameters(&self) -> usize {
        self.parameters
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Total samples accumulated so far.
    pub fn samples(&self) -> usize {
        self.count
    }

    /// Draw another batch of samples and fold them into the running
    /// estimate. Returns the updated integral estimate.
    pub fn compute(&mut self) -> f64 {
        let mut point = vec![0.0; self.parameters];
        for _ in 0..self.iterations {
            for (p, range) in point.iter_mut().zip(self.ranges.iter()) {
                *p = self.rng.gen_range(range.min..=range.max);
            }
            let value = (self.function)(&point);
            self.count += 1;
            self.sum += value;
            self.sum2 += value * value;
        }
        self.area()
    }

    /// Volume-scaled sample mean: the integral estimate.
    pub fn area(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.volume() * self.sum / self.count as f64
    }

    /// Standard error of [`area`](Self::area):
    /// `volume × sqrt((E[f²] − E[f]²) / count)`.
    pub fn error(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        let mean2 = self.sum2 / n;
        self.volume() * ((mean2 - mean * mean).max(0.0) / n).sqrt()
    }

    /// Clear the accumulators, keeping ranges, iteration count, function,
    /// and sampler state.
    pub fn reset(&mut self) -> &mut Self {
        self.count = 0;
        self.sum = 0.0;
        self.sum2 = 0.0;
        self
    }

    fn volume(&self) -> f64 {
        self.ranges.iter().map(Range::length).product()
    }
}

impl core::fmt::Debug for MonteCarlo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MonteCarlo")
            .field("parameters", &self.parameters)
            .field("iterations", &self.iterations)
            .field("samples", &self.count)
            .field("area", &self.area())
            .field("error", &self.error())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_parameters_rejected() {
        assert_eq!(
            MonteCarlo::new(0, |_| 0.0).unwrap_err(),
            IntegrationError::NoParameters
        );
    }

    #[test]
    fn range_length_checked() {
        let mut mc = MonteCarlo::new(2, |x| x[0] + x[1]).unwrap();
        assert_eq!(
            mc.set_range(&[Range::new(0.0, 1.0)]).unwrap_err(),
            IntegrationError::Dimension {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn inverted_or_non_finite_range_rejected() {
        let mut mc = MonteCarlo::new(2, |x| x[0] + x[1]).unwrap();
        assert_eq!(
            mc.set_range(&[Range::new(0.0, 1.0), Range::new(1.0, 0.0)])
                .unwrap_err(),
            IntegrationError::InvalidRange { index: 1 }
        );
        assert_eq!(
            mc.set_range(&[Range::new(f64::NEG_INFINITY, 0.0), Range::new(0.0, 1.0)])
                .unwrap_err(),
            IntegrationError::InvalidRange { index: 0 }
        );
        // A rejected call leaves the previous (valid) configuration intact.
        assert_eq!(mc.ranges(), &[Range::new(0.0, 1.0); 2]);
    }

    #[test]
    fn constant_integrand_is_exact() {
        let mut mc = MonteCarlo::new(1, |_| 3.0).unwrap();
        mc.set_range(&[Range::new(0.0, 2.0)]).unwrap();
        mc.set_seed(1).set_iterations(1000);
        mc.compute();
        assert!((mc.area() - 6.0).abs() < 1e-12);
        assert!(mc.error() < 1e-12);
    }

    #[test]
    fn quarter_circle_estimates_pi() {
        // 4 × area of the unit quarter circle.
        let mut mc = MonteCarlo::new(2, |x| {
            if x[0] * x[0] + x[1] * x[1] <= 1.0 {
                4.0
            } else {
                0.0
            }
        })
        .unwrap();
        mc.set_range(&[Range::new(0.0, 1.0), Range::new(0.0, 1.0)])
            .unwrap();
        mc.set_seed(42);
        mc.compute();
        assert!((mc.area() - core::f64::consts::PI).abs() < 0.05);
        assert!(mc.error() > 0.0);
    }

    #[test]
    fn incremental_runs_accumulate() {
        let mut mc = MonteCarlo::new(1, |x| x[0]).unwrap();
        mc.set_seed(3).set_iterations(500);
        mc.compute();
        assert_eq!(mc.samples(), 500);
        mc.compute();
        assert_eq!(mc.samples(), 1000);
        // ∫₀¹ x dx = 1/2
        assert!((mc.area() - 0.5).abs() < 0.05);
    }

    #[test]
    fn reset_keeps_configuration() {
        let mut mc = MonteCarlo::new(1, |x| x[0]).unwrap();
        mc.set_range(&[Range::new(0.0, 4.0)]).unwrap();
        mc.set_seed(9).set_iterations(200);
        mc.compute();
        mc.reset();
        assert_eq!(mc.samples(), 0);
        assert_eq!(mc.area(), 0.0);
        assert_eq!(mc.ranges(), &[Range::new(0.0, 4.0)]);
        mc.compute();
        assert_eq!(mc.samples(), 200);
    }
}
