use std::collections::VecDeque;

use super::OptimError;
use crate::linalg::Lu;
use crate::matrix::vector::Vector;
use crate::matrix::Matrix;

/// What the outer loop must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Task {
    /// Evaluate the objective and gradient at [`BoundedStep::point`] and
    /// feed them back through [`BoundedStep::evaluated`].
    Fg,
    /// A step was accepted; the iterate advanced. Call
    /// [`BoundedStep::proceed`] to continue.
    NewX,
    /// Terminal: converged.
    Convergence(Convergence),
    /// Terminal: the line search could not find a sufficient decrease.
    Abnormal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Convergence {
    /// Relative function decrease fell below the function tolerance.
    Function,
    /// Projected gradient infinity-norm fell below the gradient tolerance.
    Gradient,
}

/// Per-variable bound encoding derived from bound finiteness.
const UNBOUNDED: u8 = 0;
const LOWER_ONLY: u8 = 1;
const BOTH: u8 = 2;
const UPPER_ONLY: u8 = 3;

/// Sufficient-decrease parameter of the Wolfe search.
const FTOL: f64 = 1e-3;
/// Curvature parameter of the Wolfe search.
const GTOL: f64 = 0.9;
/// Relative width below which a bracketed search stops refining.
const XTOL: f64 = 0.1;
/// Lower/upper extrapolation factors for an unbracketed step.
const XTRAPL: f64 = 1.1;
const XTRAPU: f64 = 4.0;
/// Evaluations allowed per line search before it is declared failed.
const MAX_LINE_EVALS: usize = 20;
/// Cap on any single step length.
const MAX_STEP: f64 = 1e10;

enum Phase {
    /// Waiting for the evaluation at the starting point.
    Start,
    /// Waiting for the evaluation at a line-search trial point.
    LineSearch,
    /// A step was accepted; waiting for [`BoundedStep::proceed`].
    Accepted,
    /// A terminal task was issued.
    Done,
}

/// Resumable limited-memory BFGS step with box bounds.
///
/// Owns the iterate, the correction history, and the line-search state;
/// the outer loop drives it through [`Task`] values, so iteration
/// accounting, cancellation, and progress reporting stay with the caller.
///
/// Each outer step follows the classic bounded limited-memory scheme: a
/// generalized Cauchy point along the projected gradient path fixes the
/// working set, the quadratic model is then minimized over the remaining
/// free variables through the compact representation
/// `B = θI − W·M·Wᵀ` with `W = [Y, θS]`, and a strong-Wolfe search runs
/// along the resulting direction. The two small `2m × 2m` systems the
/// compact form needs are solved with [`Lu`]. A failed search with a
/// non-empty history discards the corrections and restarts the step from
/// the same iterate before giving up.
pub(crate) struct BoundedStep {
    n: usize,
    m: usize,
    lower: Vec<f64>,
    upper: Vec<f64>,
    bound_code: Vec<u8>,
    f_tol: f64,
    g_tol: f64,

    x: Vec<f64>,
    f: f64,
    g: Vec<f64>,

    // Correction history, oldest first, and the scaling θ = yᵀy / yᵀs.
    s_hist: VecDeque<Vec<f64>>,
    y_hist: VecDeque<Vec<f64>>,
    theta: f64,

    // Line-search state: the iterate being stepped away from.
    x_prev: Vec<f64>,
    f_prev: f64,
    g_prev: Vec<f64>,
    direction: Vec<f64>,
    search: Option<WolfeSearch>,
    first_iteration: bool,

    phase: Phase,
}

impl BoundedStep {
    pub(crate) fn new(
        x0: &[f64],
        lower: &[f64],
        upper: &[f64],
        m: usize,
        f_tol: f64,
        g_tol: f64,
    ) -> Self {
        let n = x0.len();
        debug_assert_eq!(lower.len(), n);
        debug_assert_eq!(upper.len(), n);
        let bound_code = lower
            .iter()
            .zip(upper.iter())
            .map(|(&l, &u)| match (l.is_finite(), u.is_finite()) {
                (false, false) => UNBOUNDED,
                (true, false) => LOWER_ONLY,
                (true, true) => BOTH,
                (false, true) => UPPER_ONLY,
            })
            .collect();
        let mut step = Self {
            n,
            m,
            lower: lower.to_vec(),
            upper: upper.to_vec(),
            bound_code,
            f_tol,
            g_tol,
            x: x0.to_vec(),
            f: 0.0,
            g: vec![0.0; n],
            s_hist: VecDeque::with_capacity(m),
            y_hist: VecDeque::with_capacity(m),
            theta: 1.0,
            x_prev: vec![0.0; n],
            f_prev: 0.0,
            g_prev: vec![0.0; n],
            direction: vec![0.0; n],
            search: None,
            first_iteration: true,
            phase: Phase::Start,
        };
        // The starting point must be feasible.
        for i in 0..n {
            step.x[i] = step.clamp(i, step.x[i]);
        }
        step
    }

    /// The point the next `Fg` evaluation must use.
    pub(crate) fn point(&self) -> &[f64] {
        &self.x
    }

    /// Objective value at the last accepted iterate.
    pub(crate) fn value(&self) -> f64 {
        self.f
    }

    /// Gradient at the most recently evaluated point.
    pub(crate) fn gradient(&self) -> &[f64] {
        &self.g
    }

    /// Begin the optimization: the first task is always an evaluation at
    /// the (projected) starting point.
    pub(crate) fn start(&mut self) -> Task {
        Task::Fg
    }

    /// Feed back the objective and gradient evaluated at [`point`](Self::point).
    pub(crate) fn evaluated(&mut self, f: f64, g: &[f64]) -> Result<Task, OptimError> {
        debug_assert_eq!(g.len(), self.n);
        if !f.is_finite() || g.iter().any(|v| !v.is_finite()) {
            self.phase = Phase::Done;
            return Err(OptimError::NotFinite);
        }
        self.f = f;
        self.g.copy_from_slice(g);

        match self.phase {
            Phase::Start => {
                if self.projected_gradient_norm() <= self.g_tol {
                    self.phase = Phase::Done;
                    return Ok(Task::Convergence(Convergence::Gradient));
                }
                Ok(self.begin_step())
            }
            Phase::LineSearch => Ok(self.line_search_step()),
            Phase::Accepted | Phase::Done => {
                // Evaluations are only requested via `Task::Fg`.
                unreachable!("evaluated() called without a pending Fg task")
            }
        }
    }

    /// Continue after a `NewX` task: builds the next search direction and
    /// issues the next evaluation request.
    pub(crate) fn proceed(&mut self) -> Task {
        debug_assert!(matches!(self.phase, Phase::Accepted));
        self.begin_step()
    }

    /// One outer step: Cauchy point, subspace minimization, then the first
    /// trial point of the Wolfe search along the combined direction.
    fn begin_step(&mut self) -> Task {
        let (z, free) = self.cauchy_point();
        self.direction = self.subspace_direction(&z, &free);

        // A vanishing direction means the model sees no feasible descent.
        let dnorm_inf = self
            .direction
            .iter()
            .fold(0.0_f64, |acc, d| acc.max(d.abs()));
        if dnorm_inf == 0.0 {
            return self.search_failed();
        }

        let ginit: f64 = dot(&self.g, &self.direction);
        if ginit >= 0.0 {
            // Not a descent direction: stale curvature, discard and retry.
            return self.search_failed();
        }

        self.x_prev.copy_from_slice(&self.x);
        self.f_prev = self.f;
        self.g_prev.copy_from_slice(&self.g);

        let stpmax = self.max_feasible_step().min(MAX_STEP);
        if stpmax <= 0.0 {
            return self.search_failed();
        }
        let dnorm = dot(&self.direction, &self.direction).sqrt();
        let stp0 = if self.first_iteration {
            (1.0 / dnorm).min(stpmax)
        } else {
            1.0_f64.min(stpmax)
        };
        self.first_iteration = false;

        let search = WolfeSearch::new(self.f, ginit, stp0, stpmax);
        let stp = search.step();
        self.search = Some(search);
        self.set_trial_point(stp);
        self.phase = Phase::LineSearch;
        Task::Fg
    }

    fn line_search_step(&mut self) -> Task {
        let gd = dot(&self.g, &self.direction);
        let mut search = match self.search.take() {
            Some(s) => s,
            None => {
                self.phase = Phase::Done;
                return Task::Abnormal;
            }
        };
        match search.advance(self.f, gd) {
            SearchOutcome::Evaluate(stp) => {
                self.search = Some(search);
                self.set_trial_point(stp);
                Task::Fg
            }
            SearchOutcome::Converged(stp) => {
                self.set_trial_point(stp);
                self.accept_step()
            }
            SearchOutcome::Failed => self.search_failed(),
        }
    }

    /// Line-search failure policy: with corrections in the history the step
    /// restarts from the previous iterate with a fresh (steepest-descent)
    /// model; with none left it is terminal.
    fn search_failed(&mut self) -> Task {
        if self.s_hist.is_empty() {
            self.phase = Phase::Done;
            return Task::Abnormal;
        }
        self.s_hist.clear();
        self.y_hist.clear();
        self.theta = 1.0;
        if matches!(self.phase, Phase::LineSearch) {
            self.x.copy_from_slice(&self.x_prev);
            self.f = self.f_prev;
            self.g.copy_from_slice(&self.g_prev);
        }
        self.begin_step()
    }

    fn accept_step(&mut self) -> Task {
        // Store the correction pair when curvature is usable, dropping the
        // oldest pair once the history is full.
        let mut sy = 0.0;
        let mut yy = 0.0;
        let mut s = vec![0.0; self.n];
        let mut y = vec![0.0; self.n];
        for i in 0..self.n {
            s[i] = self.x[i] - self.x_prev[i];
            y[i] = self.g[i] - self.g_prev[i];
            sy += s[i] * y[i];
            yy += y[i] * y[i];
        }
        if sy > f64::EPSILON * yy {
            if self.s_hist.len() == self.m {
                self.s_hist.pop_front();
                self.y_hist.pop_front();
            }
            self.s_hist.push_back(s);
            self.y_hist.push_back(y);
            self.theta = yy / sy;
        }

        if self.projected_gradient_norm() <= self.g_tol {
            self.phase = Phase::Done;
            return Task::Convergence(Convergence::Gradient);
        }
        let f_scale = self.f_prev.abs().max(self.f.abs()).max(1.0);
        if self.f_prev - self.f <= self.f_tol * f_scale {
            self.phase = Phase::Done;
            return Task::Convergence(Convergence::Function);
        }

        self.phase = Phase::Accepted;
        Task::NewX
    }

    // ── Generalized Cauchy point ─────────────────────────────────────

    /// First local minimizer of the quadratic model along the projected
    /// steepest-descent path `P(x − t·g)`, walked breakpoint by
    /// breakpoint. Returns the displacement `z = x_cp − x` and the free
    /// mask (variables not pinned to a bound at the Cauchy point).
    fn cauchy_point(&self) -> (Vec<f64>, Vec<bool>) {
        let n = self.n;
        let mut d = vec![0.0; n];
        let mut z = vec![0.0; n];
        let mut free = vec![true; n];
        let mut breakpoints: Vec<(f64, usize)> = Vec::new();

        for i in 0..n {
            let gi = self.g[i];
            let code = self.bound_code[i];
            let t = if gi < 0.0 && (code == UPPER_ONLY || code == BOTH) {
                (self.x[i] - self.upper[i]) / gi
            } else if gi > 0.0 && (code == LOWER_ONLY || code == BOTH) {
                (self.x[i] - self.lower[i]) / gi
            } else if gi == 0.0 {
                continue;
            } else {
                f64::INFINITY
            };
            if t == 0.0 {
                // Already at the bound the gradient pushes against.
                free[i] = false;
            } else {
                d[i] = -gi;
                if t.is_finite() {
                    breakpoints.push((t, i));
                }
            }
        }
        breakpoints.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(core::cmp::Ordering::Equal));

        let mut t_cur = 0.0;
        let mut next = 0;
        loop {
            if d.iter().all(|&v| v == 0.0) {
                break;
            }
            let bd = self.model_mul(&d);
            let f1 = dot(&self.g, &d) + dot(&z, &bd);
            if f1 >= 0.0 {
                break;
            }
            let f2 = dot(&d, &bd);
            let dt_star = if f2 > 0.0 { -f1 / f2 } else { f64::INFINITY };

            let t_next = breakpoints
                .get(next)
                .map(|&(t, _)| t)
                .unwrap_or(f64::INFINITY);
            let dt = t_next - t_cur;

            if dt_star < dt {
                for i in 0..n {
                    z[i] += dt_star * d[i];
                }
                break;
            }
            if !t_next.is_finite() {
                break;
            }
            for i in 0..n {
                z[i] += dt * d[i];
            }
            // Pin every variable whose breakpoint is reached here.
            while next < breakpoints.len() && breakpoints[next].0 <= t_next {
                let (_, b) = breakpoints[next];
                z[b] = if self.g[b] > 0.0 {
                    self.lower[b] - self.x[b]
                } else {
                    self.upper[b] - self.x[b]
                };
                d[b] = 0.0;
                free[b] = false;
                next += 1;
            }
            t_cur = t_next;
        }

        (z, free)
    }

    // ── Subspace minimization ────────────────────────────────────────

    /// Minimize the quadratic model over the free variables starting from
    /// the Cauchy point, then clip the subspace step back into the box.
    /// Returns the full search direction from the current iterate.
    fn subspace_direction(&self, z: &[f64], free: &[bool]) -> Vec<f64> {
        let n = self.n;
        let k = self.s_hist.len();

        // Reduced gradient of the model at the Cauchy point.
        let bz = self.model_mul(z);
        let mut r = vec![0.0; n];
        for i in 0..n {
            if free[i] {
                r[i] = self.g[i] + bz[i];
            }
        }

        let mut d_sub = vec![0.0; n];
        if k == 0 {
            for i in 0..n {
                if free[i] {
                    d_sub[i] = -r[i] / self.theta;
                }
            }
        } else {
            // B⁻¹ restricted to the free set, by the Woodbury identity:
            // B⁻¹ = I/θ + (1/θ²)·W·(K − WᵀW/θ)⁻¹·Wᵀ with K = M⁻¹.
            let v = self.w_transpose_mul(&r, Some(free));
            let mut nmat = self.middle_matrix();
            let wtw = self.w_gram(free);
            for a in 0..2 * k {
                for b in 0..2 * k {
                    nmat[(a, b)] = nmat[(a, b)] - wtw[(a, b)] / self.theta;
                }
            }
            match Lu::new(&nmat) {
                Ok(lu) => {
                    let u = lu.solve(&Vector::from_slice(&v));
                    let wu = self.w_mul(u.as_slice());
                    let t2 = self.theta * self.theta;
                    for i in 0..n {
                        if free[i] {
                            d_sub[i] = -(r[i] / self.theta + wu[i] / t2);
                        }
                    }
                }
                Err(_) => {
                    // Degenerate curvature: fall back to the scaled
                    // steepest-descent step on the free set.
                    for i in 0..n {
                        if free[i] {
                            d_sub[i] = -r[i] / self.theta;
                        }
                    }
                }
            }
        }

        // Largest fraction of the subspace step that stays feasible.
        let mut alpha = 1.0_f64;
        for i in 0..n {
            if !free[i] || d_sub[i] == 0.0 {
                continue;
            }
            let xi = self.x[i] + z[i];
            let code = self.bound_code[i];
            if d_sub[i] > 0.0 && (code == UPPER_ONLY || code == BOTH) {
                alpha = alpha.min((self.upper[i] - xi) / d_sub[i]);
            } else if d_sub[i] < 0.0 && (code == LOWER_ONLY || code == BOTH) {
                alpha = alpha.min((self.lower[i] - xi) / d_sub[i]);
            }
        }
        let alpha = alpha.max(0.0);

        let mut direction = vec![0.0; n];
        for i in 0..n {
            direction[i] = z[i] + if free[i] { alpha * d_sub[i] } else { 0.0 };
        }
        direction
    }

    // ── Compact-form model products ──────────────────────────────────

    /// `B·v = θ·v − W·M·(Wᵀ·v)` with `W = [Y, θS]` and `M` the inverse of
    /// the middle matrix; identity scaling θ when the history is empty.
    fn model_mul(&self, v: &[f64]) -> Vec<f64> {
        let k = self.s_hist.len();
        let mut out: Vec<f64> = v.iter().map(|&vi| self.theta * vi).collect();
        if k == 0 {
            return out;
        }
        let wv = self.w_transpose_mul(v, None);
        let mw = match Lu::new(&self.middle_matrix()) {
            Ok(lu) => lu.solve(&Vector::from_slice(&wv)),
            // A singular middle matrix degrades the model to θI.
            Err(_) => return out,
        };
        let wmw = self.w_mul(mw.as_slice());
        for i in 0..self.n {
            out[i] -= wmw[i];
        }
        out
    }

    /// The middle matrix `K = M⁻¹ = [[−D, Lᵀ], [L, θ·SᵀS]]`, with `D` the
    /// diagonal of `SᵀY` and `L` its strictly lower triangle.
    fn middle_matrix(&self) -> Matrix<f64> {
        let k = self.s_hist.len();
        let mut m = Matrix::zeros(2 * k, 2 * k, 0.0);
        for i in 0..k {
            for j in 0..k {
                let sy = dot(&self.s_hist[i], &self.y_hist[j]);
                if i == j {
                    m[(i, i)] = -sy;
                } else if i > j {
                    m[(k + i, j)] = sy;
                    m[(j, k + i)] = sy;
                }
                m[(k + i, k + j)] = self.theta * dot(&self.s_hist[i], &self.s_hist[j]);
            }
        }
        m
    }

    /// `Wᵀ·v`, optionally restricted to the rows in `mask`.
    fn w_transpose_mul(&self, v: &[f64], mask: Option<&[bool]>) -> Vec<f64> {
        let k = self.s_hist.len();
        let mut out = vec![0.0; 2 * k];
        for c in 0..k {
            let mut ydot = 0.0;
            let mut sdot = 0.0;
            for i in 0..self.n {
                if mask.map_or(true, |m| m[i]) {
                    ydot += self.y_hist[c][i] * v[i];
                    sdot += self.s_hist[c][i] * v[i];
                }
            }
            out[c] = ydot;
            out[k + c] = self.theta * sdot;
        }
        out
    }

    /// `W·u` over all rows.
    fn w_mul(&self, u: &[f64]) -> Vec<f64> {
        let k = self.s_hist.len();
        let mut out = vec![0.0; self.n];
        for c in 0..k {
            for i in 0..self.n {
                out[i] += u[c] * self.y_hist[c][i] + u[k + c] * self.theta * self.s_hist[c][i];
            }
        }
        out
    }

    /// Gram matrix `WᵀW` restricted to the free rows.
    fn w_gram(&self, free: &[bool]) -> Matrix<f64> {
        let k = self.s_hist.len();
        let col = |c: usize, i: usize| -> f64 {
            if c < k {
                self.y_hist[c][i]
            } else {
                self.theta * self.s_hist[c - k][i]
            }
        };
        let mut m = Matrix::zeros(2 * k, 2 * k, 0.0);
        for a in 0..2 * k {
            for b in a..2 * k {
                let mut acc = 0.0;
                for i in 0..self.n {
                    if free[i] {
                        acc += col(a, i) * col(b, i);
                    }
                }
                m[(a, b)] = acc;
                m[(b, a)] = acc;
            }
        }
        m
    }

    // ── Geometry helpers ─────────────────────────────────────────────

    /// Largest step along the current direction that keeps the previous
    /// iterate inside the box.
    fn max_feasible_step(&self) -> f64 {
        let mut stpmax = MAX_STEP;
        for i in 0..self.n {
            let di = self.direction[i];
            if di == 0.0 {
                continue;
            }
            let code = self.bound_code[i];
            if di > 0.0 && (code == UPPER_ONLY || code == BOTH) {
                stpmax = stpmax.min((self.upper[i] - self.x_prev[i]) / di);
            } else if di < 0.0 && (code == LOWER_ONLY || code == BOTH) {
                stpmax = stpmax.min((self.lower[i] - self.x_prev[i]) / di);
            }
        }
        stpmax.max(0.0)
    }

    /// Infinity-norm of the gradient restricted to the feasible region.
    fn projected_gradient_norm(&self) -> f64 {
        let mut norm = 0.0_f64;
        for i in 0..self.n {
            let code = self.bound_code[i];
            let at_lower = (code == LOWER_ONLY || code == BOTH) && self.x[i] <= self.lower[i];
            let at_upper = (code == UPPER_ONLY || code == BOTH) && self.x[i] >= self.upper[i];
            let gi = self.g[i];
            if (at_lower && gi > 0.0) || (at_upper && gi < 0.0) {
                continue;
            }
            norm = norm.max(gi.abs());
        }
        norm
    }

    fn set_trial_point(&mut self, stp: f64) {
        for i in 0..self.n {
            let trial = self.x_prev[i] + stp * self.direction[i];
            self.x[i] = self.clamp(i, trial);
        }
    }

    fn clamp(&self, i: usize, v: f64) -> f64 {
        match self.bound_code[i] {
            LOWER_ONLY => v.max(self.lower[i]),
            UPPER_ONLY => v.min(self.upper[i]),
            BOTH => v.max(self.lower[i]).min(self.upper[i]),
            _ => v,
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ── Strong-Wolfe line search ─────────────────────────────────────────

enum SearchOutcome {
    /// Evaluate f and the directional derivative at this step length.
    Evaluate(f64),
    /// Both Wolfe conditions hold at this step length.
    Converged(f64),
    /// The search stalled before satisfying the conditions.
    Failed,
}

/// Safeguarded cubic/quadratic interpolation search enforcing the strong
/// Wolfe conditions, in the classic two-stage MINPACK form: stage one uses
/// the auxiliary function `ψ(α) = f(α) − f(0) − α·ftol·f′(0)` until a step
/// with nonnegative slope and sufficient decrease is found, stage two works
/// on f directly.
struct WolfeSearch {
    brackt: bool,
    stage1: bool,
    finit: f64,
    ginit: f64,
    gtest: f64,
    width: f64,
    width1: f64,
    stx: f64,
    fx: f64,
    gx: f64,
    sty: f64,
    fy: f64,
    gy: f64,
    stp: f64,
    stmin: f64,
    stmax: f64,
    stpmax: f64,
    evals: usize,
}

impl WolfeSearch {
    /// `ginit` must be negative; the caller guarantees a descent direction.
    fn new(f0: f64, ginit: f64, stp0: f64, stpmax: f64) -> Self {
        debug_assert!(ginit < 0.0);
        let width = stpmax;
        Self {
            brackt: false,
            stage1: true,
            finit: f0,
            ginit,
            gtest: FTOL * ginit,
            width,
            width1: 2.0 * width,
            stx: 0.0,
            fx: f0,
            gx: ginit,
            sty: 0.0,
            fy: f0,
            gy: ginit,
            stp: stp0,
            stmin: 0.0,
            stmax: stp0 + XTRAPU * stp0,
            stpmax,
            evals: 0,
        }
    }

    fn step(&self) -> f64 {
        self.stp
    }

    /// Process the evaluation at the current step and pick the next one.
    fn advance(&mut self, f: f64, g: f64) -> SearchOutcome {
        self.evals += 1;
        let ftest = self.finit + self.stp * self.gtest;

        if self.stage1 && f <= ftest && g >= 0.0 {
            self.stage1 = false;
        }

        if f <= ftest && g.abs() <= GTOL * (-self.ginit) {
            return SearchOutcome::Converged(self.stp);
        }
        // Stalls: a degenerate bracket, a pinned endpoint, or the interval
        // shrinking below resolution.
        if self.brackt && (self.stp <= self.stmin || self.stp >= self.stmax) {
            return SearchOutcome::Failed;
        }
        if self.brackt && self.stmax - self.stmin <= XTOL * self.stmax {
            return SearchOutcome::Failed;
        }
        if self.stp == self.stpmax && f <= ftest && g <= self.gtest {
            return SearchOutcome::Failed;
        }
        if self.stp == 0.0 && (f > ftest || g >= self.gtest) {
            return SearchOutcome::Failed;
        }
        if self.evals >= MAX_LINE_EVALS {
            return SearchOutcome::Failed;
        }

        if self.stage1 && f <= self.fx && f > ftest {
            // Stage one interpolates the auxiliary function ψ instead of f.
            let fm = f - self.stp * self.gtest;
            let mut fxm = self.fx - self.stx * self.gtest;
            let mut fym = self.fy - self.sty * self.gtest;
            let gm = g - self.gtest;
            let mut gxm = self.gx - self.gtest;
            let mut gym = self.gy - self.gtest;
            trial_step(
                &mut self.stx,
                &mut fxm,
                &mut gxm,
                &mut self.sty,
                &mut fym,
                &mut gym,
                &mut self.stp,
                fm,
                gm,
                &mut self.brackt,
                self.stmin,
                self.stmax,
            );
            self.fx = fxm + self.stx * self.gtest;
            self.fy = fym + self.sty * self.gtest;
            self.gx = gxm + self.gtest;
            self.gy = gym + self.gtest;
        } else {
            trial_step(
                &mut self.stx,
                &mut self.fx,
                &mut self.gx,
                &mut self.sty,
                &mut self.fy,
                &mut self.gy,
                &mut self.stp,
                f,
                g,
                &mut self.brackt,
                self.stmin,
                self.stmax,
            );
        }

        if self.brackt {
            // Bisection safeguard when interpolation shrinks too slowly.
            if (self.sty - self.stx).abs() >= 0.66 * self.width1 {
                self.stp = self.stx + 0.5 * (self.sty - self.stx);
            }
            self.width1 = self.width;
            self.width = (self.sty - self.stx).abs();
            self.stmin = self.stx.min(self.sty);
            self.stmax = self.stx.max(self.sty);
        } else {
            self.stmin = self.stp + XTRAPL * (self.stp - self.stx);
            self.stmax = self.stp + XTRAPU * (self.stp - self.stx);
        }

        self.stp = self.stp.clamp(0.0, self.stpmax);
        if self.brackt
            && (self.stp <= self.stmin
                || self.stp >= self.stmax
                || self.stmax - self.stmin <= XTOL * self.stmax)
        {
            self.stp = self.stx;
        }

        SearchOutcome::Evaluate(self.stp)
    }
}

/// Compute a safeguarded trial step from the current bracketing interval
/// and update the interval. `(stx, fx, gx)` is the endpoint with the least
/// function value, `(sty, fy, gy)` the other endpoint, `(stp, fp, gp)` the
/// latest trial.
#[allow(clippy::too_many_arguments)]
fn trial_step(
    stx: &mut f64,
    fx: &mut f64,
    gx: &mut f64,
    sty: &mut f64,
    fy: &mut f64,
    gy: &mut f64,
    stp: &mut f64,
    fp: f64,
    gp: f64,
    brackt: &mut bool,
    stmin: f64,
    stmax: f64,
) {
    let sgnd = gp * gx.signum();
    let stpf;

    if fp > *fx {
        // Higher value: the minimum brackets between stx and stp.
        let theta = 3.0 * (*fx - fp) / (*stp - *stx) + *gx + gp;
        let s = theta.abs().max(gx.abs()).max(gp.abs());
        let mut gamma = s * ((theta / s).powi(2) - (*gx / s) * (gp / s)).sqrt();
        if *stp < *stx {
            gamma = -gamma;
        }
        let p = (gamma - *gx) + theta;
        let q = ((gamma - *gx) + gamma) + gp;
        let r = p / q;
        let stpc = *stx + r * (*stp - *stx);
        let stpq = *stx + ((*gx / ((*fx - fp) / (*stp - *stx) + *gx)) / 2.0) * (*stp - *stx);
        stpf = if (stpc - *stx).abs() < (stpq - *stx).abs() {
            stpc
        } else {
            stpc + (stpq - stpc) / 2.0
        };
        *brackt = true;
    } else if sgnd < 0.0 {
        // Lower value, opposite slope sign: minimum brackets here too.
        let theta = 3.0 * (*fx - fp) / (*stp - *stx) + *gx + gp;
        let s = theta.abs().max(gx.abs()).max(gp.abs());
        let mut gamma = s * ((theta / s).powi(2) - (*gx / s) * (gp / s)).sqrt();
        if *stp > *stx {
            gamma = -gamma;
        }
        let p = (gamma - gp) + theta;
        let q = ((gamma - gp) + gamma) + *gx;
        let r = p / q;
        let stpc = *stp + r * (*stx - *stp);
        let stpq = *stp + (gp / (gp - *gx)) * (*stx - *stp);
        stpf = if (stpc - *stp).abs() > (stpq - *stp).abs() {
            stpc
        } else {
            stpq
        };
        *brackt = true;
    } else if gp.abs() < gx.abs() {
        // Lower value, same sign, smaller slope: the cubic may not have a
        // minimizer ahead, so extrapolate with a far-point safeguard.
        let theta = 3.0 * (*fx - fp) / (*stp - *stx) + *gx + gp;
        let s = theta.abs().max(gx.abs()).max(gp.abs());
        let mut gamma =
            s * (((theta / s).powi(2) - (*gx / s) * (gp / s)).max(0.0)).sqrt();
        if *stp > *stx {
            gamma = -gamma;
        }
        let p = (gamma - gp) + theta;
        let q = (gamma + (*gx - gp)) + gamma;
        let r = p / q;
        let stpc = if r < 0.0 && gamma != 0.0 {
            *stp + r * (*stx - *stp)
        } else if *stp > *stx {
            stmax
        } else {
            stmin
        };
        let stpq = *stp + (gp / (gp - *gx)) * (*stx - *stp);
        if *brackt {
            let mut f = if (stpc - *stp).abs() < (stpq - *stp).abs() {
                stpc
            } else {
                stpq
            };
            f = if *stp > *stx {
                f.min(*stp + 0.66 * (*sty - *stp))
            } else {
                f.max(*stp + 0.66 * (*sty - *stp))
            };
            stpf = f;
        } else {
            let f = if (stpc - *stp).abs() > (stpq - *stp).abs() {
                stpc
            } else {
                stpq
            };
            stpf = f.clamp(stmin, stmax);
        }
    } else {
        // Lower value, same sign, larger slope.
        stpf = if *brackt {
            let theta = 3.0 * (fp - *fy) / (*sty - *stp) + *gy + gp;
            let s = theta.abs().max(gy.abs()).max(gp.abs());
            let mut gamma = s * ((theta / s).powi(2) - (*gy / s) * (gp / s)).sqrt();
            if *stp > *sty {
                gamma = -gamma;
            }
            let p = (gamma - gp) + theta;
            let q = ((gamma - gp) + gamma) + *gy;
            let r = p / q;
            *stp + r * (*sty - *stp)
        } else if *stp > *stx {
            stmax
        } else {
            stmin
        };
    }

    if fp > *fx {
        *sty = *stp;
        *fy = fp;
        *gy = gp;
    } else {
        if sgnd < 0.0 {
            *sty = *stx;
            *fy = *fx;
            *gy = *gx;
        }
        *stx = *stp;
        *fx = fp;
        *gx = gp;
    }
    *stp = stpf;
}
