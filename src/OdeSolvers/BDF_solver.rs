//! # Variable-Order BDF Solver
//!
//! Implicit multi-step integrator for stiff initial value problems
//! `dy/dt = f(t, y)`, using backward differentiation formulas of orders 1-5
//! with a quasi-constant step scheme. The implementation follows the classic
//! design popularized by `scipy.integrate.BDF`:
//!
//! - the solution history is kept as an array of backward differences `D`,
//!   rescaled whenever the step size or order changes;
//! - each step solves the implicit BDF equation with a simplified Newton
//!   iteration against an LU-factored iteration matrix `I - c*J`;
//! - the Jacobian and the LU factorization are reused across steps and only
//!   refreshed when Newton convergence degrades;
//! - order selection compares the error estimates of the current, lower and
//!   higher order formulas once `order + 1` equal steps have been taken.
//!
//! The right-hand side is supplied through the [`OdeSystem`] trait, so models
//! with non-smooth guards (clamps, saturations) are expressed directly in
//! Rust. A default central finite-difference [`OdeSystem::jacobian`] is
//! provided; override it when an analytic Jacobian is available.
//!
//! Integration failure (step underflow, exceeded step budget, singular
//! iteration matrix) is always surfaced as [`SolverError`] - there is no
//! silent partial result.

use log::warn;
use nalgebra::{DMatrix, DVector, Dyn, LU};
use thiserror::Error;

const MAX_ORDER: usize = 5;
const NEWTON_MAXITER: usize = 4;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

/// error types for the stiff solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("bad solver input: {0}")]
    BadInput(String),
    #[error("step size underflow at t = {t:.6e}: required step fell below floating-point spacing")]
    StepSizeUnderflow { t: f64 },
    #[error("exceeded max_steps = {max_steps} at t = {t:.6e} before reaching the end of the span")]
    MaxStepsExceeded { max_steps: usize, t: f64 },
    #[error("singular iteration matrix at t = {t:.6e} (Jacobian may be degenerate)")]
    SingularIterationMatrix { t: f64 },
}

/// Right-hand side of an ODE system `dy/dt = f(t, y)`.
pub trait OdeSystem {
    /// Number of state variables.
    fn ndim(&self) -> usize;

    /// Evaluate `f(t, y)` and write into `dydt`.
    ///
    /// `y` and `dydt` have length `ndim()`. Must be a pure function of
    /// `(t, y)`: the solver calls it at trial states that are never part of
    /// the accepted trajectory.
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);

    /// Evaluate the Jacobian `df/dy` at `(t, y)` by central finite
    /// differences. Override for analytic Jacobians.
    fn jacobian(&self, t: f64, y: &[f64], jac: &mut DMatrix<f64>) {
        let n = self.ndim();
        let eps = 1e-8;
        if jac.nrows() != n || jac.ncols() != n {
            *jac = DMatrix::zeros(n, n);
        }
        let mut yp = y.to_vec();
        let mut fp = vec![0.0; n];
        let mut fm = vec![0.0; n];
        for j in 0..n {
            let orig = yp[j];
            let h = eps * (1.0 + orig.abs());
            yp[j] = orig + h;
            self.rhs(t, &yp, &mut fp);
            yp[j] = orig - h;
            self.rhs(t, &yp, &mut fm);
            yp[j] = orig;
            for i in 0..n {
                jac[(i, j)] = (fp[i] - fm[i]) / (2.0 * h);
            }
        }
    }
}

/// Configuration for the BDF solver.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Relative tolerance (default: 1e-6).
    pub rtol: f64,
    /// Absolute tolerance (default: 1e-9).
    pub atol: f64,
    /// Maximum step size (default: infinity - bounded by the span).
    pub max_step: f64,
    /// Initial step size; `None` selects one automatically.
    pub first_step: Option<f64>,
    /// Maximum number of accepted or rejected steps (default: 100 000).
    pub max_steps: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
            max_step: f64::INFINITY,
            first_step: None,
            max_steps: 100_000,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.rtol.is_finite() || self.rtol <= 0.0 {
            return Err(SolverError::BadInput("rtol must be finite and > 0".into()));
        }
        if !self.atol.is_finite() || self.atol <= 0.0 {
            return Err(SolverError::BadInput("atol must be finite and > 0".into()));
        }
        if self.max_step <= 0.0 {
            return Err(SolverError::BadInput("max_step must be > 0".into()));
        }
        if let Some(h) = self.first_step {
            if !h.is_finite() || h <= 0.0 {
                return Err(SolverError::BadInput("first_step must be finite and > 0".into()));
            }
        }
        if self.max_steps == 0 {
            return Err(SolverError::BadInput("max_steps must be > 0".into()));
        }
        Ok(())
    }
}

/// Time-sampled solution: `y[k]` is the state vector at `t[k]`.
#[derive(Debug, Clone)]
pub struct OdeSolution {
    pub t: Vec<f64>,
    pub y: Vec<Vec<f64>>,
    /// Number of solver steps actually taken (accepted and rejected).
    pub n_steps: usize,
}

fn scaled_rms(v: &DVector<f64>, scale: &DVector<f64>) -> f64 {
    let n = v.len() as f64;
    let mut s = 0.0;
    for i in 0..v.len() {
        let r = v[i] / scale[i];
        s += r * r;
    }
    (s / n).sqrt()
}

/// BDF coefficient tables for orders 0..=MAX_ORDER.
///
/// `kappa` damps the leading error term of the quasi-constant step scheme
/// (Shampine & Reichelt, "The MATLAB ODE Suite").
fn bdf_coefficients() -> ([f64; MAX_ORDER + 1], [f64; MAX_ORDER + 1], [f64; MAX_ORDER + 1]) {
    let kappa: [f64; MAX_ORDER + 1] = [0.0, -0.1850, -1.0 / 9.0, -0.0823, -0.0415, 0.0];
    let mut gamma = [0.0; MAX_ORDER + 1];
    for k in 1..=MAX_ORDER {
        gamma[k] = gamma[k - 1] + 1.0 / k as f64;
    }
    let mut alpha = [0.0; MAX_ORDER + 1];
    let mut error_const = [0.0; MAX_ORDER + 1];
    for k in 0..=MAX_ORDER {
        alpha[k] = (1.0 - kappa[k]) * gamma[k];
        error_const[k] = kappa[k] * gamma[k] + 1.0 / (k + 1) as f64;
    }
    (gamma, alpha, error_const)
}

/// Matrix that re-expresses backward differences on a grid whose spacing is
/// scaled by `factor`; cumulative row products of `(i - 1 - factor*j)/i`.
fn compute_r(order: usize, factor: f64) -> DMatrix<f64> {
    let n = order + 1;
    let mut m = DMatrix::zeros(n, n);
    for j in 0..n {
        m[(0, j)] = 1.0;
    }
    for i in 1..n {
        for j in 1..n {
            m[(i, j)] = (i as f64 - 1.0 - factor * j as f64) / i as f64;
        }
    }
    for i in 1..n {
        for j in 0..n {
            let prev = m[(i - 1, j)];
            m[(i, j)] *= prev;
        }
    }
    m
}

/// Rescale the difference array `d` in place after a step-size change.
fn change_d(d: &mut [DVector<f64>], order: usize, factor: f64) {
    let ru = compute_r(order, factor) * compute_r(order, 1.0);
    let old: Vec<DVector<f64>> = d[..=order].to_vec();
    for i in 0..=order {
        let mut acc = DVector::zeros(old[0].len());
        for (j, row) in old.iter().enumerate() {
            acc += row * ru[(j, i)];
        }
        d[i] = acc;
    }
}

fn select_initial_step<S: OdeSystem>(
    sys: &S,
    t0: f64,
    y0: &DVector<f64>,
    f0: &DVector<f64>,
    span: f64,
    max_step: f64,
    rtol: f64,
    atol: f64,
) -> f64 {
    let n = y0.len();
    let scale = y0.map(|v| atol + rtol * v.abs());
    let d0 = scaled_rms(y0, &scale);
    let d1 = scaled_rms(f0, &scale);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    let h0 = h0.min(span);

    let y1 = y0 + f0 * h0;
    let mut f1 = vec![0.0; n];
    sys.rhs(t0 + h0, y1.as_slice(), &mut f1);
    let df = DVector::from_column_slice(&f1) - f0;
    let d2 = scaled_rms(&df, &scale) / h0;

    // starting order is 1, so the error exponent is 1/2
    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        1e-6_f64.max(h0 * 1e-3)
    } else {
        (0.01 / d1.max(d2)).sqrt()
    };
    (100.0 * h0).min(h1).min(span).min(max_step)
}

/// Result of one simplified Newton solve: the candidate state and the
/// accumulated correction against the predictor.
struct NewtonOutcome {
    converged: bool,
    n_iter: usize,
    y: DVector<f64>,
    d: DVector<f64>,
}

/// Stateful BDF integrator over `[t0, t_bound]`.
///
/// Created via [`BdfSolver::new`], advanced with [`BdfSolver::step`]; after
/// each accepted step [`BdfSolver::interpolate`] evaluates the current
/// interpolating polynomial at any time in `(t_old, t]`.
pub struct BdfSolver<'a, S: OdeSystem> {
    sys: &'a S,
    rtol: f64,
    atol: f64,
    max_step: f64,
    max_steps: usize,
    t_bound: f64,
    t: f64,
    t_old: f64,
    y: DVector<f64>,
    h_abs: f64,
    order: usize,
    n_equal_steps: usize,
    /// Backward difference array, rows 0..=MAX_ORDER+2.
    d: Vec<DVector<f64>>,
    jac_m: DMatrix<f64>,
    jac_evaluated: bool,
    lu: Option<LU<f64, Dyn, Dyn>>,
    newton_tol: f64,
    n_steps: usize,
}

impl<'a, S: OdeSystem> BdfSolver<'a, S> {
    pub fn new(
        sys: &'a S,
        y0: &[f64],
        t0: f64,
        t_bound: f64,
        opts: &SolverOptions,
    ) -> Result<Self, SolverError> {
        opts.validate()?;
        let n = sys.ndim();
        if y0.len() != n {
            return Err(SolverError::BadInput(format!(
                "y0.len() = {} does not match ndim() = {}",
                y0.len(),
                n
            )));
        }
        if !t0.is_finite() || !t_bound.is_finite() || t_bound <= t0 {
            return Err(SolverError::BadInput(
                "integration span must be finite with t_bound > t0".into(),
            ));
        }

        let mut rtol = opts.rtol;
        let rtol_floor = 100.0 * f64::EPSILON;
        if rtol < rtol_floor {
            warn!("rtol = {rtol:.3e} below 100*machine epsilon, raised to {rtol_floor:.3e}");
            rtol = rtol_floor;
        }

        let y = DVector::from_column_slice(y0);
        let mut f0_buf = vec![0.0; n];
        sys.rhs(t0, y0, &mut f0_buf);
        let f0 = DVector::from_column_slice(&f0_buf);
        if !f0.iter().all(|v| v.is_finite()) {
            return Err(SolverError::BadInput(
                "rhs is not finite at the initial state".into(),
            ));
        }

        let span = t_bound - t0;
        let h_abs = match opts.first_step {
            Some(h) => h.min(span),
            None => select_initial_step(sys, t0, &y, &f0, span, opts.max_step, rtol, opts.atol),
        };

        let mut d = vec![DVector::zeros(n); MAX_ORDER + 3];
        d[0] = y.clone();
        d[1] = &f0 * h_abs;

        let newton_tol = (10.0 * f64::EPSILON / rtol).max(0.03_f64.min(rtol.sqrt()));

        Ok(Self {
            sys,
            rtol,
            atol: opts.atol,
            max_step: opts.max_step,
            max_steps: opts.max_steps,
            t_bound,
            t: t0,
            t_old: t0,
            y,
            h_abs,
            order: 1,
            n_equal_steps: 0,
            d,
            jac_m: DMatrix::zeros(n, n),
            jac_evaluated: false,
            lu: None,
            newton_tol,
            n_steps: 0,
        })
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn t_old(&self) -> f64 {
        self.t_old
    }

    pub fn y(&self) -> &DVector<f64> {
        &self.y
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn finished(&self) -> bool {
        self.t >= self.t_bound
    }

    fn eval_jac(&mut self, t: f64, y: &DVector<f64>) {
        self.sys.jacobian(t, y.as_slice(), &mut self.jac_m);
        self.jac_evaluated = true;
    }

    /// Simplified Newton iteration for the BDF algebraic system.
    fn solve_bdf_system(
        &self,
        t_new: f64,
        y_predict: &DVector<f64>,
        c: f64,
        psi: &DVector<f64>,
        scale: &DVector<f64>,
    ) -> NewtonOutcome {
        let n = y_predict.len();
        let lu = self.lu.as_ref().expect("LU factorization must exist");
        let mut d = DVector::zeros(n);
        let mut y = y_predict.clone();
        let mut f_buf = vec![0.0; n];
        let mut dy_norm_old: Option<f64> = None;
        let mut converged = false;
        let mut n_iter = 0;

        for k in 0..NEWTON_MAXITER {
            n_iter = k + 1;
            self.sys.rhs(t_new, y.as_slice(), &mut f_buf);
            if !f_buf.iter().all(|v| v.is_finite()) {
                break;
            }
            let f = DVector::from_column_slice(&f_buf);
            let b = f * c - psi - &d;
            let dy = match lu.solve(&b) {
                Some(x) => x,
                None => break,
            };
            let dy_norm = scaled_rms(&dy, scale);
            let rate = dy_norm_old.map(|old| dy_norm / old);

            if let Some(rate) = rate {
                if rate >= 1.0
                    || rate.powi((NEWTON_MAXITER - k) as i32) / (1.0 - rate) * dy_norm
                        > self.newton_tol
                {
                    break;
                }
            }

            y += &dy;
            d += &dy;

            if dy_norm == 0.0
                || rate.map_or(false, |r| r / (1.0 - r) * dy_norm < self.newton_tol)
            {
                converged = true;
                break;
            }
            dy_norm_old = Some(dy_norm);
        }
        NewtonOutcome {
            converged,
            n_iter,
            y,
            d,
        }
    }

    /// Advance one accepted step, adapting step size and order.
    pub fn step(&mut self) -> Result<(), SolverError> {
        if self.finished() {
            return Ok(());
        }
        if self.n_steps >= self.max_steps {
            return Err(SolverError::MaxStepsExceeded {
                max_steps: self.max_steps,
                t: self.t,
            });
        }
        self.n_steps += 1;

        let n = self.y.len();
        let t = self.t;
        let (gamma, alpha, error_const) = bdf_coefficients();
        let min_step = 10.0 * (t.abs() * f64::EPSILON).max(f64::MIN_POSITIVE);

        let mut h_abs = self.h_abs;
        if h_abs > self.max_step {
            change_d(&mut self.d, self.order, self.max_step / h_abs);
            h_abs = self.max_step;
            self.n_equal_steps = 0;
            self.lu = None;
        } else if h_abs < min_step {
            change_d(&mut self.d, self.order, min_step / h_abs);
            h_abs = min_step;
            self.n_equal_steps = 0;
            self.lu = None;
        }

        let mut current_jac = false;

        let (t_new, y_new, d_new, err_norm, safety, scale_new) = loop {
            if h_abs < min_step {
                return Err(SolverError::StepSizeUnderflow { t });
            }
            let mut t_new = t + h_abs;
            if t_new > self.t_bound {
                t_new = self.t_bound;
                change_d(&mut self.d, self.order, (t_new - t) / h_abs);
                self.n_equal_steps = 0;
                self.lu = None;
            }
            let h = t_new - t;
            h_abs = h;
            let order = self.order;

            let mut y_predict = DVector::zeros(n);
            for i in 0..=order {
                y_predict += &self.d[i];
            }
            let scale = y_predict.map(|v| self.atol + self.rtol * v.abs());
            let mut psi = DVector::zeros(n);
            for i in 1..=order {
                psi += &self.d[i] * gamma[i];
            }
            psi /= alpha[order];
            let c = h / alpha[order];

            let newton = loop {
                if self.lu.is_none() {
                    if !self.jac_evaluated {
                        self.eval_jac(t_new, &y_predict);
                        current_jac = true;
                    }
                    let m = DMatrix::identity(n, n) - &self.jac_m * c;
                    let lu = m.lu();
                    if !lu.is_invertible() {
                        if current_jac {
                            return Err(SolverError::SingularIterationMatrix { t: t_new });
                        }
                        self.eval_jac(t_new, &y_predict);
                        current_jac = true;
                        continue;
                    }
                    self.lu = Some(lu);
                }
                let newton = self.solve_bdf_system(t_new, &y_predict, c, &psi, &scale);
                if newton.converged || current_jac {
                    break newton;
                }
                self.eval_jac(t_new, &y_predict);
                current_jac = true;
                self.lu = None;
            };

            if !newton.converged {
                h_abs *= 0.5;
                change_d(&mut self.d, self.order, 0.5);
                self.n_equal_steps = 0;
                self.lu = None;
                continue;
            }

            let safety = 0.9 * (2 * NEWTON_MAXITER + 1) as f64
                / (2 * NEWTON_MAXITER + newton.n_iter) as f64;
            let scale_new = newton.y.map(|v| self.atol + self.rtol * v.abs());
            let error = &newton.d * error_const[order];
            let err_norm = scaled_rms(&error, &scale_new);

            if err_norm > 1.0 {
                let factor = (safety * err_norm.powf(-1.0 / (order as f64 + 1.0))).max(MIN_FACTOR);
                h_abs *= factor;
                change_d(&mut self.d, self.order, factor);
                self.n_equal_steps = 0;
                // Newton converged, so the cached LU is kept for the retry
                continue;
            }

            break (t_new, newton.y, newton.d, err_norm, safety, scale_new);
        };

        self.n_equal_steps += 1;
        self.t_old = t;
        self.t = t_new;
        self.y = y_new;
        self.h_abs = h_abs;

        let order = self.order;
        self.d[order + 2] = &d_new - &self.d[order + 1];
        self.d[order + 1] = d_new;
        for i in (0..=order).rev() {
            let next = self.d[i + 1].clone();
            self.d[i] += &next;
        }

        if self.n_equal_steps < order + 1 {
            return Ok(());
        }

        // order + step selection after order+1 equal steps
        let error_m_norm = if order > 1 {
            scaled_rms(&(&self.d[order] * error_const[order - 1]), &scale_new)
        } else {
            f64::INFINITY
        };
        let error_p_norm = if order < MAX_ORDER {
            scaled_rms(&(&self.d[order + 2] * error_const[order + 1]), &scale_new)
        } else {
            f64::INFINITY
        };

        let error_norms = [error_m_norm, err_norm, error_p_norm];
        let mut factors = [0.0; 3];
        for (k, &en) in error_norms.iter().enumerate() {
            factors[k] = if en == 0.0 {
                f64::INFINITY
            } else {
                en.powf(-1.0 / (order + k) as f64)
            };
        }
        let mut best = 0;
        for k in 1..3 {
            if factors[k] > factors[best] {
                best = k;
            }
        }
        self.order = order + best - 1;

        let factor = (safety * factors[best]).min(MAX_FACTOR);
        self.h_abs *= factor;
        change_d(&mut self.d, self.order, factor);
        self.n_equal_steps = 0;
        self.lu = None;
        Ok(())
    }

    /// Evaluate the interpolating polynomial of the last accepted step.
    ///
    /// Valid for `tq` in `[t_old, t]`; uses the backward-difference
    /// representation, so no extra rhs evaluations are needed.
    pub fn interpolate(&self, tq: f64) -> Vec<f64> {
        let order = self.order.max(1);
        let h = self.h_abs;
        let t = self.t;
        let mut y = self.d[0].clone();
        let mut p = 1.0;
        for j in 0..order {
            let x = (tq - (t - h * j as f64)) / (h * (j as f64 + 1.0));
            p *= x;
            y += &self.d[j + 1] * p;
        }
        y.as_slice().to_vec()
    }
}

/// Integrate a stiff system and sample the solution at `times`.
///
/// `times` must be finite, strictly increasing, with at least two points;
/// integration runs over `[times[0], times.last()]` and each requested time
/// is evaluated from the solver's dense output.
///
/// # Errors
/// Any integration failure ([`SolverError`]) aborts the run; no truncated
/// trajectory is returned.
pub fn solve_at_times<S: OdeSystem>(
    sys: &S,
    y0: &[f64],
    times: &[f64],
    opts: &SolverOptions,
) -> Result<OdeSolution, SolverError> {
    if times.len() < 2 {
        return Err(SolverError::BadInput(
            "times must contain at least two points".into(),
        ));
    }
    if !times.iter().all(|v| v.is_finite()) {
        return Err(SolverError::BadInput("times must be finite".into()));
    }
    if times.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SolverError::BadInput(
            "times must be strictly increasing".into(),
        ));
    }

    let t0 = times[0];
    let t_end = *times.last().expect("times is non-empty");
    let mut solver = BdfSolver::new(sys, y0, t0, t_end, opts)?;

    let mut sol = OdeSolution {
        t: Vec::with_capacity(times.len()),
        y: Vec::with_capacity(times.len()),
        n_steps: 0,
    };
    sol.t.push(t0);
    sol.y.push(y0.to_vec());
    let mut idx = 1;

    while !solver.finished() {
        solver.step()?;
        while idx < times.len() && times[idx] <= solver.t() {
            sol.t.push(times[idx]);
            sol.y.push(solver.interpolate(times[idx]));
            idx += 1;
        }
    }
    // floating-point leftovers at the right endpoint
    while idx < times.len() {
        sol.t.push(times[idx]);
        sol.y.push(solver.y().as_slice().to_vec());
        idx += 1;
    }
    sol.n_steps = solver.n_steps();
    Ok(sol)
}

/////////////////////////////////////////TESTS/////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Exponential decay: dy/dt = -k*y, closed form y0*exp(-k*t).
    struct ExpDecay {
        k: f64,
    }
    impl OdeSystem for ExpDecay {
        fn ndim(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = -self.k * y[0];
        }
    }

    /// Forced stiff relaxation: dy/dt = lambda*(cos(t) - y).
    /// For lambda >> 1 the solution hugs cos(t) after a thin boundary layer.
    struct StiffRelaxation {
        lambda: f64,
    }
    impl OdeSystem for StiffRelaxation {
        fn ndim(&self) -> usize {
            1
        }
        fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = self.lambda * (t.cos() - y[0]);
        }
    }

    #[test]
    fn exp_decay_matches_closed_form() {
        let sys = ExpDecay { k: 1.3 };
        let times: Vec<f64> = (0..=10).map(|k| 0.1 * k as f64).collect();
        let opts = SolverOptions {
            rtol: 1e-10,
            atol: 1e-14,
            ..Default::default()
        };
        let sol = solve_at_times(&sys, &[2.0], &times, &opts).unwrap();
        for (k, &t) in times.iter().enumerate() {
            let expected = 2.0 * (-1.3 * t).exp();
            assert_relative_eq!(sol.y[k][0], expected, max_relative = 1e-8);
        }
    }

    #[test]
    fn stiff_relaxation_handled_implicitly() {
        // lambda = 1e6 over a span of 10: the stability bound of an explicit
        // method (h < 2/lambda) would demand ~5e6 steps, and running one
        // anyway yields garbage, not just slowness - an explicit integrator
        // here is a correctness risk. The BDF must finish well inside the
        // step budget below.
        let sys = StiffRelaxation { lambda: 1e6 };
        let times = vec![0.0, 5.0, 10.0];
        let opts = SolverOptions {
            rtol: 1e-8,
            atol: 1e-10,
            max_steps: 20_000,
            ..Default::default()
        };
        let sol = solve_at_times(&sys, &[0.0], &times, &opts).unwrap();
        // exact particular solution differs from cos(t) by O(1/lambda)
        assert!((sol.y[2][0] - 10.0_f64.cos()).abs() < 1e-4);
        assert!(sol.n_steps < 20_000);
    }

    #[test]
    fn dense_output_samples_between_steps() {
        let sys = ExpDecay { k: 0.7 };
        let times = vec![0.0, 0.013, 0.4, 1.7, 3.0, 5.0];
        let opts = SolverOptions {
            rtol: 1e-10,
            atol: 1e-14,
            ..Default::default()
        };
        let sol = solve_at_times(&sys, &[1.0], &times, &opts).unwrap();
        assert_eq!(sol.t.len(), times.len());
        for (k, &t) in times.iter().enumerate() {
            assert_relative_eq!(sol.y[k][0], (-0.7 * t).exp(), max_relative = 1e-8);
        }
    }

    #[test]
    fn invalid_options_rejected() {
        let sys = ExpDecay { k: 1.0 };
        let times = vec![0.0, 1.0];

        let bad_rtol = SolverOptions {
            rtol: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            solve_at_times(&sys, &[1.0], &times, &bad_rtol),
            Err(SolverError::BadInput(_))
        ));

        let bad_first = SolverOptions {
            first_step: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            solve_at_times(&sys, &[1.0], &times, &bad_first),
            Err(SolverError::BadInput(_))
        ));
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let sys = ExpDecay { k: 1.0 };
        let err = solve_at_times(&sys, &[1.0, 2.0], &[0.0, 1.0], &SolverOptions::default());
        assert!(matches!(err, Err(SolverError::BadInput(_))));
    }

    #[test]
    fn non_increasing_times_rejected() {
        let sys = ExpDecay { k: 1.0 };
        let err = solve_at_times(&sys, &[1.0], &[0.0, 1.0, 1.0], &SolverOptions::default());
        assert!(matches!(err, Err(SolverError::BadInput(_))));
    }

    #[test]
    fn max_steps_failure_is_reported() {
        let sys = StiffRelaxation { lambda: 1e6 };
        let opts = SolverOptions {
            rtol: 1e-10,
            atol: 1e-12,
            max_steps: 5,
            ..Default::default()
        };
        let err = solve_at_times(&sys, &[0.0], &[0.0, 10.0], &opts);
        assert!(matches!(err, Err(SolverError::MaxStepsExceeded { .. })));
    }

    #[test]
    fn finite_difference_jacobian_matches_analytic() {
        struct Linear;
        impl OdeSystem for Linear {
            fn ndim(&self) -> usize {
                2
            }
            fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
                dydt[0] = -3.0 * y[0] + 0.5 * y[1];
                dydt[1] = 2.0 * y[0] - 7.0 * y[1];
            }
        }
        let sys = Linear;
        let mut jac = DMatrix::zeros(2, 2);
        sys.jacobian(0.0, &[1.0, -2.0], &mut jac);
        assert_relative_eq!(jac[(0, 0)], -3.0, max_relative = 1e-6);
        assert_relative_eq!(jac[(0, 1)], 0.5, max_relative = 1e-6);
        assert_relative_eq!(jac[(1, 0)], 2.0, max_relative = 1e-6);
        assert_relative_eq!(jac[(1, 1)], -7.0, max_relative = 1e-6);
    }

    #[test]
    fn difference_rescaling_preserves_polynomial_value() {
        // change_d must re-express the same interpolant: the zeroth
        // difference (the current state) is invariant under rescaling.
        let mut d = vec![DVector::zeros(1); MAX_ORDER + 3];
        d[0] = DVector::from_vec(vec![2.0]);
        d[1] = DVector::from_vec(vec![-0.3]);
        d[2] = DVector::from_vec(vec![0.04]);
        change_d(&mut d, 2, 0.5);
        assert_relative_eq!(d[0][0], 2.0, max_relative = 1e-12);
    }
}
