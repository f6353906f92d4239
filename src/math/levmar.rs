//! Non-negative Levenberg–Marquardt for small nonlinear models.
//!
//! Minimizes `Σ (y_i - f(x_i; p))²` subject to `p ≥ 0`. Each step solves the
//! damped normal equations
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr
//! ```
//!
//! and projects the candidate onto the feasible set. The damping `λ` shrinks
//! after an accepted step and grows after a rejected one.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iter: usize,
    /// Stop when the relative SSR improvement falls below this.
    pub ftol: f64,
    /// Stop when the relative step size falls below this.
    pub xtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iter: 500,
            ftol: 1e-12,
            xtol: 1e-12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: Vec<f64>,
    /// `s²·(JᵀJ)⁻¹` with `s² = SSR / (n - p)`.
    pub covariance: DMatrix<f64>,
    pub ssr: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl LmOutcome {
    /// Standard errors `sqrt(diag(covariance))`.
    pub fn std_errors(&self) -> Vec<f64> {
        self.covariance.diagonal().iter().map(|v| v.max(0.0).sqrt()).collect()
    }
}

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e16;

/// Fit `model(x, params)` to `(x, y)` starting from `p0`.
///
/// `jacobian(x, params, out)` fills `∂f/∂p_k` into `out`. Returns `None` when
/// the inputs are empty or the model cannot be evaluated at the start point.
pub fn levenberg_marquardt<F, J>(
    x: &[f64],
    y: &[f64],
    p0: &[f64],
    model: F,
    jacobian: J,
    opts: LmOptions,
) -> Option<LmOutcome>
where
    F: Fn(f64, &[f64]) -> f64,
    J: Fn(f64, &[f64], &mut [f64]),
{
    let n = x.len().min(y.len());
    let k = p0.len();
    if n == 0 || k == 0 {
        return None;
    }

    let ssr_at = |p: &[f64]| -> f64 {
        x[..n]
            .iter()
            .zip(&y[..n])
            .map(|(&xi, &yi)| (yi - model(xi, p)).powi(2))
            .sum()
    };

    let build = |p: &[f64]| -> (DMatrix<f64>, DVector<f64>) {
        let mut jac = DMatrix::<f64>::zeros(n, k);
        let mut res = DVector::<f64>::zeros(n);
        let mut row = vec![0.0; k];
        for i in 0..n {
            jacobian(x[i], p, &mut row);
            for (c, v) in row.iter().enumerate() {
                jac[(i, c)] = *v;
            }
            res[i] = y[i] - model(x[i], p);
        }
        (jac, res)
    };

    let mut params: Vec<f64> = p0.iter().map(|v| v.max(0.0)).collect();
    let mut ssr = ssr_at(&params);
    if !ssr.is_finite() {
        return None;
    }

    let mut lambda = LAMBDA_INIT;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < opts.max_iter {
        iterations += 1;
        let (jac, res) = build(&params);
        let jtj = jac.transpose() * &jac;
        let jtr = jac.transpose() * &res;

        let mut accepted = false;
        while lambda <= LAMBDA_MAX {
            let mut damped = jtj.clone();
            for d in 0..k {
                damped[(d, d)] += lambda * jtj[(d, d)].max(1e-12);
            }
            let Some(delta) = solve_least_squares(&damped, &jtr) else {
                lambda *= 10.0;
                continue;
            };

            let candidate: Vec<f64> = params
                .iter()
                .zip(delta.iter())
                .map(|(p, d)| (p + d).max(0.0))
                .collect();
            let candidate_ssr = ssr_at(&candidate);

            if candidate_ssr.is_finite() && candidate_ssr < ssr {
                let step: f64 = candidate
                    .iter()
                    .zip(&params)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                let scale: f64 = params.iter().map(|p| p * p).sum::<f64>().sqrt();
                let improvement = (ssr - candidate_ssr) / ssr.max(f64::MIN_POSITIVE);

                params = candidate;
                ssr = candidate_ssr;
                lambda = (lambda / 10.0).max(1e-12);
                accepted = true;

                if improvement < opts.ftol || step <= opts.xtol * (scale + opts.xtol) {
                    converged = true;
                }
                break;
            }
            lambda *= 10.0;
        }

        if !accepted {
            // No downhill step at any damping: we are at a (constrained) minimum.
            converged = true;
        }
        if converged || ssr == 0.0 {
            converged = true;
            break;
        }
    }

    let (jac, _) = build(&params);
    let jtj = jac.transpose() * &jac;
    let s2 = if n > k { ssr / (n - k) as f64 } else { 0.0 };
    let inv = jtj
        .clone()
        .try_inverse()
        .or_else(|| jtj.pseudo_inverse(1e-12).ok())
        .unwrap_or_else(|| DMatrix::zeros(k, k));

    tracing::trace!(iterations, ssr, converged, "levenberg-marquardt finished");

    Some(LmOutcome {
        params,
        covariance: inv * s2,
        ssr,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp_model(t: f64, p: &[f64]) -> f64 {
        p[0] * (1.0 - (-t / p[1]).exp())
    }

    fn exp_jac(t: f64, p: &[f64], out: &mut [f64]) {
        let e = (-t / p[1]).exp();
        out[0] = 1.0 - e;
        out[1] = -p[0] * e * t / (p[1] * p[1]);
    }

    #[test]
    fn recovers_exact_parameters() {
        let x: Vec<f64> = (1..=20).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|&t| exp_model(t, &[3.0, 2.0])).collect();
        let out = levenberg_marquardt(&x, &y, &[1.0, 1.0], exp_model, exp_jac, LmOptions::default()).unwrap();
        assert!(out.converged);
        assert!((out.params[0] - 3.0).abs() < 1e-6, "{:?}", out.params);
        assert!((out.params[1] - 2.0).abs() < 1e-6, "{:?}", out.params);
        assert!(out.ssr < 1e-12);
    }

    #[test]
    fn parameters_stay_non_negative() {
        // Best unconstrained slope is negative.
        let x = [1.0, 2.0, 3.0];
        let y = [-1.0, -2.0, -3.0];
        let out = levenberg_marquardt(
            &x,
            &y,
            &[1.0],
            |t, p| p[0] * t,
            |t, _p, out| out[0] = t,
            LmOptions::default(),
        )
        .unwrap();
        assert_eq!(out.params[0], 0.0);
    }

    #[test]
    fn linear_model_errors_match_closed_form() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.1, 1.9, 3.2, 3.9];
        let out = levenberg_marquardt(
            &x,
            &y,
            &[0.5],
            |t, p| p[0] * t,
            |t, _p, out| out[0] = t,
            LmOptions::default(),
        )
        .unwrap();
        let sxx: f64 = x.iter().map(|v| v * v).sum();
        let sxy: f64 = x.iter().zip(&y).map(|(a, b)| a * b).sum();
        let slope = sxy / sxx;
        assert!((out.params[0] - slope).abs() < 1e-9);
        let ssr: f64 = x.iter().zip(&y).map(|(a, b)| (b - slope * a).powi(2)).sum();
        let err = (ssr / 3.0 / sxx).sqrt();
        assert!((out.std_errors()[0] - err).abs() < 1e-9);
    }
}
