//! Ordinary least squares.
//!
//! Two flavours are used by the fitting code:
//!
//! - [`solve_least_squares`]: generic `minimize |y - Xβ|²` via SVD (the
//!   Levenberg–Marquardt step and the straight-line fits both go through it)
//! - [`linear_regression`]: straight line `y = a·x + b` with parameter
//!   covariance and R², used by the RDC range search and the log-log scaling
//!   analysis
//!
//! SVD is used instead of QR because the design matrices are tall (more rows
//! than columns) and nalgebra's `QR::solve` expects square systems.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Coefficient of determination, `0` when `y` has no variance.
pub fn r_squared(y: &[f64], y_fit: &[f64]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let ss_res: f64 = y.iter().zip(y_fit).map(|(a, b)| (a - b).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Straight-line fit `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Standard error of the slope.
    pub slope_err: f64,
    /// Standard error of the intercept.
    pub intercept_err: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a straight line through `(x, y)`.
///
/// Standard errors use the residual variance `SSR / (n - 2)` and are `0` for
/// exactly two points. Returns `None` for fewer than two points or when all
/// `x` coincide.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }

    let mut design = DMatrix::<f64>::zeros(n, 2);
    for (i, &xi) in x.iter().take(n).enumerate() {
        design[(i, 0)] = xi;
        design[(i, 1)] = 1.0;
    }
    let rhs = DVector::from_row_slice(&y[..n]);

    let xtx = design.transpose() * &design;
    let xtx_inv = xtx.try_inverse()?;
    let beta = solve_least_squares(&design, &rhs)?;
    let (slope, intercept) = (beta[0], beta[1]);

    let fitted: Vec<f64> = x[..n].iter().map(|xi| slope * xi + intercept).collect();
    let ssr: f64 = y[..n].iter().zip(&fitted).map(|(a, b)| (a - b).powi(2)).sum();

    let (slope_err, intercept_err) = if n > 2 {
        let s2 = ssr / (n - 2) as f64;
        (
            (s2 * xtx_inv[(0, 0)]).max(0.0).sqrt(),
            (s2 * xtx_inv[(1, 1)]).max(0.0).sqrt(),
        )
    } else {
        (0.0, 0.0)
    };

    Some(LinearFit {
        slope,
        intercept,
        slope_err,
        intercept_err,
        r_squared: r_squared(&y[..n], &fitted),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn exact_line_has_unit_r_squared_and_zero_errors() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        let fit = linear_regression(&x, &y).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-10);
        assert!((fit.intercept - 1.0).abs() < 1e-10);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(fit.slope_err < 1e-8);
    }

    #[test]
    fn noisy_line_reports_standard_errors() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.0, 1.0, 1.0, 3.0];
        let fit = linear_regression(&x, &y).unwrap();
        // Hand-computed: slope 0.9, intercept -0.1, SSR 0.7
        assert!((fit.slope - 0.9).abs() < 1e-10);
        assert!((fit.intercept + 0.1).abs() < 1e-10);
        let s2 = 0.7 / 2.0;
        assert!((fit.slope_err - (s2 / 5.0_f64).sqrt()).abs() < 1e-10);
        assert!((fit.intercept_err - (s2 * 0.7_f64).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn degenerate_inputs_return_none() {
        assert!(linear_regression(&[1.0], &[1.0]).is_none());
        assert!(linear_regression(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn constant_series_has_zero_r_squared() {
        assert_eq!(r_squared(&[2.0, 2.0], &[2.0, 2.0]), 0.0);
    }
}
