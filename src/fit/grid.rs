//! Sampling grids for fitted curves.
//!
//! Fitted model curves are drawn on 100 points extending 20% past the fit
//! window, linearly spaced for the model fit and log-spaced for the power law.

use crate::error::AppError;

/// Number of points in every sampled curve.
pub const CURVE_POINTS: usize = 100;

/// Fitted curves extend this factor past the end of the fit window.
pub const CURVE_EXTENSION: f64 = 1.2;

/// Generate `steps` linearly spaced points between `min` and `max` (inclusive).
pub fn lin_space(min: f64, max: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (steps as f64 - 1.0);
            (0..steps).map(|i| min + step * i as f64).collect()
        }
    }
}

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0) {
        return Err(AppError::numeric(format!(
            "Invalid log range: min={min}, max={max} (must be finite and >0)."
        )));
    }
    Ok(lin_space(min.log10(), max.log10(), steps)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect())
}
