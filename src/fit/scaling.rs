//! Power-law scaling analysis, `MSD = K·t^α`.
//!
//! A straight line is fitted to `log10 MSD` against `log10 t`. The slope is the
//! anomalous exponent α (sub-diffusive below 0.9, super-diffusive above 1.1),
//! the intercept gives `K = 10^intercept`.

use crate::domain::{AnalysisSettings, CurveGrid, FitResult, MotionType, MsdResults, ParamEstimate, ScalingResult};
use crate::error::AppError;
use crate::fit::{log_space, resolve_end_time, window_indices, CURVE_EXTENSION, CURVE_POINTS};
use crate::math::linear_regression;

/// Start time used when the data have no positive lag at all.
const TINY_START: f64 = 1e-6;

/// Fit the power law over the same window as `fit` (if given).
pub fn analyze_scaling(
    results: &MsdResults,
    settings: &AnalysisSettings,
    fit: Option<&FitResult>,
) -> Result<ScalingResult, AppError> {
    let avg = &results.average;
    if avg.is_empty() {
        return Err(AppError::insufficient("No averaged MSD for scaling analysis."));
    }

    let start_time = if settings.start_time <= 0.0 {
        avg.lag_time.iter().copied().find(|&t| t > 0.0).unwrap_or(TINY_START)
    } else {
        settings.start_time
    };

    let end_time = match fit {
        Some(fit) => {
            let last = avg.lag_time.last().copied().unwrap_or(fit.end_time);
            fit.end_time.min(last)
        }
        None => resolve_end_time(results, settings, start_time),
    };

    let idx: Vec<usize> = window_indices(&avg.lag_time, start_time, end_time)
        .into_iter()
        .filter(|&i| avg.lag_time[i] > 0.0 && avg.msd[i] > 0.0)
        .collect();
    if idx.len() < 2 {
        return Err(AppError::insufficient(format!(
            "Not enough points in scaling range [{start_time}, {end_time}] (need at least 2)."
        )));
    }

    let log_t: Vec<f64> = idx.iter().map(|&i| avg.lag_time[i].log10()).collect();
    let log_msd: Vec<f64> = idx.iter().map(|&i| avg.msd[i].log10()).collect();

    let line = linear_regression(&log_t, &log_msd)
        .ok_or_else(|| AppError::numeric("Scaling analysis failed: log-log regression is singular."))?;

    let alpha = ParamEstimate::new(line.slope, line.slope_err);
    let k_value = 10f64.powf(line.intercept);
    let k = ParamEstimate::new(k_value, 10f64.powf(line.intercept_err));

    let t_grid = log_space(start_time, end_time * CURVE_EXTENSION, CURVE_POINTS)?;
    let msd_grid = t_grid.iter().map(|t| k_value * t.powf(alpha.value)).collect();

    let motion = MotionType::from_alpha(alpha.value);
    tracing::info!(
        alpha = alpha.value,
        k = k_value,
        r_squared = line.r_squared,
        motion = motion.label(),
        "scaling analysis finished"
    );

    Ok(ScalingResult {
        alpha,
        k,
        r_squared: line.r_squared,
        start_time,
        end_time,
        n_points: idx.len(),
        motion,
        curve: CurveGrid {
            t: t_grid,
            msd: msd_grid,
        },
    })
}
