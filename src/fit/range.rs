//! Automatic choice of the fit window.
//!
//! For free diffusion the running diffusion coefficient is flat, and more
//! generally it varies smoothly where the MSD is well described by a simple
//! model. The search keeps the fit start fixed and extends the end as far as
//! a straight line through the RDC still explains it (R² above a threshold).

use crate::domain::{AnalysisSettings, MsdResults};
use crate::error::AppError;
use crate::math::linear_regression;

/// Fallback window length (in lag indices) when no window qualifies.
const FALLBACK_SPAN: usize = 5;

/// Find the end time of the longest RDC-linear window starting at `start_time`.
///
/// Candidate windows are `[start, end]` for every `end ≥ start + 2`. If none
/// reaches `threshold`, the end is `start + 5` (or the last lag if the data are
/// shorter).
pub fn find_best_fit_range(
    lag_time: &[f64],
    rdc: &[f64],
    start_time: f64,
    threshold: f64,
) -> Result<f64, AppError> {
    let n = lag_time.len().min(rdc.len());
    if n < 3 {
        return Err(AppError::insufficient(
            "Too few lag times to choose a fit range automatically (need at least 3).",
        ));
    }

    let Some(start_idx) = lag_time[..n].iter().position(|&t| t >= start_time) else {
        return Err(AppError::insufficient(format!(
            "Start time {start_time} is beyond the last lag time {}.",
            lag_time[n - 1]
        )));
    };
    if n - start_idx < 2 {
        return Err(AppError::insufficient(
            "Too few lag times after the start time; lower the start time.",
        ));
    }

    let mut best_end: Option<usize> = None;
    for end_idx in (start_idx + 2)..n {
        let x = &lag_time[start_idx..=end_idx];
        let y = &rdc[start_idx..=end_idx];
        match linear_regression(x, y) {
            Some(line) if line.r_squared >= threshold => best_end = Some(end_idx),
            Some(_) => {}
            None => tracing::debug!(start_idx, end_idx, "RDC line fit failed, skipping window"),
        }
    }

    let end_idx = match best_end {
        Some(idx) => idx,
        None => {
            let idx = if n > start_idx + FALLBACK_SPAN {
                start_idx + FALLBACK_SPAN
            } else {
                n - 1
            };
            tracing::warn!(
                threshold,
                end_index = idx,
                "no fit window reaches the R² threshold, using default end"
            );
            idx
        }
    };

    Ok(lag_time[end_idx])
}

/// End of the fit window for the given settings, clamped to the last lag.
///
/// Auto mode searches the RDC; if the search fails the end falls back to
/// `min(10·start, last lag)`.
pub fn resolve_end_time(results: &MsdResults, settings: &AnalysisSettings, start_time: f64) -> f64 {
    let last_lag = results.average.lag_time.last().copied().unwrap_or(0.0);

    let end = if settings.auto_fit {
        match find_best_fit_range(
            &results.rdc.lag_time,
            &results.rdc.rdc,
            start_time,
            settings.r_squared_threshold,
        ) {
            Ok(end) => end,
            Err(err) => {
                let fallback = (start_time * 10.0).min(last_lag);
                tracing::warn!(
                    error = %err,
                    fallback,
                    "automatic fit range failed, using default end time"
                );
                fallback
            }
        }
    } else {
        settings.end_time
    };

    end.min(last_lag)
}

/// Indices of lag times inside `[start, end]`.
pub fn window_indices(lag_time: &[f64], start: f64, end: f64) -> Vec<usize> {
    lag_time
        .iter()
        .enumerate()
        .filter(|(_, t)| **t >= start && **t <= end)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lags(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn linear_rdc_uses_whole_range() {
        let lag = lags(10);
        let rdc: Vec<f64> = lag.iter().map(|t| 1.0 + 0.1 * t).collect();
        let end = find_best_fit_range(&lag, &rdc, 0.0, 0.95).unwrap();
        assert_eq!(end, 10.0);
    }

    #[test]
    fn longest_linear_prefix_wins() {
        let lag = lags(10);
        let mut rdc: Vec<f64> = lag.iter().map(|t| 2.0 * t).collect();
        // Break linearity hard after lag 6.
        for (i, v) in rdc.iter_mut().enumerate().skip(6) {
            *v = if i % 2 == 0 { 100.0 } else { -100.0 };
        }
        let end = find_best_fit_range(&lag, &rdc, 1.0, 0.99).unwrap();
        assert_eq!(end, 6.0);
    }

    #[test]
    fn no_qualifying_window_falls_back_to_five_steps() {
        let lag = lags(10);
        let rdc: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let end = find_best_fit_range(&lag, &rdc, 2.0, 0.99).unwrap();
        assert_eq!(end, 7.0);

        let short_lag = lags(4);
        let end = find_best_fit_range(&short_lag, &rdc[..4], 1.0, 0.99).unwrap();
        assert_eq!(end, 4.0);
    }

    #[test]
    fn errors_on_short_or_exhausted_data() {
        assert!(find_best_fit_range(&[1.0, 2.0], &[1.0, 1.0], 0.0, 0.9).is_err());
        assert!(find_best_fit_range(&lags(5), &[1.0; 5], 9.0, 0.9).is_err());
        assert!(find_best_fit_range(&lags(5), &[1.0; 5], 5.0, 0.9).is_err());
    }

    #[test]
    fn window_is_inclusive() {
        assert_eq!(window_indices(&lags(5), 2.0, 4.0), vec![1, 2, 3]);
    }
}
