//! Diffusion model fitting on the ensemble-averaged MSD.
//!
//! Given:
//! - the averaged MSD `(lag_i, msd_i)`
//! - a model (Brownian, drift, confined)
//! - a fit window `[start, end]`
//!
//! we run a non-negative Levenberg–Marquardt fit of the model inside the
//! window, derive standard errors and 95% intervals from the parameter
//! covariance, and sample the fitted curve for plotting.

use crate::domain::{AnalysisSettings, CurveGrid, DiffusionModel, FitResult, MsdResults, ParamEstimate};
use crate::error::AppError;
use crate::fit::{lin_space, resolve_end_time, window_indices, CURVE_EXTENSION, CURVE_POINTS};
use crate::math::{levenberg_marquardt, r_squared, LmOptions};
use crate::models::{fill_jacobian_row, initial_guess, predict};

/// Fit `settings.model` to the averaged MSD.
pub fn fit_msd(results: &MsdResults, settings: &AnalysisSettings) -> Result<FitResult, AppError> {
    let avg = &results.average;
    if avg.is_empty() {
        return Err(AppError::insufficient("No averaged MSD to fit."));
    }

    let model = settings.model;
    let dim = results.dimension;
    let start_time = settings.start_time;
    let end_time = resolve_end_time(results, settings, start_time);

    let idx = window_indices(&avg.lag_time, start_time, end_time);
    if idx.len() < 2 {
        return Err(AppError::insufficient(format!(
            "Not enough points in fit range [{start_time}, {end_time}] (need at least 2); adjust the start or end time."
        )));
    }
    let x: Vec<f64> = idx.iter().map(|&i| avg.lag_time[i]).collect();
    let y: Vec<f64> = idx.iter().map(|&i| avg.msd[i]).collect();

    let p0 = initial_guess(model, &y);
    let outcome = levenberg_marquardt(
        &x,
        &y,
        &p0,
        |t, p| predict(model, dim, t, p),
        |t, p, out| fill_jacobian_row(model, dim, t, p, out),
        LmOptions::default(),
    )
    .ok_or_else(|| AppError::numeric(format!("{} fit failed to start.", model.display_name())))?;

    if outcome.params.iter().any(|v| !v.is_finite()) {
        return Err(AppError::numeric(format!(
            "{} fit produced non-finite parameters.",
            model.display_name()
        )));
    }
    if !outcome.converged {
        tracing::warn!(
            model = model.display_name(),
            iterations = outcome.iterations,
            "fit did not converge, reporting last iterate"
        );
    }

    let errs = outcome.std_errors();
    let params = &outcome.params;
    let fitted: Vec<f64> = x.iter().map(|&t| predict(model, dim, t, params)).collect();

    let t_grid = lin_space(0.0, end_time * CURVE_EXTENSION, CURVE_POINTS);
    let msd_grid = t_grid.iter().map(|&t| predict(model, dim, t, params)).collect();

    let d = ParamEstimate::new(params[0], errs[0]);
    let (v, l) = match model {
        DiffusionModel::Brownian => (None, None),
        DiffusionModel::Drift => (Some(ParamEstimate::new(params[1], errs[1])), None),
        DiffusionModel::Confined => (None, Some(ParamEstimate::new(params[1], errs[1]))),
    };

    let fit = FitResult {
        model,
        d,
        v,
        l,
        r_squared: r_squared(&y, &fitted),
        start_time,
        end_time,
        n_points: x.len(),
        curve: CurveGrid {
            t: t_grid,
            msd: msd_grid,
        },
    };

    tracing::info!(
        model = model.display_name(),
        d = fit.d.value,
        r_squared = fit.r_squared,
        start_time,
        end_time,
        "model fit finished"
    );
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AverageMsd, Dimension, RdcCurve};
    use crate::msd::running_diffusion;

    fn results_from(lag: Vec<f64>, msd: Vec<f64>, dim: Dimension) -> MsdResults {
        let rdc: RdcCurve = running_diffusion(&lag, &msd, dim);
        let n = lag.len();
        MsdResults {
            dimension: dim,
            individual: Vec::new(),
            average: AverageMsd {
                lag_time: lag,
                msd,
                std: vec![0.0; n],
                count: vec![1; n],
            },
            rdc,
        }
    }

    fn manual(model: DiffusionModel, start: f64, end: f64) -> AnalysisSettings {
        AnalysisSettings {
            model,
            auto_fit: false,
            start_time: start,
            end_time: end,
            ..AnalysisSettings::default()
        }
    }

    #[test]
    fn brownian_recovers_diffusion_coefficient() {
        let lag: Vec<f64> = (1..=20).map(|i| i as f64 * 0.1).collect();
        let msd: Vec<f64> = lag.iter().map(|t| 4.0 * 0.25 * t).collect();
        let results = results_from(lag, msd, Dimension::Two);

        let fit = fit_msd(&results, &AnalysisSettings::default()).unwrap();
        assert!((fit.d.value - 0.25).abs() < 1e-6, "D = {}", fit.d.value);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert!(fit.v.is_none() && fit.l.is_none());
        assert_eq!(fit.curve.t.len(), 100);
        assert!((fit.curve.t[99] - 1.2 * fit.end_time).abs() < 1e-9);
        assert!(fit.d.ci[0] <= fit.d.value && fit.d.value <= fit.d.ci[1]);
    }

    #[test]
    fn drift_recovers_velocity() {
        let lag: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let msd: Vec<f64> = lag.iter().map(|t| 6.0 * 0.5 * t + 0.3 * 0.3 * t * t).collect();
        let results = results_from(lag, msd, Dimension::Three);

        let fit = fit_msd(&results, &manual(DiffusionModel::Drift, 0.0, 30.0)).unwrap();
        assert!((fit.d.value - 0.5).abs() < 1e-5, "D = {}", fit.d.value);
        let v = fit.v.unwrap();
        assert!((v.value - 0.3).abs() < 1e-5, "V = {}", v.value);
        assert_eq!(fit.n_points, 30);
    }

    #[test]
    fn confined_recovers_length() {
        let lag: Vec<f64> = (1..=40).map(|i| i as f64 * 0.25).collect();
        let msd: Vec<f64> = lag
            .iter()
            .map(|t| 4.0 * (1.0 - (-4.0 * 0.5 * t / 4.0).exp()))
            .collect();
        let results = results_from(lag, msd, Dimension::Two);

        let fit = fit_msd(&results, &manual(DiffusionModel::Confined, 0.0, 10.0)).unwrap();
        let l = fit.l.unwrap();
        assert!((l.value - 2.0).abs() < 1e-4, "L = {}", l.value);
        assert!((fit.d.value - 0.5).abs() < 1e-4, "D = {}", fit.d.value);
    }

    #[test]
    fn end_time_is_clamped_to_data() {
        let lag: Vec<f64> = (1..=5).map(|i| i as f64).collect();
        let msd: Vec<f64> = lag.iter().map(|t| 4.0 * t).collect();
        let results = results_from(lag, msd, Dimension::Two);

        let fit = fit_msd(&results, &manual(DiffusionModel::Brownian, 0.0, 100.0)).unwrap();
        assert_eq!(fit.end_time, 5.0);
    }

    #[test]
    fn too_narrow_window_is_insufficient() {
        let lag: Vec<f64> = (1..=5).map(|i| i as f64).collect();
        let msd: Vec<f64> = lag.iter().map(|t| 4.0 * t).collect();
        let results = results_from(lag, msd, Dimension::Two);

        let err = fit_msd(&results, &manual(DiffusionModel::Brownian, 2.5, 3.0)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
