//! Export analysis results to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts. Column headers carry the physical units.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::domain::{AnalysisFile, AnalysisSettings, CurveGrid, FitResult, MsdResults, ParamEstimate, ScalingResult};
use crate::error::AppError;
use crate::io::session::write_analysis_json;

pub const AVERAGE_CSV: &str = "msd_average.csv";
pub const INDIVIDUAL_CSV: &str = "msd_individual.csv";
pub const FIT_CURVE_CSV: &str = "fit_curve.csv";
pub const SCALING_CURVE_CSV: &str = "scaling_curve.csv";
pub const FIT_SUMMARY_CSV: &str = "fit_summary.csv";
pub const ANALYSIS_JSON: &str = "analysis.json";

fn create_writer(path: &Path) -> Result<csv::Writer<std::fs::File>, AppError> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", path.display())))
}

fn write_err(path: &Path) -> impl Fn(csv::Error) -> AppError + '_ {
    move |e| AppError::input(format!("Failed to write '{}': {e}", path.display()))
}

fn flush(mut writer: csv::Writer<std::fs::File>, path: &Path) -> Result<(), AppError> {
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to write '{}': {e}", path.display())))
}

/// Compare particle ids so that embedded numbers sort numerically
/// (`"2" < "10"`, `"p2" < "p10"`).
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let na = take_digits(&mut ai);
                let nb = take_digits(&mut bi);
                let ta = na.trim_start_matches('0');
                let tb = nb.trim_start_matches('0');
                let ord = ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ca), Some(cb)) => {
                let ord = ca.to_lowercase().cmp(cb.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                ai.next();
                bi.next();
            }
        }
    }
}

fn take_digits(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(c) = it.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        out.push(c);
        it.next();
    }
    out
}

/// Averaged MSD with std, RDC and particle counts per lag.
pub fn write_average_csv(path: &Path, msd: &MsdResults, settings: &AnalysisSettings) -> Result<(), AppError> {
    let mut w = create_writer(path)?;
    let msd_unit = settings.msd_unit();
    w.write_record([
        format!("lag_time ({})", settings.time_unit),
        format!("msd ({msd_unit})"),
        format!("std ({msd_unit})"),
        format!("rdc ({})", settings.diffusion_unit()),
        "count".to_string(),
    ])
    .map_err(write_err(path))?;

    let avg = &msd.average;
    for i in 0..avg.len() {
        let rdc = msd.rdc.rdc.get(i).copied().unwrap_or(0.0);
        w.write_record([
            avg.lag_time[i].to_string(),
            avg.msd[i].to_string(),
            avg.std[i].to_string(),
            rdc.to_string(),
            avg.count[i].to_string(),
        ])
        .map_err(write_err(path))?;
    }
    flush(w, path)
}

/// Per-particle MSD in long format, particles in natural id order.
pub fn write_individual_csv(path: &Path, msd: &MsdResults, settings: &AnalysisSettings) -> Result<(), AppError> {
    let mut w = create_writer(path)?;
    w.write_record([
        "particle_id".to_string(),
        format!("lag_time ({})", settings.time_unit),
        format!("msd ({})", settings.msd_unit()),
    ])
    .map_err(write_err(path))?;

    let mut particles: Vec<_> = msd.individual.iter().collect();
    particles.sort_by(|a, b| natural_cmp(&a.particle_id, &b.particle_id));

    for p in particles {
        for (lag, value) in p.curve.lag_time.iter().zip(&p.curve.msd) {
            w.write_record([p.particle_id.clone(), lag.to_string(), value.to_string()])
                .map_err(write_err(path))?;
        }
    }
    flush(w, path)
}

/// A sampled model curve.
pub fn write_curve_csv(path: &Path, curve: &CurveGrid, settings: &AnalysisSettings) -> Result<(), AppError> {
    let mut w = create_writer(path)?;
    w.write_record([
        format!("t ({})", settings.time_unit),
        format!("msd ({})", settings.msd_unit()),
    ])
    .map_err(write_err(path))?;
    for (t, m) in curve.t.iter().zip(&curve.msd) {
        w.write_record([t.to_string(), m.to_string()])
            .map_err(write_err(path))?;
    }
    flush(w, path)
}

fn param_row(name: &str, est: &ParamEstimate, unit: &str) -> [String; 6] {
    [
        name.to_string(),
        est.value.to_string(),
        est.err.to_string(),
        est.ci[0].to_string(),
        est.ci[1].to_string(),
        unit.to_string(),
    ]
}

fn scalar_row(name: &str, value: f64) -> [String; 6] {
    [
        name.to_string(),
        value.to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
    ]
}

/// Fitted parameters with 95% intervals (model fit and scaling).
pub fn write_fit_summary_csv(
    path: &Path,
    fit: Option<&FitResult>,
    scaling: Option<&ScalingResult>,
    settings: &AnalysisSettings,
) -> Result<(), AppError> {
    let mut w = create_writer(path)?;
    w.write_record(["parameter", "value", "std_error", "ci_low", "ci_high", "unit"])
        .map_err(write_err(path))?;

    if let Some(fit) = fit {
        w.write_record(param_row("D", &fit.d, &settings.diffusion_unit()))
            .map_err(write_err(path))?;
        if let Some(v) = &fit.v {
            w.write_record(param_row("V", v, &settings.velocity_unit()))
                .map_err(write_err(path))?;
        }
        if let Some(l) = &fit.l {
            w.write_record(param_row("L", l, &settings.space_unit))
                .map_err(write_err(path))?;
        }
        w.write_record(scalar_row("fit_r_squared", fit.r_squared))
            .map_err(write_err(path))?;
        w.write_record(scalar_row("fit_start_time", fit.start_time))
            .map_err(write_err(path))?;
        w.write_record(scalar_row("fit_end_time", fit.end_time))
            .map_err(write_err(path))?;
    }

    if let Some(s) = scaling {
        w.write_record(param_row("alpha", &s.alpha, ""))
            .map_err(write_err(path))?;
        let k_unit = format!("{}/{}^α", settings.msd_unit(), settings.time_unit);
        w.write_record(param_row("K", &s.k, &k_unit))
            .map_err(write_err(path))?;
        w.write_record(scalar_row("scaling_r_squared", s.r_squared))
            .map_err(write_err(path))?;
    }

    flush(w, path)
}

/// Write every data export for `analysis` into `dir` (created if missing).
///
/// Returns the paths written, in a stable order.
pub fn export_all(dir: &Path, analysis: &AnalysisFile) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::input(format!("Failed to create output directory '{}': {e}", dir.display())))?;

    let settings = &analysis.settings;
    let mut written = Vec::new();

    let path = dir.join(AVERAGE_CSV);
    write_average_csv(&path, &analysis.msd, settings)?;
    written.push(path);

    let path = dir.join(INDIVIDUAL_CSV);
    write_individual_csv(&path, &analysis.msd, settings)?;
    written.push(path);

    if let Some(fit) = &analysis.fit {
        let path = dir.join(FIT_CURVE_CSV);
        write_curve_csv(&path, &fit.curve, settings)?;
        written.push(path);
    }
    if let Some(scaling) = &analysis.scaling {
        let path = dir.join(SCALING_CURVE_CSV);
        write_curve_csv(&path, &scaling.curve, settings)?;
        written.push(path);
    }
    if analysis.fit.is_some() || analysis.scaling.is_some() {
        let path = dir.join(FIT_SUMMARY_CSV);
        write_fit_summary_csv(&path, analysis.fit.as_ref(), analysis.scaling.as_ref(), settings)?;
        written.push(path);
    }

    let path = dir.join(ANALYSIS_JSON);
    write_analysis_json(&path, analysis)?;
    written.push(path);

    tracing::info!(dir = %dir.display(), files = written.len(), "exports written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order_compares_numbers_numerically() {
        let mut ids = vec!["10", "2", "1", "p10", "p2", "007", "a"];
        ids.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(ids, vec!["1", "2", "007", "10", "a", "p2", "p10"]);
    }

    #[test]
    fn natural_order_is_total_for_equal_numbers() {
        assert_eq!(natural_cmp("01", "1"), "01".cmp("1"));
        assert_eq!(natural_cmp("x", "x"), Ordering::Equal);
    }
}
