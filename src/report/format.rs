//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use std::path::PathBuf;

use crate::domain::{AnalysisFile, AnalysisSettings, Dimension, FitResult, MsdResults, ParamEstimate, ScalingResult};
use crate::io::ingest::IngestedData;

/// Maximum rows in the sampled MSD table.
pub const MSD_TABLE_ROWS: usize = 20;

/// What the run summary reports about the input data.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub source: Option<PathBuf>,
    /// Input layout (`None` when re-plotting from analysis JSON).
    pub format: Option<&'static str>,
    pub particles: usize,
    pub excluded: usize,
    /// Total observations (`None` when the raw tracks are not available).
    pub points: Option<usize>,
    pub skipped_rows: usize,
    pub dimension: Dimension,
}

impl DatasetSummary {
    pub fn from_ingest(ingest: &IngestedData, excluded: &[String]) -> Self {
        Self {
            source: ingest.path.clone(),
            format: Some(ingest.format.label()),
            particles: ingest.set.len(),
            excluded: ingest.set.len() - ingest.set.active_count(excluded),
            points: Some(ingest.set.total_points()),
            skipped_rows: ingest.row_errors.len(),
            dimension: ingest.set.dimension,
        }
    }

    pub fn from_analysis(analysis: &AnalysisFile) -> Self {
        Self {
            source: analysis.source.clone(),
            format: None,
            particles: analysis.msd.individual.len() + analysis.excluded_particles.len(),
            excluded: analysis.excluded_particles.len(),
            points: None,
            skipped_rows: 0,
            dimension: analysis.msd.dimension,
        }
    }
}

/// Format the full run summary (dataset + settings + tables).
pub fn format_run_summary(
    dataset: &DatasetSummary,
    settings: &AnalysisSettings,
    msd: &MsdResults,
    fit: Option<&FitResult>,
    scaling: Option<&ScalingResult>,
) -> String {
    let mut out = String::new();

    out.push_str("=== msd - Mean Squared Displacement Analysis ===\n");
    if let Some(source) = &dataset.source {
        out.push_str(&format!("File: {}\n", source.display()));
    }
    if let Some(format) = dataset.format {
        out.push_str(&format!("Format: {format}\n"));
    }
    out.push_str(&format!(
        "Particles: {} ({} analysed, {} excluded) | dimension={}\n",
        dataset.particles,
        dataset.particles.saturating_sub(dataset.excluded),
        dataset.excluded,
        dataset.dimension
    ));
    if let Some(points) = dataset.points {
        out.push_str(&format!("Points: {points}"));
        if dataset.skipped_rows > 0 {
            out.push_str(&format!(" ({} rows skipped)", dataset.skipped_rows));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "Units: time={} space={} | model={} | fit range={}\n",
        settings.time_unit,
        settings.space_unit,
        settings.model.display_name(),
        if settings.auto_fit {
            format!("auto (R² ≥ {})", settings.r_squared_threshold)
        } else {
            format!("[{}, {}]", settings.start_time, settings.end_time)
        }
    ));
    out.push('\n');

    out.push_str(&format_msd_table(msd, settings, MSD_TABLE_ROWS));

    if let Some(fit) = fit {
        out.push('\n');
        out.push_str(&format_fit(fit, settings, msd.dimension));
    }
    if let Some(scaling) = scaling {
        out.push('\n');
        out.push_str(&format_scaling(scaling, settings));
    }

    out
}

/// Indices of at most `max_rows` evenly strided samples of `0..len`.
pub fn sample_indices(len: usize, max_rows: usize) -> Vec<usize> {
    if len <= max_rows || max_rows == 0 {
        return (0..len).collect();
    }
    let step = len.div_ceil(max_rows);
    (0..len).step_by(step).collect()
}

/// Sampled table of the averaged MSD.
pub fn format_msd_table(msd: &MsdResults, settings: &AnalysisSettings, max_rows: usize) -> String {
    let avg = &msd.average;
    let mut out = String::new();
    out.push_str(&format!("Average MSD ({} lag times):\n", avg.len()));

    let header = format!(
        "{:>14} {:>14} {:>14} {:>14} {:>6}",
        format!("lag ({})", settings.time_unit),
        format!("MSD ({})", settings.msd_unit()),
        "std",
        "RDC",
        "n"
    );
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<14} {:-<14} {:-<14} {:-<14} {:-<6}\n", "", "", "", "", ""));

    for i in sample_indices(avg.len(), max_rows) {
        let rdc = msd.rdc.rdc.get(i).copied().unwrap_or(0.0);
        out.push_str(&format!(
            "{:>14} {:>14} {:>14} {:>14} {:>6}\n",
            fmt_num(avg.lag_time[i]),
            fmt_num(avg.msd[i]),
            fmt_num(avg.std[i]),
            fmt_num(rdc),
            avg.count[i]
        ));
    }
    out
}

/// Fitted model parameters.
pub fn format_fit(fit: &FitResult, settings: &AnalysisSettings, dim: Dimension) -> String {
    let mut out = String::new();
    out.push_str(&format!("Model fit: {}\n", fit.model.display_name()));
    out.push_str(&format!("  {}\n", fit.model.equation(dim)));
    out.push_str(&format!(
        "  range: [{}, {}] {} ({} points) | R² = {:.4}\n",
        fmt_num(fit.start_time),
        fmt_num(fit.end_time),
        settings.time_unit,
        fit.n_points,
        fit.r_squared
    ));
    out.push_str(&param_line("D", &fit.d, &settings.diffusion_unit()));
    if let Some(v) = &fit.v {
        out.push_str(&param_line("V", v, &settings.velocity_unit()));
    }
    if let Some(l) = &fit.l {
        out.push_str(&param_line("L", l, &settings.space_unit));
    }
    out
}

/// Power-law scaling result.
pub fn format_scaling(scaling: &ScalingResult, settings: &AnalysisSettings) -> String {
    let mut out = String::new();
    out.push_str("Scaling: MSD = K·t^α\n");
    out.push_str(&format!(
        "  range: [{}, {}] {} ({} points) | R² = {:.4}\n",
        fmt_num(scaling.start_time),
        fmt_num(scaling.end_time),
        settings.time_unit,
        scaling.n_points,
        scaling.r_squared
    ));
    out.push_str(&param_line("α", &scaling.alpha, ""));
    out.push_str(&param_line(
        "K",
        &scaling.k,
        &format!("{}/{}^α", settings.msd_unit(), settings.time_unit),
    ));
    out.push_str(&format!("  motion: {}\n", scaling.motion.label()));
    out
}

fn param_line(name: &str, est: &ParamEstimate, unit: &str) -> String {
    let line = format!(
        "  {name} = {} ± {}  95% CI [{}, {}] {unit}",
        fmt_num(est.value),
        fmt_num(est.err),
        fmt_num(est.ci[0]),
        fmt_num(est.ci[1]),
    );
    format!("{}\n", line.trim_end())
}

/// Fixed-point for moderate magnitudes, scientific otherwise.
pub fn fmt_num(v: f64) -> String {
    let a = v.abs();
    if v == 0.0 {
        "0".to_string()
    } else if !(1e-3..1e5).contains(&a) {
        format!("{v:.4e}")
    } else {
        format!("{v:.6}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AverageMsd, CurveGrid, DiffusionModel, MotionType, RdcCurve};

    fn small_results(n: usize) -> MsdResults {
        let lag: Vec<f64> = (1..=n).map(|i| i as f64).collect();
        MsdResults {
            dimension: Dimension::Two,
            individual: Vec::new(),
            average: AverageMsd {
                lag_time: lag.clone(),
                msd: lag.iter().map(|t| 4.0 * t).collect(),
                std: vec![0.5; n],
                count: vec![3; n],
            },
            rdc: RdcCurve {
                lag_time: lag,
                rdc: vec![1.0; n],
            },
        }
    }

    #[test]
    fn sample_indices_stride_evenly() {
        assert_eq!(sample_indices(5, 20), vec![0, 1, 2, 3, 4]);
        let idx = sample_indices(100, 20);
        assert_eq!(idx.len(), 20);
        assert_eq!(idx[1], 5);
        assert!(sample_indices(41, 20).len() <= 20);
    }

    #[test]
    fn fmt_num_switches_to_scientific() {
        assert_eq!(fmt_num(0.0), "0");
        assert_eq!(fmt_num(0.25), "0.250000");
        assert_eq!(fmt_num(1.5e-5), "1.5000e-5");
        assert_eq!(fmt_num(2.0e6), "2.0000e6");
    }

    #[test]
    fn msd_table_has_header_and_rows() {
        let results = small_results(3);
        let txt = format_msd_table(&results, &AnalysisSettings::default(), 20);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[0], "Average MSD (3 lag times):");
        assert!(lines[1].contains("lag (s)") && lines[1].contains("MSD (μm²)"));
        assert_eq!(lines.len(), 6);
        assert!(lines[3].trim_start().starts_with("1.000000"));
    }

    #[test]
    fn summary_includes_fit_and_scaling() {
        let results = small_results(4);
        let settings = AnalysisSettings::default();
        let fit = FitResult {
            model: DiffusionModel::Confined,
            d: ParamEstimate::new(1.0, 0.1),
            v: None,
            l: Some(ParamEstimate::new(2.0, 0.2)),
            r_squared: 0.99,
            start_time: 0.0,
            end_time: 4.0,
            n_points: 4,
            curve: CurveGrid::default(),
        };
        let scaling = ScalingResult {
            alpha: ParamEstimate::new(0.5, 0.01),
            k: ParamEstimate::new(3.0, 1.1),
            r_squared: 0.98,
            start_time: 1.0,
            end_time: 4.0,
            n_points: 4,
            motion: MotionType::SubDiffusion,
            curve: CurveGrid::default(),
        };
        let dataset = DatasetSummary {
            source: Some(PathBuf::from("tracks.csv")),
            format: Some("plain CSV"),
            particles: 5,
            excluded: 1,
            points: Some(40),
            skipped_rows: 2,
            dimension: Dimension::Two,
        };

        let txt = format_run_summary(&dataset, &settings, &results, Some(&fit), Some(&scaling));
        assert!(txt.contains("File: tracks.csv"));
        assert!(txt.contains("Particles: 5 (4 analysed, 1 excluded) | dimension=2D"));
        assert!(txt.contains("Points: 40 (2 rows skipped)"));
        assert!(txt.contains("Model fit: Confined Diffusion"));
        assert!(txt.contains("  L = 2.000000 ± 0.200000  95% CI [1.608000, 2.392000] μm"));
        assert!(txt.contains("motion: Sub-diffusion (α < 0.9)"));
    }

    #[test]
    fn unknown_exclusions_do_not_count() {
        let ingest = crate::io::ingest::parse_trajectories("id,t,x,y\n1,0,0,0\n1,1,1,0\n2,0,0,0\n2,1,0,1\n").unwrap();
        let summary = DatasetSummary::from_ingest(&ingest, &["99".to_string()]);
        assert_eq!((summary.particles, summary.excluded), (2, 0));

        let summary = DatasetSummary::from_ingest(&ingest, &["2".to_string(), "99".to_string()]);
        assert_eq!(summary.excluded, 1);
        let txt = format_run_summary(&summary, &AnalysisSettings::default(), &small_results(2), None, None);
        assert!(txt.contains("Particles: 2 (1 analysed, 1 excluded)"));
    }
}
