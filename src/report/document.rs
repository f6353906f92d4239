//! Markdown analysis report.
//!
//! The report links the SVG figures (by path relative to the report) and
//! repeats the key tables so it reads on its own in any Markdown viewer.

use std::path::Path;

use crate::domain::{AnalysisFile, ParamEstimate};
use crate::error::AppError;
use crate::plot::Figure;
use crate::report::format::{fmt_num, sample_indices, MSD_TABLE_ROWS};

pub const REPORT_FILE: &str = "report.md";

/// Render the report as Markdown text.
///
/// `figure_base` is the directory the report will live in; figure links are
/// made relative to it when possible.
pub fn render_markdown(analysis: &AnalysisFile, figures: &[Figure], figure_base: &Path) -> String {
    let s = &analysis.settings;
    let msd = &analysis.msd;
    let mut out = String::new();

    out.push_str("# MSD Analysis Report\n\n");
    out.push_str(&format!(
        "Generated {} by {} {}.\n\n",
        analysis.generated_at.format("%Y-%m-%d %H:%M:%S"),
        analysis.tool,
        analysis.version
    ));

    out.push_str("## Dataset and settings\n\n");
    out.push_str("| Item | Value |\n|---|---|\n");
    if let Some(src) = &analysis.source {
        out.push_str(&format!("| Source | `{}` |\n", src.display()));
    }
    out.push_str(&format!("| Dimension | {} |\n", msd.dimension));
    out.push_str(&format!("| Particles analysed | {} |\n", msd.individual.len()));
    if !analysis.excluded_particles.is_empty() {
        out.push_str(&format!(
            "| Excluded particles | {} |\n",
            analysis.excluded_particles.join(", ")
        ));
    }
    out.push_str(&format!("| Time unit | {} |\n", s.time_unit));
    out.push_str(&format!("| Space unit | {} |\n", s.space_unit));
    out.push_str(&format!("| Model | {} |\n", s.model.display_name()));
    if s.auto_fit {
        out.push_str(&format!(
            "| Fit range | automatic, start {} (R² ≥ {}) |\n",
            s.start_time, s.r_squared_threshold
        ));
    } else {
        out.push_str(&format!("| Fit range | [{}, {}] |\n", s.start_time, s.end_time));
    }
    out.push('\n');

    if !figures.is_empty() {
        out.push_str("## Figures\n\n");
        for fig in figures {
            let link = fig.path.strip_prefix(figure_base).unwrap_or(&fig.path);
            out.push_str(&format!("### {}\n\n![{}]({})\n\n", fig.title, fig.title, link.display()));
        }
    }

    if let Some(fit) = &analysis.fit {
        out.push_str("## Model fit\n\n");
        out.push_str(&format!(
            "{}: `{}`, fitted on [{}, {}] {} ({} points), R² = {:.4}.\n\n",
            fit.model.display_name(),
            fit.model.equation(msd.dimension),
            fmt_num(fit.start_time),
            fmt_num(fit.end_time),
            s.time_unit,
            fit.n_points,
            fit.r_squared
        ));
        out.push_str(PARAM_HEADER);
        out.push_str(&param_row("D", &fit.d, &s.diffusion_unit()));
        if let Some(v) = &fit.v {
            out.push_str(&param_row("V", v, &s.velocity_unit()));
        }
        if let Some(l) = &fit.l {
            out.push_str(&param_row("L", l, &s.space_unit));
        }
        out.push('\n');
    }

    if let Some(sc) = &analysis.scaling {
        out.push_str("## Scaling analysis\n\n");
        out.push_str(&format!(
            "`MSD = K·t^α` on [{}, {}] {} ({} points), R² = {:.4} (log space). Motion: **{}**.\n\n",
            fmt_num(sc.start_time),
            fmt_num(sc.end_time),
            s.time_unit,
            sc.n_points,
            sc.r_squared,
            sc.motion.label()
        ));
        out.push_str(PARAM_HEADER);
        out.push_str(&param_row("α", &sc.alpha, ""));
        out.push_str(&param_row("K", &sc.k, &format!("{}/{}^α", s.msd_unit(), s.time_unit)));
        out.push('\n');
    }

    let avg = &msd.average;
    out.push_str("## Average MSD\n\n");
    out.push_str(&format!(
        "| Lag ({}) | MSD ({}) | Std | RDC ({}) | Particles |\n|---|---|---|---|---|\n",
        s.time_unit,
        s.msd_unit(),
        s.diffusion_unit()
    ));
    for i in sample_indices(avg.len(), MSD_TABLE_ROWS) {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            fmt_num(avg.lag_time[i]),
            fmt_num(avg.msd[i]),
            fmt_num(avg.std[i]),
            fmt_num(msd.rdc.rdc.get(i).copied().unwrap_or(0.0)),
            avg.count[i]
        ));
    }
    if avg.len() > MSD_TABLE_ROWS {
        out.push_str(&format!(
            "\nShowing {} of {} lag times; see `msd_average.csv` for all.\n",
            sample_indices(avg.len(), MSD_TABLE_ROWS).len(),
            avg.len()
        ));
    }

    out
}

const PARAM_HEADER: &str = "| Parameter | Value | Std. error | 95% CI | Unit |\n|---|---|---|---|---|\n";

fn param_row(name: &str, est: &ParamEstimate, unit: &str) -> String {
    format!(
        "| {name} | {} | {} | [{}, {}] | {unit} |\n",
        fmt_num(est.value),
        fmt_num(est.err),
        fmt_num(est.ci[0]),
        fmt_num(est.ci[1])
    )
}

/// Write `report.md` into `dir`.
pub fn write_markdown_report(dir: &Path, analysis: &AnalysisFile, figures: &[Figure]) -> Result<std::path::PathBuf, AppError> {
    let path = dir.join(REPORT_FILE);
    let text = render_markdown(analysis, figures, dir);
    std::fs::write(&path, text)
        .map_err(|e| AppError::input(format!("Failed to write report '{}': {e}", path.display())))?;
    tracing::info!(path = %path.display(), "report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisSettings, AverageMsd, Dimension, MsdResults, RdcCurve};
    use chrono::Local;
    use std::path::PathBuf;

    fn analysis() -> AnalysisFile {
        AnalysisFile {
            tool: "msd".to_string(),
            version: "0.1.0".to_string(),
            generated_at: Local::now(),
            source: Some(PathBuf::from("data/tracks.csv")),
            settings: AnalysisSettings::default(),
            excluded_particles: vec!["7".to_string()],
            msd: MsdResults {
                dimension: Dimension::Two,
                individual: Vec::new(),
                average: AverageMsd {
                    lag_time: vec![1.0, 2.0],
                    msd: vec![4.0, 8.0],
                    std: vec![0.0, 0.0],
                    count: vec![2, 1],
                },
                rdc: RdcCurve {
                    lag_time: vec![1.0, 2.0],
                    rdc: vec![1.0, 1.0],
                },
            },
            fit: None,
            scaling: None,
        }
    }

    #[test]
    fn figure_links_are_relative() {
        let figs = vec![Figure {
            title: "MSD curves".to_string(),
            path: PathBuf::from("out/figures/msd_curves.svg"),
        }];
        let md = render_markdown(&analysis(), &figs, Path::new("out"));
        assert!(md.contains("![MSD curves](figures/msd_curves.svg)"));
        assert!(md.contains("| Excluded particles | 7 |"));
        assert!(md.contains("| 2.000000 | 8.000000 | 0 | 1.000000 | 1 |"));
        assert!(!md.contains("## Model fit"));
    }
}
