//! SVG figures for reports.
//!
//! Each figure is written to its own file so the Markdown report can link
//! them and they can be dropped into slides as-is:
//!
//! - `trajectories.svg`: x/y projection of every analysed track
//! - `msd_curves.svg`: individual MSD curves with the ensemble average
//! - `particle_count.svg`: number of particles contributing at each lag
//! - `rdc.svg`: running diffusion coefficient
//! - `msd_fit.svg`: average MSD ± std, fitted model, fit window
//! - `msd_scaling.svg`: log-log MSD with the power-law fit

use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::domain::{AnalysisFile, TrajectorySet};
use crate::error::AppError;

pub const FIGURE_SIZE: (u32, u32) = (1000, 700);
const CAPTION_FONT: u32 = 26;
const LABEL_FONT: u32 = 16;

/// A figure that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Figure {
    pub title: String,
    pub path: PathBuf,
}

type DrawResult = Result<(), Box<dyn Error>>;

/// Render every figure the analysis supports into `dir`.
///
/// The trajectory figure needs the raw tracks and is skipped when `set` is
/// `None` (e.g. when re-plotting from analysis JSON).
pub fn render_figures(
    dir: &Path,
    analysis: &AnalysisFile,
    set: Option<&TrajectorySet>,
) -> Result<Vec<Figure>, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::input(format!("Failed to create figure directory '{}': {e}", dir.display())))?;

    let mut figures = Vec::new();
    let mut emit = |file: &str, title: &str, draw: &dyn Fn(&Path) -> DrawResult| -> Result<(), AppError> {
        let path = dir.join(file);
        draw(&path).map_err(|e| AppError::input(format!("Failed to draw '{}': {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "figure written");
        figures.push(Figure {
            title: title.to_string(),
            path,
        });
        Ok(())
    };

    if let Some(set) = set {
        emit("trajectories.svg", "Particle trajectories", &|p: &Path| {
            draw_trajectories(p, set, analysis)
        })?;
    }
    emit("msd_curves.svg", "MSD curves", &|p: &Path| draw_msd_curves(p, analysis))?;
    emit("particle_count.svg", "Particles per lag time", &|p: &Path| {
        draw_particle_count(p, analysis)
    })?;
    emit("rdc.svg", "Running diffusion coefficient", &|p: &Path| draw_rdc(p, analysis))?;
    if analysis.fit.is_some() {
        emit("msd_fit.svg", "MSD fit", &|p: &Path| draw_fit(p, analysis))?;
    }
    if analysis.scaling.is_some() {
        emit("msd_scaling.svg", "MSD scaling (log-log)", &|p: &Path| draw_scaling(p, analysis))?;
    }

    tracing::info!(dir = %dir.display(), figures = figures.len(), "figures written");
    Ok(figures)
}

/// Linear axis range with 5% padding (fixed padding for degenerate ranges).
fn padded(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return 0.0..1.0;
    }
    let span = hi - lo;
    let pad = if span < 1e-12 { 0.5 } else { span * 0.05 };
    (lo - pad)..(hi + pad)
}

/// Log axis range over the positive values, widened by 20% on each side.
fn log_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite() && *v > 0.0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return 0.1..1.0;
    }
    if hi <= lo {
        return (lo / 2.0)..(hi * 2.0);
    }
    (lo / 1.2)..(hi * 1.2)
}

fn draw_trajectories(path: &Path, set: &TrajectorySet, analysis: &AnalysisFile) -> DrawResult {
    let unit = &analysis.settings.space_unit;
    let tracks: Vec<_> = set.active(&analysis.excluded_particles).collect();

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let xs = tracks.iter().flat_map(|t| t.points.iter().map(|p| p.pos[0]));
    let ys = tracks.iter().flat_map(|t| t.points.iter().map(|p| p.pos[1]));
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Trajectories ({} particles)", tracks.len()),
            ("sans-serif", CAPTION_FONT),
        )
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(padded(xs), padded(ys))?;

    chart
        .configure_mesh()
        .x_desc(format!("x ({unit})"))
        .y_desc(format!("y ({unit})"))
        .label_style(("sans-serif", LABEL_FONT))
        .draw()?;

    for (i, track) in tracks.iter().enumerate() {
        let color = Palette99::pick(i);
        chart.draw_series(LineSeries::new(
            track.points.iter().map(|p| (p.pos[0], p.pos[1])),
            color.stroke_width(1),
        ))?;
        if let (Some(first), Some(last)) = (track.points.first(), track.points.last()) {
            chart.draw_series(std::iter::once(Circle::new((first.pos[0], first.pos[1]), 3, GREEN.filled())))?;
            chart.draw_series(std::iter::once(Circle::new((last.pos[0], last.pos[1]), 3, RED.filled())))?;
        }
    }

    root.present()?;
    Ok(())
}

fn draw_msd_curves(path: &Path, analysis: &AnalysisFile) -> DrawResult {
    let settings = &analysis.settings;
    let msd = &analysis.msd;

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let lags = msd
        .individual
        .iter()
        .flat_map(|p| p.curve.lag_time.iter().copied())
        .chain(msd.average.lag_time.iter().copied());
    let values = msd
        .individual
        .iter()
        .flat_map(|p| p.curve.msd.iter().copied())
        .chain(msd.average.msd.iter().copied());

    let mut chart = ChartBuilder::on(&root)
        .caption("MSD curves", ("sans-serif", CAPTION_FONT))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(padded(lags), padded(values))?;

    chart
        .configure_mesh()
        .x_desc(format!("Lag time ({})", settings.time_unit))
        .y_desc(format!("MSD ({})", settings.msd_unit()))
        .label_style(("sans-serif", LABEL_FONT))
        .draw()?;

    for p in &msd.individual {
        chart.draw_series(LineSeries::new(
            p.curve.lag_time.iter().copied().zip(p.curve.msd.iter().copied()),
            RGBColor(160, 160, 160).mix(0.5).stroke_width(1),
        ))?;
    }
    chart
        .draw_series(LineSeries::new(
            msd.average.lag_time.iter().copied().zip(msd.average.msd.iter().copied()),
            BLUE.stroke_width(3),
        ))?
        .label("Average")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(3)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_particle_count(path: &Path, analysis: &AnalysisFile) -> DrawResult {
    let avg = &analysis.msd.average;

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let max_count = avg.count.iter().copied().max().unwrap_or(1) as f64;
    let mut chart = ChartBuilder::on(&root)
        .caption("Particles per lag time", ("sans-serif", CAPTION_FONT))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(padded(avg.lag_time.iter().copied()), 0.0..(max_count * 1.1).max(1.0))?;

    chart
        .configure_mesh()
        .x_desc(format!("Lag time ({})", analysis.settings.time_unit))
        .y_desc("Particles")
        .label_style(("sans-serif", LABEL_FONT))
        .draw()?;

    let series: Vec<(f64, f64)> = avg
        .lag_time
        .iter()
        .zip(&avg.count)
        .map(|(&t, &c)| (t, c as f64))
        .collect();
    chart.draw_series(LineSeries::new(series.iter().copied(), BLUE.stroke_width(2)))?;
    chart.draw_series(series.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))?;

    root.present()?;
    Ok(())
}

fn draw_rdc(path: &Path, analysis: &AnalysisFile) -> DrawResult {
    let rdc = &analysis.msd.rdc;

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Running diffusion coefficient", ("sans-serif", CAPTION_FONT))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(
            padded(rdc.lag_time.iter().copied()),
            padded(rdc.rdc.iter().copied()),
        )?;

    chart
        .configure_mesh()
        .x_desc(format!("Lag time ({})", analysis.settings.time_unit))
        .y_desc(format!("RDC ({})", analysis.settings.diffusion_unit()))
        .label_style(("sans-serif", LABEL_FONT))
        .draw()?;

    let series = rdc.lag_time.iter().copied().zip(rdc.rdc.iter().copied());
    chart.draw_series(LineSeries::new(series.clone(), GREEN.stroke_width(2)))?;
    chart.draw_series(series.map(|p| Circle::new(p, 3, GREEN.filled())))?;

    root.present()?;
    Ok(())
}

fn draw_fit(path: &Path, analysis: &AnalysisFile) -> DrawResult {
    let Some(fit) = &analysis.fit else {
        return Ok(());
    };
    let settings = &analysis.settings;
    let avg = &analysis.msd.average;

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = padded(avg.lag_time.iter().chain(&fit.curve.t).copied());
    let upper = avg.msd.iter().zip(&avg.std).map(|(m, s)| m + s);
    let lower = avg.msd.iter().zip(&avg.std).map(|(m, s)| m - s);
    let y_range = padded(upper.chain(lower).chain(fit.curve.msd.iter().copied()));
    let (y0, y1) = (y_range.start, y_range.end);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} fit (R² = {:.4})", fit.model.display_name(), fit.r_squared),
            ("sans-serif", CAPTION_FONT),
        )
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(format!("Lag time ({})", settings.time_unit))
        .y_desc(format!("MSD ({})", settings.msd_unit()))
        .label_style(("sans-serif", LABEL_FONT))
        .draw()?;

    // ±std band
    let mut band: Vec<(f64, f64)> = avg
        .lag_time
        .iter()
        .zip(avg.msd.iter().zip(&avg.std))
        .map(|(&t, (m, s))| (t, m + s))
        .collect();
    band.extend(
        avg.lag_time
            .iter()
            .zip(avg.msd.iter().zip(&avg.std))
            .rev()
            .map(|(&t, (m, s))| (t, m - s)),
    );
    chart
        .draw_series(std::iter::once(Polygon::new(band, BLUE.mix(0.15))))?
        .label("± std")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.15).filled()));

    chart
        .draw_series(
            avg.lag_time
                .iter()
                .zip(&avg.msd)
                .map(|(&t, &m)| Circle::new((t, m), 3, BLUE.filled())),
        )?
        .label("Average MSD")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));

    chart
        .draw_series(LineSeries::new(
            fit.curve.t.iter().copied().zip(fit.curve.msd.iter().copied()),
            RED.stroke_width(2),
        ))?
        .label(fit.model.equation(analysis.msd.dimension))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    for t in [fit.start_time, fit.end_time] {
        chart.draw_series(LineSeries::new(vec![(t, y0), (t, y1)], BLACK.mix(0.4).stroke_width(1)))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_scaling(path: &Path, analysis: &AnalysisFile) -> DrawResult {
    let Some(scaling) = &analysis.scaling else {
        return Ok(());
    };
    let settings = &analysis.settings;
    let avg = &analysis.msd.average;

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = log_range(avg.lag_time.iter().chain(&scaling.curve.t).copied());
    let y_range = log_range(avg.msd.iter().chain(&scaling.curve.msd).copied());

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "MSD scaling: α = {:.3} ± {:.3} ({})",
                scaling.alpha.value,
                scaling.alpha.err,
                scaling.motion.label()
            ),
            ("sans-serif", CAPTION_FONT),
        )
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range.log_scale(), y_range.log_scale())?;

    chart
        .configure_mesh()
        .x_desc(format!("Lag time ({})", settings.time_unit))
        .y_desc(format!("MSD ({})", settings.msd_unit()))
        .label_style(("sans-serif", LABEL_FONT))
        .draw()?;

    chart
        .draw_series(
            avg.lag_time
                .iter()
                .zip(&avg.msd)
                .filter(|(t, m)| **t > 0.0 && **m > 0.0)
                .map(|(&t, &m)| Circle::new((t, m), 3, BLUE.filled())),
        )?
        .label("Average MSD")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));

    chart
        .draw_series(LineSeries::new(
            scaling.curve.t.iter().copied().zip(scaling.curve.msd.iter().copied()),
            RED.stroke_width(2),
        ))?
        .label(format!("MSD = {:.3e}·t^{:.3}", scaling.k.value, scaling.alpha.value))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_range_handles_constant_values() {
        let r = padded([2.0, 2.0]);
        assert_eq!(r, 1.5..2.5);
        let r = padded([0.0, 10.0]);
        assert!((r.start + 0.5).abs() < 1e-12 && (r.end - 10.5).abs() < 1e-12);
    }

    #[test]
    fn log_range_ignores_non_positive_values() {
        let r = log_range([0.0, -1.0, 1.2, 12.0]);
        assert!((r.start - 1.0).abs() < 1e-12);
        assert!((r.end - 14.4).abs() < 1e-9);
        assert_eq!(log_range([0.0]), 0.1..1.0);
    }
}
