//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - averaged MSD: `o`
//! - fitted model curve: `-` line
//!
//! In log-log mode both axes are `log10`; non-positive samples are skipped.

use crate::domain::{AnalysisSettings, AverageMsd, CurveGrid};

/// Render the averaged MSD with an optional fitted curve.
pub fn render_msd_plot(
    average: &AverageMsd,
    fit_curve: Option<&CurveGrid>,
    settings: &AnalysisSettings,
    width: usize,
    height: usize,
    log_scale: bool,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let project = |t: f64, m: f64| -> Option<(f64, f64)> {
        if log_scale {
            (t > 0.0 && m > 0.0).then(|| (t.log10(), m.log10()))
        } else {
            (t.is_finite() && m.is_finite()).then_some((t, m))
        }
    };

    let points: Vec<(f64, f64)> = average
        .lag_time
        .iter()
        .zip(&average.msd)
        .filter_map(|(&t, &m)| project(t, m))
        .collect();
    let curve: Vec<(f64, f64)> = fit_curve
        .map(|c| c.t.iter().zip(&c.msd).filter_map(|(&t, &m)| project(t, m)).collect())
        .unwrap_or_default();

    let Some((x_min, x_max)) = span(points.iter().chain(&curve).map(|p| p.0)) else {
        return "Plot: not enough data to draw.\n".to_string();
    };
    let (y_min, y_max) = span(points.iter().chain(&curve).map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so the data points overlay it.
    let mut prev = None;
    for &(x, y) in &curve {
        let cell = (map_x(x, x_min, x_max, width), map_y(y, y_min, y_max, height));
        match prev {
            Some(p) => draw_line(&mut grid, p, cell, '-'),
            None => grid[cell.1][cell.0] = '-',
        }
        prev = Some(cell);
    }

    for &(x, y) in &points {
        grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = 'o';
    }

    let mut out = String::new();
    if log_scale {
        out.push_str(&format!(
            "Plot (log-log): log10 lag=[{x_min:.3}, {x_max:.3}] {} | log10 MSD=[{y_min:.3}, {y_max:.3}] {}\n",
            settings.time_unit,
            settings.msd_unit()
        ));
    } else {
        out.push_str(&format!(
            "Plot: lag=[{x_min:.3}, {x_max:.3}] {} | MSD=[{y_min:.3}, {y_max:.3}] {}\n",
            settings.time_unit,
            settings.msd_unit()
        ));
    }

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (lo.is_finite() && hi.is_finite() && hi > lo).then_some((lo, hi))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let pad = ((max - min).abs() * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top of the plot.
    (height as f64 - 1.0 - u * (height as f64 - 1.0)).round() as usize
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char) {
    let (mut x, mut y) = (from.0 as isize, from.1 as isize);
    let (x1, y1) = (to.0 as isize, to.1 as isize);

    let dx = (x1 - x).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let dy = -(y1 - y).abs();
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid.get_mut(y as usize).and_then(|row| row.get_mut(x as usize)) {
            if *cell == ' ' {
                *cell = ch;
            }
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
