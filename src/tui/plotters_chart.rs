//! Plotters-powered MSD chart widget for Ratatui.
//!
//! Plotters gives axis/tick rendering for free; the output is drawn into the
//! Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct MsdPlottersChart<'a> {
    /// Fitted model curve (line).
    pub curve: &'a [(f64, f64)],
    /// Ensemble-averaged MSD (points).
    pub average: &'a [(f64, f64)],
    /// Mean ± std envelope, drawn as two faint lines.
    pub band: (&'a [(f64, f64)], &'a [(f64, f64)]),
    /// Fit window, drawn as vertical markers.
    pub window: Option<[f64; 2]>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: String,
    pub y_label: String,
}

impl Widget for MsdPlottersChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a tiny chart.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Mesh lines clutter low-resolution cells; axes and labels only.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label.as_str())
                .y_desc(self.y_label.as_str())
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| format_tick(*v))
                .y_label_formatter(&|v| format_tick(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let band_color = RGBColor(90, 90, 90);
            let window_color = RGBColor(255, 200, 0);
            let curve_color = RGBColor(255, 80, 80);
            let points_color = RGBColor(0, 255, 255);

            chart.draw_series(LineSeries::new(self.band.0.iter().copied(), &band_color))?;
            chart.draw_series(LineSeries::new(self.band.1.iter().copied(), &band_color))?;

            if let Some([start, end]) = self.window {
                for x in [start, end] {
                    if (x0..=x1).contains(&x) {
                        chart.draw_series(LineSeries::new([(x, y0), (x, y1)], &window_color))?;
                    }
                }
            }

            chart.draw_series(LineSeries::new(self.curve.iter().copied(), &curve_color))?;

            // `Circle` radii are mis-scaled by the ratatui backend; pixels render cleanly.
            chart.draw_series(self.average.iter().map(|&(x, y)| Pixel::new((x, y), points_color)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

fn format_tick(v: f64) -> String {
    let a = v.abs();
    if a == 0.0 {
        "0".to_string()
    } else if !(1e-2..1e4).contains(&a) {
        format!("{v:.0e}")
    } else if a >= 100.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_switch_to_scientific() {
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_tick(0.5), "0.50");
        assert_eq!(format_tick(250.0), "250");
        assert_eq!(format_tick(0.0001), "1e-4");
    }

    #[test]
    fn tiny_area_renders_hint() {
        let area = Rect::new(0, 0, 10, 4);
        let mut buf = Buffer::empty(Rect::new(0, 0, 60, 4));
        let chart = MsdPlottersChart {
            curve: &[],
            average: &[],
            band: (&[], &[]),
            window: None,
            x_bounds: [0.0, 1.0],
            y_bounds: [0.0, 1.0],
            x_label: "t".to_string(),
            y_label: "MSD".to_string(),
        };
        chart.render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "C");
    }
}
