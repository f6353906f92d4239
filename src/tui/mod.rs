//! Ratatui-based terminal UI.
//!
//! The TUI shows the particle list (with include/exclude toggles), the averaged
//! MSD with the fitted model, and the fit/scaling summary. Every change re-runs
//! the pipeline from the trajectories loaded at startup.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::app::pipeline::{RunOutput, Stages, run_analysis_with};
use crate::domain::{AnalysisFile, AnalysisSettings};
use crate::error::AppError;
use crate::io::ingest::IngestedData;
use crate::msd::MsdCalculator;
use crate::report::fmt_num;

mod plotters_chart;

use plotters_chart::MsdPlottersChart;

/// R² threshold step for the `+`/`-` keys.
const THRESHOLD_STEP: f64 = 0.01;

/// Start the TUI on already-loaded trajectories.
pub fn run(ingest: IngestedData, settings: AnalysisSettings, output: PathBuf) -> Result<(), AppError> {
    let mut app = App::new(ingest, settings, output);

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::numeric(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::numeric(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::numeric(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    ingest: IngestedData,
    particle_ids: Vec<String>,
    settings: AnalysisSettings,
    /// Excluded ids, kept in particle order.
    excluded: Vec<String>,
    selected: usize,
    output: PathBuf,
    calculator: MsdCalculator,
    run: Option<RunOutput>,
    status: String,
}

impl App {
    fn new(ingest: IngestedData, settings: AnalysisSettings, output: PathBuf) -> Self {
        let particle_ids = ingest.set.ids().map(str::to_string).collect();
        let mut app = Self {
            ingest,
            particle_ids,
            settings,
            excluded: Vec::new(),
            selected: 0,
            output,
            calculator: MsdCalculator::new(),
            run: None,
            status: String::new(),
        };
        app.recompute();
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::numeric(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::numeric(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::numeric(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply a key press; returns `true` when the UI should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected + 1 < self.particle_ids.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('m') => {
                self.settings.model = self.settings.model.next();
                self.recompute();
            }
            KeyCode::Char('a') => self.toggle_auto_fit(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_threshold(THRESHOLD_STEP),
            KeyCode::Char('-') => self.adjust_threshold(-THRESHOLD_STEP),
            KeyCode::Char('s') => self.save(),
            _ => {}
        }
        false
    }

    fn toggle_selected(&mut self) {
        let Some(id) = self.particle_ids.get(self.selected).cloned() else {
            return;
        };
        if let Some(pos) = self.excluded.iter().position(|e| *e == id) {
            self.excluded.remove(pos);
        } else {
            self.excluded.push(id);
            let order = &self.particle_ids;
            self.excluded
                .sort_by_key(|e| order.iter().position(|p| p == e).unwrap_or(usize::MAX));
        }
        self.recompute();
    }

    fn toggle_auto_fit(&mut self) {
        if self.settings.auto_fit {
            // Freeze the window the automatic search picked.
            if let Some(fit) = self.run.as_ref().and_then(RunOutput::fit) {
                self.settings.end_time = fit.end_time;
            }
            self.settings.auto_fit = false;
        } else {
            self.settings.auto_fit = true;
        }
        self.recompute();
    }

    fn adjust_threshold(&mut self, delta: f64) {
        let next = ((self.settings.r_squared_threshold + delta) * 100.0).round() / 100.0;
        self.settings.r_squared_threshold = next.clamp(0.0, 1.0);
        self.recompute();
    }

    fn recompute(&mut self) {
        let result = run_analysis_with(
            &self.calculator,
            &self.ingest,
            &self.settings,
            &self.excluded,
            Stages::default(),
            None,
        );
        match result {
            Ok(Some(run)) => {
                self.status = match (&run.fit_error, &run.scaling_error) {
                    (Some(err), _) => format!("Fit failed: {err}"),
                    (None, Some(err)) => format!("Scaling failed: {err}"),
                    (None, None) => format!(
                        "{} particle(s) analysed",
                        run.analysis.msd.individual.len()
                    ),
                };
                self.run = Some(run);
            }
            Ok(None) => {
                self.status = "Calculation already running.".to_string();
            }
            Err(err) => {
                tracing::debug!(error = %err, "recompute failed");
                self.status = err.to_string();
                self.run = None;
            }
        }
    }

    fn save(&mut self) {
        let Some(run) = &self.run else {
            self.status = "Nothing to save.".to_string();
            return;
        };
        self.status = match crate::app::write_outputs(&self.output, &run.analysis, Some(&self.ingest.set), true, true)
        {
            Ok(written) => format!("Saved {} file(s) to {}", written.len(), self.output.display()),
            Err(err) => format!("Save failed: {err}"),
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let source = self
            .ingest
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let fit_mode = if self.settings.auto_fit {
            format!("auto (R² ≥ {:.2})", self.settings.r_squared_threshold)
        } else {
            format!("manual [{}, {}]", fmt_num(self.settings.start_time), fmt_num(self.settings.end_time))
        };

        let lines = vec![
            Line::from(vec![
                Span::styled("msd", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" - {source} ({})", self.ingest.format.label())),
            ]),
            Line::from(Span::styled(
                format!(
                    "dimension: {} | particles: {} ({} excluded) | model: {} | range: {fit_mode}",
                    self.ingest.set.dimension,
                    self.particle_ids.len(),
                    self.excluded.len(),
                    self.settings.model.display_name(),
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(24), Constraint::Min(0)])
            .split(area);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(9)])
            .split(columns[1]);

        self.draw_particles(frame, columns[0]);
        self.draw_chart(frame, right[0]);
        self.draw_summary(frame, right[1]);
    }

    fn draw_particles(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .particle_ids
            .iter()
            .map(|id| {
                let excluded = self.excluded.contains(id);
                let points = self.ingest.set.get(id).map(|t| t.len()).unwrap_or(0);
                let style = if excluded {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                ListItem::new(format!("[{}] {id} ({points})", if excluded { ' ' } else { 'x' })).style(style)
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Particles").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Average MSD").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(run) = &self.run else {
            let msg = Paragraph::new("No MSD data (check exclusions).")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let series = chart_series(&run.analysis);
        let (chart_rect, insets) = chart_layout(inner);
        let x_label = format!("lag ({})", self.settings.time_unit);
        let y_label = format!("MSD ({})", self.settings.msd_unit());
        let widget = MsdPlottersChart {
            curve: &series.curve,
            average: &series.average,
            band: (&series.lower, &series.upper),
            window: series.window,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: x_label.clone(),
            y_label: y_label.clone(),
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &series, &x_label, &y_label);
        }
    }

    fn draw_summary(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        match self.run.as_ref().and_then(RunOutput::fit) {
            Some(fit) => {
                lines.push(Line::from(format!(
                    "{} fit on [{}, {}] {} ({} points), R² = {:.4}",
                    fit.model.display_name(),
                    fmt_num(fit.start_time),
                    fmt_num(fit.end_time),
                    self.settings.time_unit,
                    fit.n_points,
                    fit.r_squared
                )));
                lines.push(Line::from(format!(
                    "  D = {} ± {} {}",
                    fmt_num(fit.d.value),
                    fmt_num(fit.d.err),
                    self.settings.diffusion_unit()
                )));
                if let Some(v) = &fit.v {
                    lines.push(Line::from(format!(
                        "  V = {} ± {} {}",
                        fmt_num(v.value),
                        fmt_num(v.err),
                        self.settings.velocity_unit()
                    )));
                }
                if let Some(l) = &fit.l {
                    lines.push(Line::from(format!(
                        "  L = {} ± {} {}",
                        fmt_num(l.value),
                        fmt_num(l.err),
                        self.settings.space_unit
                    )));
                }
            }
            None => lines.push(Line::from(Span::styled("No model fit.", Style::default().fg(Color::Yellow)))),
        }
        if let Some(scaling) = self.run.as_ref().and_then(RunOutput::scaling) {
            lines.push(Line::from(format!(
                "α = {} ± {} ({}), K = {}, R² = {:.4}",
                fmt_num(scaling.alpha.value),
                fmt_num(scaling.alpha.err),
                scaling.motion.label(),
                fmt_num(scaling.k.value),
                scaling.r_squared
            )));
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Fit").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  space exclude  m model  a auto/manual  +/- R²  s save  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Plot-ready series derived from an analysis.
#[derive(Debug, Clone, PartialEq)]
struct ChartSeries {
    average: Vec<(f64, f64)>,
    lower: Vec<(f64, f64)>,
    upper: Vec<(f64, f64)>,
    curve: Vec<(f64, f64)>,
    window: Option<[f64; 2]>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_series(analysis: &AnalysisFile) -> ChartSeries {
    let avg = &analysis.msd.average;
    let average: Vec<(f64, f64)> = avg.lag_time.iter().copied().zip(avg.msd.iter().copied()).collect();
    let lower: Vec<(f64, f64)> = average
        .iter()
        .zip(&avg.std)
        .map(|(&(t, m), s)| (t, m - s))
        .collect();
    let upper: Vec<(f64, f64)> = average
        .iter()
        .zip(&avg.std)
        .map(|(&(t, m), s)| (t, m + s))
        .collect();
    let curve: Vec<(f64, f64)> = analysis
        .fit
        .as_ref()
        .map(|f| f.curve.t.iter().copied().zip(f.curve.msd.iter().copied()).collect())
        .unwrap_or_default();
    let window = analysis.fit.as_ref().map(|f| [f.start_time, f.end_time]);

    let x_max = average
        .iter()
        .chain(&curve)
        .map(|&(t, _)| t)
        .fold(f64::NEG_INFINITY, f64::max);
    let x_bounds = if x_max.is_finite() && x_max > 0.0 {
        [0.0, x_max]
    } else {
        [0.0, 1.0]
    };

    // The band is not allowed to stretch the axis below zero.
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in average.iter().chain(&upper).chain(&curve) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    y_min = y_min.min(0.0);
    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        y_min = 0.0;
        y_max = 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

    ChartSeries {
        average,
        lower: lower.into_iter().map(|(t, y)| (t, y.max(y_min))).collect(),
        upper,
        curve,
        window,
        x_bounds,
        y_bounds: [y_min, y_max + pad],
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 9,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    series: &ChartSeries,
    x_label: &str,
    y_label: &str,
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);
    let [x0, x1] = series.x_bounds;
    let [y0, y1] = series.y_bounds;

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let label = fmt_num(x0 + u * (x1 - x0));
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label.clone()).style(style),
            Rect {
                x: start,
                y,
                width: label.chars().count() as u16,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let label = fmt_num(y0 + u * (y1 - y0));
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let width = label.chars().count() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(width);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width,
                height: 1,
            },
        );
    }

    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(
            Paragraph::new(x_label.to_string()).alignment(Alignment::Center).style(style),
            x_rect,
        );
    }

    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width.min(y_label.chars().count() as u16),
        height: 1,
    };
    frame.render_widget(
        Paragraph::new(y_label.to_string()).style(style.add_modifier(Modifier::BOLD)),
        y_rect,
    );
}
