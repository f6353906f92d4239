//! Command-line parsing for the MSD analyzer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the analysis code. Every analysis flag is optional so that
//! unset flags fall through to the settings file and built-in defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{AnalysisSettings, DiffusionModel, Dimension};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "msd", version, about = "Mean squared displacement analysis for particle trajectories")]
pub struct Cli {
    /// TOML settings file (falls back to ./msd.toml).
    #[arg(long, global = true, value_name = "TOML", env = crate::config::CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Suppress the progress bar.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute MSDs, fit a diffusion model, print the summary and optionally export.
    Analyze(AnalyzeArgs),
    /// Re-render tables, plots and figures from a saved analysis JSON.
    Plot(PlotArgs),
    /// Generate synthetic random-walk trajectories as CSV.
    Simulate(SimulateArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same underlying pipeline as `msd analyze`, but renders
    /// results in a terminal UI using Ratatui.
    Tui(TuiArgs),
}

/// Analysis settings overrides shared by `analyze` and `tui`.
#[derive(Debug, Args, Clone, Default)]
pub struct SettingsArgs {
    /// Time unit label (e.g. s, ms).
    #[arg(long)]
    pub time_unit: Option<String>,

    /// Space unit label (e.g. μm, nm).
    #[arg(long)]
    pub space_unit: Option<String>,

    /// Diffusion model to fit.
    #[arg(short = 'm', long, value_enum)]
    pub model: Option<DiffusionModel>,

    /// Start of the fit window.
    #[arg(long)]
    pub start_time: Option<f64>,

    /// End of the fit window (switches to manual range selection).
    #[arg(long)]
    pub end_time: Option<f64>,

    /// Choose the fit end automatically from RDC linearity.
    #[arg(long, conflicts_with = "end_time")]
    pub auto_fit: bool,

    /// Minimum R² of the RDC line for automatic range selection.
    #[arg(long = "r2-threshold")]
    pub r_squared_threshold: Option<f64>,
}

impl SettingsArgs {
    /// Overlay the flags that were given onto `settings`.
    pub fn apply(&self, settings: &mut AnalysisSettings) {
        if let Some(v) = &self.time_unit {
            settings.time_unit = v.clone();
        }
        if let Some(v) = &self.space_unit {
            settings.space_unit = v.clone();
        }
        if let Some(m) = self.model {
            settings.model = m;
        }
        if let Some(v) = self.start_time {
            settings.start_time = v;
        }
        if let Some(v) = self.end_time {
            settings.end_time = v;
            settings.auto_fit = false;
        }
        if self.auto_fit {
            settings.auto_fit = true;
        }
        if let Some(v) = self.r_squared_threshold {
            settings.r_squared_threshold = v;
        }
    }
}

/// Options for `msd analyze`.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Trajectory CSV or Excel workbook (prompted for when omitted).
    #[arg(short = 'f', long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Particle ids to leave out (comma separated or repeated).
    #[arg(short = 'x', long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Skip the diffusion model fit.
    #[arg(long)]
    pub no_fit: bool,

    /// Skip the power-law scaling analysis.
    #[arg(long)]
    pub no_scaling: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Terminal plot on log-log axes.
    #[arg(long)]
    pub log: bool,

    /// Plot width (columns).
    #[arg(long)]
    pub width: Option<usize>,

    /// Plot height (rows).
    #[arg(long)]
    pub height: Option<usize>,

    /// Write CSV exports and analysis JSON into this directory.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Also write SVG figures (into `<output>/figures`).
    #[arg(long, requires = "output")]
    pub figures: bool,

    /// Also write figures and a Markdown report into the output directory.
    #[arg(long, requires = "output")]
    pub report: bool,
}

/// Options for plotting a saved analysis.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Analysis JSON written by `msd analyze --output`.
    #[arg(value_name = "JSON")]
    pub analysis: PathBuf,

    /// Plot width (columns).
    #[arg(long)]
    pub width: Option<usize>,

    /// Plot height (rows).
    #[arg(long)]
    pub height: Option<usize>,

    /// Terminal plot on log-log axes.
    #[arg(long)]
    pub log: bool,

    /// Write SVG figures (and a Markdown report) into this directory.
    #[arg(long, value_name = "DIR")]
    pub figures: Option<PathBuf>,
}

/// Options for `msd simulate`.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,

    /// Number of particles.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub particles: usize,

    /// Shortest track (frames).
    #[arg(long, default_value_t = 50)]
    pub min_len: usize,

    /// Longest track (frames).
    #[arg(long, default_value_t = 100)]
    pub max_len: usize,

    /// Frame interval.
    #[arg(long, default_value_t = 0.1)]
    pub dt: f64,

    /// Diffusion coefficient.
    #[arg(short = 'D', long, default_value_t = 0.5)]
    pub diffusion: f64,

    /// Drift velocity components, e.g. `0.2,0`.
    #[arg(long, value_delimiter = ',', num_args = 1..=3)]
    pub drift: Vec<f64>,

    /// Radius of a reflecting boundary around each start point.
    #[arg(long)]
    pub confinement: Option<f64>,

    /// Spatial dimension (2 or 3).
    #[arg(short = 'd', long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(2..=3))]
    pub dimension: u8,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl SimulateArgs {
    pub fn to_config(&self) -> crate::data::SimulationConfig {
        let mut drift = [0.0; 3];
        for (slot, v) in drift.iter_mut().zip(&self.drift) {
            *slot = *v;
        }
        crate::data::SimulationConfig {
            particles: self.particles,
            min_len: self.min_len,
            max_len: self.max_len,
            dt: self.dt,
            diffusion: self.diffusion,
            drift,
            confinement_radius: self.confinement,
            dimension: if self.dimension == 3 { Dimension::Three } else { Dimension::Two },
            seed: self.seed,
        }
    }
}

/// Options for the TUI.
#[derive(Debug, Parser, Clone)]
pub struct TuiArgs {
    /// Trajectory CSV or Excel workbook (prompted for when omitted).
    #[arg(short = 'f', long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Directory used by the `s` (save) key.
    #[arg(short = 'o', long, value_name = "DIR", default_value = "msd_output")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_time_switches_to_manual() {
        let cli = Cli::parse_from(["msd", "analyze", "-f", "t.csv", "--end-time", "3.5", "-m", "drift"]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let mut settings = AnalysisSettings::default();
        args.settings.apply(&mut settings);
        assert!(!settings.auto_fit);
        assert_eq!(settings.end_time, 3.5);
        assert_eq!(settings.model, DiffusionModel::Drift);
        assert_eq!(settings.time_unit, "s");
    }

    #[test]
    fn exclude_accepts_comma_lists() {
        let cli = Cli::parse_from(["msd", "analyze", "-x", "3,5", "-x", "9"]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.exclude, vec!["3", "5", "9"]);
    }

    #[test]
    fn simulate_rejects_dimension_four() {
        assert!(Cli::try_parse_from(["msd", "simulate", "-o", "x.csv", "-d", "4"]).is_err());
        let cli = Cli::try_parse_from(["msd", "simulate", "-o", "x.csv", "--drift", "0.5,0.1"]).unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.to_config().drift, [0.5, 0.1, 0.0]);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["msd", "plot", "a.json", "--quiet", "--config", "c.toml"]);
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }

    #[test]
    fn config_flag_reads_environment() {
        use clap::CommandFactory;
        let cmd = Cli::command();
        let arg = cmd.get_arguments().find(|a| a.get_id() == "config").unwrap();
        assert_eq!(arg.get_env(), Some(std::ffi::OsStr::new("MSD_CONFIG")));
    }
}
