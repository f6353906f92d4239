//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and layers the settings file under them
//! - loads trajectories and runs the MSD/fit pipeline
//! - prints reports/plots
//! - writes optional exports, figures and the Markdown report

use std::path::{Path, PathBuf};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{AnalyzeArgs, Command, PlotArgs, SettingsArgs, SimulateArgs, TuiArgs};
use crate::config::ConfigFile;
use crate::domain::{AnalysisFile, AnalysisSettings};
use crate::error::AppError;
use crate::report::DatasetSummary;

pub mod pipeline;

/// Subdirectory of the output directory that receives SVG figures.
pub const FIGURES_DIR: &str = "figures";

/// Entry point for the `msd` binary.
pub fn run() -> Result<(), AppError> {
    // We want `msd` and `msd -f tracks.csv` to behave like `msd tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let (config, source) = crate::config::load_config(cli.config.as_deref())?;
    tracing::debug!(?source, "settings resolved");

    match cli.command {
        Command::Analyze(args) => handle_analyze(args, &config, cli.quiet),
        Command::Plot(args) => handle_plot(args, &config),
        Command::Simulate(args) => handle_simulate(args),
        Command::Tui(args) => handle_tui(args, &config),
    }
}

/// Defaults < settings file < CLI flags, validated.
pub fn merge_settings(config: &ConfigFile, args: &SettingsArgs) -> Result<AnalysisSettings, AppError> {
    let mut settings = config.analysis.clone();
    args.apply(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn resolve_input(file: Option<PathBuf>) -> Result<PathBuf, AppError> {
    match file {
        Some(path) => crate::cli::picker::validate_trajectory_path(&path),
        None => crate::cli::picker::prompt_for_trajectory_path(),
    }
}

fn handle_analyze(args: AnalyzeArgs, config: &ConfigFile, quiet: bool) -> Result<(), AppError> {
    let settings = merge_settings(config, &args.settings)?;
    let path = resolve_input(args.file.clone())?;
    let ingest = crate::io::ingest::load_trajectories(&path)?;
    for row in ingest.row_errors.iter().take(5) {
        tracing::warn!(line = row.line, "{}", row.message);
    }
    for id in ingest.set.unknown_ids(&args.exclude) {
        tracing::warn!(particle = id, "excluded particle id not found in data");
    }

    let stages = pipeline::Stages {
        fit: !args.no_fit,
        scaling: !args.no_scaling,
    };

    let bar = (!quiet && config.display.progress).then(create_progress_bar);
    let report = |pct: u8, msg: &str| {
        if let Some(bar) = &bar {
            bar.set_position(u64::from(pct));
            bar.set_message(msg.to_string());
        }
    };
    let run = pipeline::run_analysis(&ingest, &settings, &args.exclude, stages, Some(&report));
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    let run = run?;

    let analysis = &run.analysis;
    println!(
        "{}",
        crate::report::format_run_summary(
            &DatasetSummary::from_ingest(&ingest, &args.exclude),
            &settings,
            &analysis.msd,
            run.fit(),
            run.scaling(),
        )
    );
    if let Some(err) = &run.fit_error {
        println!("Fit failed: {err}");
    }
    if let Some(err) = &run.scaling_error {
        println!("Scaling analysis failed: {err}");
    }

    if !args.no_plot {
        let plot = crate::plot::render_msd_plot(
            &analysis.msd.average,
            run.fit().map(|f| &f.curve),
            &settings,
            args.width.unwrap_or(config.display.plot_width),
            args.height.unwrap_or(config.display.plot_height),
            args.log || config.display.log_scale,
        );
        println!("{plot}");
    }

    if let Some(dir) = &args.output {
        let written = write_outputs(dir, analysis, Some(&ingest.set), args.figures || args.report, args.report)?;
        println!("Wrote {} file(s) to {}", written.len(), dir.display());
    }

    Ok(())
}

/// Write CSV/JSON exports and, optionally, figures and the Markdown report.
pub fn write_outputs(
    dir: &Path,
    analysis: &AnalysisFile,
    set: Option<&crate::domain::TrajectorySet>,
    figures: bool,
    report: bool,
) -> Result<Vec<PathBuf>, AppError> {
    let mut written = crate::io::export::export_all(dir, analysis)?;
    if figures || report {
        let rendered = crate::plot::render_figures(&dir.join(FIGURES_DIR), analysis, set)?;
        written.extend(rendered.iter().map(|f| f.path.clone()));
        if report {
            written.push(crate::report::write_markdown_report(dir, analysis, &rendered)?);
        }
    }
    Ok(written)
}

fn handle_plot(args: PlotArgs, config: &ConfigFile) -> Result<(), AppError> {
    let analysis = crate::io::session::read_analysis_json(&args.analysis)?;

    println!(
        "{}",
        crate::report::format_run_summary(
            &DatasetSummary::from_analysis(&analysis),
            &analysis.settings,
            &analysis.msd,
            analysis.fit.as_ref(),
            analysis.scaling.as_ref(),
        )
    );

    let plot = crate::plot::render_msd_plot(
        &analysis.msd.average,
        analysis.fit.as_ref().map(|f| &f.curve),
        &analysis.settings,
        args.width.unwrap_or(config.display.plot_width),
        args.height.unwrap_or(config.display.plot_height),
        args.log || config.display.log_scale,
    );
    println!("{plot}");

    if let Some(dir) = &args.figures {
        let figures = crate::plot::render_figures(dir, &analysis, None)?;
        let report = crate::report::write_markdown_report(dir, &analysis, &figures)?;
        println!("Wrote {} figure(s) and {}", figures.len(), report.display());
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let set = crate::data::generate_trajectories(&args.to_config())?;
    crate::data::write_trajectories_csv(&args.output, &set)?;
    println!(
        "Wrote {} trajectories ({} points) to {}",
        set.len(),
        set.total_points(),
        args.output.display()
    );
    Ok(())
}

fn handle_tui(args: TuiArgs, config: &ConfigFile) -> Result<(), AppError> {
    let settings = merge_settings(config, &args.settings)?;
    let path = resolve_input(args.file.clone())?;
    let ingest = crate::io::ingest::load_trajectories(&path)?;
    crate::tui::run(ingest, settings, args.output)
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);
    pb
}

/// Rewrite argv so `msd` defaults to `msd tui`.
///
/// Rules:
/// - `msd`                       -> `msd tui`
/// - `msd -f tracks.csv ...`     -> `msd tui -f tracks.csv ...`
/// - `msd --help/--version/-h`   -> unchanged (show top-level help/version)
///
/// Global flags (`--config <path>`, `-q`) may precede the subcommand, so they
/// are skipped before looking at the first real token.
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let mut idx = 1;
    while let Some(arg) = argv.get(idx) {
        match arg.as_str() {
            "--config" => idx += 2,
            "-q" | "--quiet" => idx += 1,
            a if a.starts_with("--config=") => idx += 1,
            _ => break,
        }
    }

    let Some(first) = argv.get(idx) else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        first.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    let is_subcommand = matches!(first.as_str(), "analyze" | "plot" | "simulate" | "tui");
    if is_top_level_help_or_version || is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if first.starts_with('-') {
        argv.insert(idx, "tui".to_string());
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(args(&["msd"])), args(&["msd", "tui"]));
        assert_eq!(
            rewrite_args(args(&["msd", "-f", "a.csv"])),
            args(&["msd", "tui", "-f", "a.csv"])
        );
    }

    #[test]
    fn subcommands_and_help_untouched() {
        for argv in [
            args(&["msd", "analyze", "-f", "a.csv"]),
            args(&["msd", "--help"]),
            args(&["msd", "simulate", "-o", "x.csv"]),
        ] {
            assert_eq!(rewrite_args(argv.clone()), argv);
        }
    }

    #[test]
    fn leading_global_flags_keep_the_subcommand() {
        let argv = args(&["msd", "--config", "c.toml", "analyze", "-f", "a.csv"]);
        assert_eq!(rewrite_args(argv.clone()), argv);
        let cli = crate::cli::Cli::try_parse_from(rewrite_args(argv)).unwrap();
        assert!(matches!(cli.command, Command::Analyze(_)));
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));

        assert_eq!(
            rewrite_args(args(&["msd", "-q", "--config=c.toml", "-f", "a.csv"])),
            args(&["msd", "-q", "--config=c.toml", "tui", "-f", "a.csv"])
        );
        assert_eq!(
            rewrite_args(args(&["msd", "--config", "c.toml"])),
            args(&["msd", "--config", "c.toml", "tui"])
        );
    }

    #[test]
    fn cli_flags_override_settings_file() {
        let config = crate::config::parse_config("[analysis]\nmodel = \"drift\"\nspace_unit = \"nm\"\n").unwrap();
        let flags = SettingsArgs {
            space_unit: Some("px".to_string()),
            ..SettingsArgs::default()
        };
        let settings = merge_settings(&config, &flags).unwrap();
        assert_eq!(settings.space_unit, "px");
        assert_eq!(settings.model, crate::domain::DiffusionModel::Drift);
    }

    #[test]
    fn merged_settings_are_validated() {
        let flags = SettingsArgs {
            r_squared_threshold: Some(1.5),
            ..SettingsArgs::default()
        };
        let err = merge_settings(&ConfigFile::default(), &flags).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
