//! Read/write analysis JSON files.
//!
//! Analysis JSON is the portable representation of a finished run:
//! - settings and excluded particles
//! - per-particle and averaged MSD, RDC
//! - model fit and scaling results, with sampled curves for quick plotting
//!
//! The schema is defined by `domain::AnalysisFile`. `msd plot` re-renders
//! figures and tables from it without the raw trajectories.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::Local;

use crate::domain::{AnalysisFile, AnalysisSettings, FitResult, MsdResults, ScalingResult};
use crate::error::AppError;

pub const TOOL_NAME: &str = "msd";

/// Assemble an analysis record stamped with the current time.
pub fn build_analysis(
    source: Option<&Path>,
    settings: &AnalysisSettings,
    excluded: &[String],
    msd: MsdResults,
    fit: Option<FitResult>,
    scaling: Option<ScalingResult>,
) -> AnalysisFile {
    AnalysisFile {
        tool: TOOL_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generated_at: Local::now(),
        source: source.map(Path::to_path_buf),
        settings: settings.clone(),
        excluded_particles: excluded.to_vec(),
        msd,
        fit,
        scaling,
    }
}

/// Write an analysis JSON file.
pub fn write_analysis_json(path: &Path, analysis: &AnalysisFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create analysis JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), analysis)
        .map_err(|e| AppError::input(format!("Failed to write analysis JSON: {e}")))?;
    Ok(())
}

/// Read an analysis JSON file.
pub fn read_analysis_json(path: &Path) -> Result<AnalysisFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open analysis JSON '{}': {e}", path.display())))?;
    let analysis: AnalysisFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::input(format!("Invalid analysis JSON: {e}")))?;
    if analysis.tool != TOOL_NAME {
        tracing::warn!(tool = %analysis.tool, "analysis JSON was written by a different tool");
    }
    analysis.settings.validate()?;
    Ok(analysis)
}
