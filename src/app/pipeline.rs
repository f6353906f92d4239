//! Shared analysis pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! trajectories -> MSD/RDC -> fit range -> model fit -> scaling -> analysis record
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use crate::domain::{AnalysisFile, AnalysisSettings, FitResult, ScalingResult};
use crate::error::AppError;
use crate::io::ingest::IngestedData;
use crate::msd::{MsdCalculator, Progress};

/// Which optional stages to run after the MSD computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stages {
    pub fit: bool,
    pub scaling: bool,
}

impl Default for Stages {
    fn default() -> Self {
        Self {
            fit: true,
            scaling: true,
        }
    }
}

/// All computed outputs of a single analysis run.
///
/// The MSD results, fit and scaling live inside `analysis` so they are
/// serialized exactly as computed.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub analysis: AnalysisFile,
    /// Set when the fit stage ran and failed; the MSD results are still valid.
    pub fit_error: Option<AppError>,
    pub scaling_error: Option<AppError>,
}

impl RunOutput {
    pub fn fit(&self) -> Option<&FitResult> {
        self.analysis.fit.as_ref()
    }

    pub fn scaling(&self) -> Option<&ScalingResult> {
        self.analysis.scaling.as_ref()
    }
}

/// Execute the full pipeline with a fresh calculator.
pub fn run_analysis(
    ingest: &IngestedData,
    settings: &AnalysisSettings,
    excluded: &[String],
    stages: Stages,
    progress: Option<Progress<'_>>,
) -> Result<RunOutput, AppError> {
    let calculator = MsdCalculator::new();
    run_analysis_with(&calculator, ingest, settings, excluded, stages, progress)?
        .ok_or_else(|| AppError::numeric("MSD computation is already running."))
}

/// Execute the pipeline on a shared calculator.
///
/// Returns `Ok(None)` when the calculator is busy with another run.
pub fn run_analysis_with(
    calculator: &MsdCalculator,
    ingest: &IngestedData,
    settings: &AnalysisSettings,
    excluded: &[String],
    stages: Stages,
    progress: Option<Progress<'_>>,
) -> Result<Option<RunOutput>, AppError> {
    settings.validate()?;

    // 1) MSD, ensemble average and RDC.
    let Some(msd) = calculator.calculate(&ingest.set, excluded, progress)? else {
        return Ok(None);
    };

    // 2) Model fit. Failures here do not invalidate the MSD results.
    let (fit, fit_error) = if stages.fit {
        match crate::fit::fit_msd(&msd, settings) {
            Ok(fit) => (Some(fit), None),
            Err(err) => {
                tracing::debug!(error = %err, "model fit failed");
                (None, Some(err))
            }
        }
    } else {
        (None, None)
    };

    // 3) Scaling analysis over the fit window (or its own window without a fit).
    let (scaling, scaling_error) = if stages.scaling {
        match crate::fit::analyze_scaling(&msd, settings, fit.as_ref()) {
            Ok(scaling) => (Some(scaling), None),
            Err(err) => {
                tracing::debug!(error = %err, "scaling analysis failed");
                (None, Some(err))
            }
        }
    } else {
        (None, None)
    };

    if let Some(progress) = progress {
        progress(100, "Done");
    }

    tracing::info!(
        particles = msd.individual.len(),
        lags = msd.average.len(),
        fitted = fit.is_some(),
        "analysis complete"
    );

    // Only ids that exist in the data are recorded as excluded.
    let unknown = ingest.set.unknown_ids(excluded);
    let recorded: Vec<String> = excluded
        .iter()
        .filter(|id| !unknown.contains(&id.as_str()))
        .cloned()
        .collect();

    let analysis = crate::io::session::build_analysis(
        ingest.path.as_deref(),
        settings,
        &recorded,
        msd,
        fit,
        scaling,
    );

    Ok(Some(RunOutput {
        analysis,
        fit_error,
        scaling_error,
    }))
}
