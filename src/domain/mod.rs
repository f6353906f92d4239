//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - trajectory data (`TrajectoryPoint`, `Trajectory`, `TrajectorySet`)
//! - analysis settings and the diffusion model enum
//! - computed outputs (`MsdResults`, `FitResult`, `ScalingResult`, `AnalysisFile`)

pub mod types;

pub use types::*;
