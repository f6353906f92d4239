//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during MSD computation and fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Spatial dimension of the trajectories.
///
/// Serialized as the plain integer `2` or `3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Dimension {
    Two,
    Three,
}

impl Dimension {
    /// Number of position components that enter the displacement.
    pub fn components(self) -> usize {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }

    /// `d` as a float, for the `2·d·D·t` family of expressions.
    pub fn as_f64(self) -> f64 {
        self.components() as f64
    }
}

impl TryFrom<u8> for Dimension {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Dimension::Two),
            3 => Ok(Dimension::Three),
            other => Err(format!("dimension must be 2 or 3, got {other}")),
        }
    }
}

impl From<Dimension> for u8 {
    fn from(value: Dimension) -> Self {
        value.components() as u8
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}D", self.components())
    }
}

/// One observation of a particle position.
///
/// In 2D data `pos[2]` is always `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub t: f64,
    pub pos: [f64; 3],
}

/// The time-ordered track of a single particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: String,
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// All trajectories from one input file, in first-appearance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySet {
    pub dimension: Dimension,
    pub trajectories: Vec<Trajectory>,
}

impl TrajectorySet {
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.trajectories.iter().map(|t| t.id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&Trajectory> {
        self.trajectories.iter().find(|t| t.id == id)
    }

    pub fn total_points(&self) -> usize {
        self.trajectories.iter().map(Trajectory::len).sum()
    }

    /// Trajectories whose id is not listed in `excluded`.
    pub fn active<'a>(&'a self, excluded: &'a [String]) -> impl Iterator<Item = &'a Trajectory> + 'a {
        self.trajectories
            .iter()
            .filter(move |t| !excluded.iter().any(|e| e == &t.id))
    }

    pub fn active_count(&self, excluded: &[String]) -> usize {
        self.active(excluded).count()
    }

    /// Entries of `ids` that name no trajectory in this set.
    pub fn unknown_ids<'a>(&self, ids: &'a [String]) -> Vec<&'a str> {
        ids.iter()
            .filter(|id| self.get(id).is_none())
            .map(String::as_str)
            .collect()
    }
}

/// Diffusion model fitted to the ensemble-averaged MSD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiffusionModel {
    /// Free diffusion: `MSD = 2·d·D·t`.
    Brownian,
    /// Diffusion with constant drift: `MSD = 2·d·D·t + V²·t²`.
    Drift,
    /// Diffusion inside a bounded region: `MSD = L²·(1 - exp(-2·d·D·t / L²))`.
    Confined,
}

impl DiffusionModel {
    pub const ALL: [DiffusionModel; 3] = [
        DiffusionModel::Brownian,
        DiffusionModel::Drift,
        DiffusionModel::Confined,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            DiffusionModel::Brownian => "Brownian Motion",
            DiffusionModel::Drift => "Drift Diffusion",
            DiffusionModel::Confined => "Confined Diffusion",
        }
    }

    /// Number of fitted parameters.
    pub fn param_count(self) -> usize {
        match self {
            DiffusionModel::Brownian => 1,
            DiffusionModel::Drift | DiffusionModel::Confined => 2,
        }
    }

    /// Model equation with the dimension factor substituted.
    pub fn equation(self, dim: Dimension) -> String {
        let k = 2 * dim.components();
        match self {
            DiffusionModel::Brownian => format!("MSD(t) = {k}Dt"),
            DiffusionModel::Drift => format!("MSD(t) = {k}Dt + V²t²"),
            DiffusionModel::Confined => format!("MSD(t) = L²(1 - exp(-{k}Dt/L²))"),
        }
    }

    pub fn next(self) -> Self {
        match self {
            DiffusionModel::Brownian => DiffusionModel::Drift,
            DiffusionModel::Drift => DiffusionModel::Confined,
            DiffusionModel::Confined => DiffusionModel::Brownian,
        }
    }
}

/// Interpretation of the scaling exponent α.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MotionType {
    SubDiffusion,
    Normal,
    SuperDiffusion,
}

impl MotionType {
    pub fn from_alpha(alpha: f64) -> Self {
        if alpha < 0.9 {
            MotionType::SubDiffusion
        } else if alpha > 1.1 {
            MotionType::SuperDiffusion
        } else {
            MotionType::Normal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MotionType::SubDiffusion => "Sub-diffusion (α < 0.9)",
            MotionType::Normal => "Normal Diffusion (α ≈ 1)",
            MotionType::SuperDiffusion => "Super-diffusion (α > 1.1)",
        }
    }
}

/// User-facing analysis settings.
///
/// Loaded from defaults, then an optional TOML file, then CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    pub time_unit: String,
    pub space_unit: String,
    pub model: DiffusionModel,
    /// Choose the fit end time from RDC linearity instead of `end_time`.
    pub auto_fit: bool,
    pub start_time: f64,
    /// Only used when `auto_fit` is false.
    pub end_time: f64,
    /// Minimum R² of the RDC linear fit for a window to qualify.
    pub r_squared_threshold: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            time_unit: "s".to_string(),
            space_unit: "μm".to_string(),
            model: DiffusionModel::Brownian,
            auto_fit: true,
            start_time: 0.0,
            end_time: 10.0,
            r_squared_threshold: 0.95,
        }
    }
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.start_time.is_finite() && self.start_time >= 0.0) {
            return Err(AppError::input(format!(
                "Invalid start time {} (must be finite and >= 0).",
                self.start_time
            )));
        }
        if !self.auto_fit && !(self.end_time.is_finite() && self.end_time > self.start_time) {
            return Err(AppError::input(format!(
                "Invalid end time {} (must be greater than start time {}).",
                self.end_time, self.start_time
            )));
        }
        if !(self.r_squared_threshold.is_finite() && (0.0..=1.0).contains(&self.r_squared_threshold)) {
            return Err(AppError::input(format!(
                "Invalid R² threshold {} (must be within [0, 1]).",
                self.r_squared_threshold
            )));
        }
        if self.time_unit.trim().is_empty() || self.space_unit.trim().is_empty() {
            return Err(AppError::input("Time and space units must not be empty."));
        }
        Ok(())
    }

    /// Unit label for MSD values, e.g. `μm²`.
    pub fn msd_unit(&self) -> String {
        format!("{}²", self.space_unit)
    }

    /// Unit label for diffusion coefficients, e.g. `μm²/s`.
    pub fn diffusion_unit(&self) -> String {
        format!("{}²/{}", self.space_unit, self.time_unit)
    }

    /// Unit label for velocities, e.g. `μm/s`.
    pub fn velocity_unit(&self) -> String {
        format!("{}/{}", self.space_unit, self.time_unit)
    }
}

/// MSD as a function of lag time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MsdCurve {
    pub lag_time: Vec<f64>,
    pub msd: Vec<f64>,
}

impl MsdCurve {
    pub fn len(&self) -> usize {
        self.lag_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lag_time.is_empty()
    }
}

/// MSD curve of one particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleMsd {
    pub particle_id: String,
    pub curve: MsdCurve,
}

/// Ensemble-averaged MSD.
///
/// `std` is the sample standard deviation (denominator `n - 1`) across particles
/// at each lag, `0.0` where only one particle contributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageMsd {
    pub lag_time: Vec<f64>,
    pub msd: Vec<f64>,
    pub std: Vec<f64>,
    pub count: Vec<usize>,
}

impl AverageMsd {
    pub fn len(&self) -> usize {
        self.lag_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lag_time.is_empty()
    }
}

/// Running diffusion coefficient, `d(MSD)/dt / (2·d)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RdcCurve {
    pub lag_time: Vec<f64>,
    pub rdc: Vec<f64>,
}

/// Output of the MSD calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsdResults {
    pub dimension: Dimension,
    pub individual: Vec<ParticleMsd>,
    pub average: AverageMsd,
    pub rdc: RdcCurve,
}

/// A fitted parameter with its standard error and 95% confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamEstimate {
    pub value: f64,
    pub err: f64,
    pub ci: [f64; 2],
}

/// z-value for a two-sided 95% normal confidence interval.
pub const Z_95: f64 = 1.96;

impl ParamEstimate {
    pub fn new(value: f64, err: f64) -> Self {
        Self {
            value,
            err,
            ci: [value - Z_95 * err, value + Z_95 * err],
        }
    }
}

/// A sampled model curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub t: Vec<f64>,
    pub msd: Vec<f64>,
}

/// Result of fitting a diffusion model to the averaged MSD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model: DiffusionModel,
    /// Diffusion coefficient.
    pub d: ParamEstimate,
    /// Drift velocity (drift model only).
    pub v: Option<ParamEstimate>,
    /// Confinement length (confined model only).
    pub l: Option<ParamEstimate>,
    pub r_squared: f64,
    pub start_time: f64,
    pub end_time: f64,
    /// Number of lag times inside the fit window.
    pub n_points: usize,
    pub curve: CurveGrid,
}

/// Power-law fit `MSD = K·t^α` on log-log axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingResult {
    pub alpha: ParamEstimate,
    pub k: ParamEstimate,
    pub r_squared: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub n_points: usize,
    pub motion: MotionType,
    pub curve: CurveGrid,
}

/// A saved analysis (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFile {
    pub tool: String,
    pub version: String,
    pub generated_at: DateTime<Local>,
    pub source: Option<PathBuf>,
    pub settings: AnalysisSettings,
    pub excluded_particles: Vec<String>,
    pub msd: MsdResults,
    pub fit: Option<FitResult>,
    pub scaling: Option<ScalingResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(ids: &[&str]) -> TrajectorySet {
        TrajectorySet {
            dimension: Dimension::Two,
            trajectories: ids
                .iter()
                .map(|id| Trajectory {
                    id: id.to_string(),
                    points: vec![TrajectoryPoint { t: 0.0, pos: [0.0; 3] }],
                })
                .collect(),
        }
    }

    #[test]
    fn motion_type_thresholds() {
        assert_eq!(MotionType::from_alpha(0.5), MotionType::SubDiffusion);
        assert_eq!(MotionType::from_alpha(0.9), MotionType::Normal);
        assert_eq!(MotionType::from_alpha(1.1), MotionType::Normal);
        assert_eq!(MotionType::from_alpha(1.6), MotionType::SuperDiffusion);
    }

    #[test]
    fn active_skips_excluded_ids() {
        let set = set_of(&["1", "2", "3"]);
        let excluded = vec!["2".to_string()];
        let ids: Vec<&str> = set.active(&excluded).map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(set.active_count(&excluded), 2);
    }

    #[test]
    fn dimension_serializes_as_integer() {
        let json = serde_json::to_string(&Dimension::Three).unwrap();
        assert_eq!(json, "3");
        let back: Dimension = serde_json::from_str("2").unwrap();
        assert_eq!(back, Dimension::Two);
        assert!(serde_json::from_str::<Dimension>("4").is_err());
    }

    #[test]
    fn settings_validation_rejects_bad_threshold() {
        let settings = AnalysisSettings {
            r_squared_threshold: 1.5,
            ..AnalysisSettings::default()
        };
        assert_eq!(settings.validate().unwrap_err().exit_code(), 2);
    }

    #[test]
    fn manual_end_must_follow_start() {
        let settings = AnalysisSettings {
            auto_fit: false,
            start_time: 2.0,
            end_time: 1.0,
            ..AnalysisSettings::default()
        };
        assert!(settings.validate().is_err());
        assert!(AnalysisSettings::default().validate().is_ok());
    }

    #[test]
    fn equation_substitutes_dimension() {
        assert_eq!(DiffusionModel::Brownian.equation(Dimension::Two), "MSD(t) = 4Dt");
        assert_eq!(DiffusionModel::Drift.equation(Dimension::Three), "MSD(t) = 6Dt + V²t²");
    }
}
