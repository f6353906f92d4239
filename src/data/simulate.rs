//! Synthetic trajectory generation.
//!
//! Each particle performs a random walk with Gaussian steps of variance
//! `2·D·dt` per axis, optionally with a constant drift velocity and a
//! reflecting circular (2D) or spherical (3D) boundary. Useful for trying the
//! pipeline without real data and for checking that fits recover known
//! parameters.

use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Dimension, Trajectory, TrajectoryPoint, TrajectorySet};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub particles: usize,
    pub min_len: usize,
    pub max_len: usize,
    /// Frame interval.
    pub dt: f64,
    /// Diffusion coefficient.
    pub diffusion: f64,
    /// Constant drift velocity (per axis; z ignored in 2D).
    pub drift: [f64; 3],
    /// Radius of a reflecting boundary centred on each particle's start.
    pub confinement_radius: Option<f64>,
    pub dimension: Dimension,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particles: 20,
            min_len: 50,
            max_len: 100,
            dt: 0.1,
            diffusion: 0.5,
            drift: [0.0; 3],
            confinement_radius: None,
            dimension: Dimension::Two,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.particles == 0 {
            return Err(AppError::input("Particle count must be > 0."));
        }
        if self.min_len < 2 || self.max_len < self.min_len {
            return Err(AppError::input(format!(
                "Invalid track length range [{}, {}] (need 2 <= min <= max).",
                self.min_len, self.max_len
            )));
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(AppError::input("Frame interval must be finite and > 0."));
        }
        if !(self.diffusion.is_finite() && self.diffusion >= 0.0) {
            return Err(AppError::input("Diffusion coefficient must be finite and >= 0."));
        }
        if self.drift.iter().any(|v| !v.is_finite()) {
            return Err(AppError::input("Drift velocity must be finite."));
        }
        if let Some(r) = self.confinement_radius {
            if !(r.is_finite() && r > 0.0) {
                return Err(AppError::input("Confinement radius must be finite and > 0."));
            }
        }
        Ok(())
    }
}

/// Generate a reproducible set of random-walk trajectories.
pub fn generate_trajectories(config: &SimulationConfig) -> Result<TrajectorySet, AppError> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let sigma = (2.0 * config.diffusion * config.dt).sqrt();
    let step = Normal::new(0.0, sigma).map_err(|e| AppError::numeric(format!("Step distribution error: {e}")))?;
    let dims = config.dimension.components();

    let mut trajectories = Vec::with_capacity(config.particles);
    for p in 0..config.particles {
        let len = rng.gen_range(config.min_len..=config.max_len);
        let origin = [
            rng.gen_range(0.0..10.0),
            rng.gen_range(0.0..10.0),
            if dims == 3 { rng.gen_range(0.0..10.0) } else { 0.0 },
        ];

        let mut offset = [0.0_f64; 3];
        let mut points = Vec::with_capacity(len);
        for i in 0..len {
            if i > 0 {
                for (k, o) in offset.iter_mut().enumerate().take(dims) {
                    *o += step.sample(&mut rng) + config.drift[k] * config.dt;
                }
                if let Some(radius) = config.confinement_radius {
                    reflect(&mut offset, radius);
                }
            }
            points.push(TrajectoryPoint {
                t: i as f64 * config.dt,
                pos: [origin[0] + offset[0], origin[1] + offset[1], origin[2] + offset[2]],
            });
        }

        trajectories.push(Trajectory {
            id: (p + 1).to_string(),
            points,
        });
    }

    tracing::info!(
        particles = config.particles,
        seed = config.seed,
        dimension = %config.dimension,
        "simulated trajectories"
    );
    Ok(TrajectorySet {
        dimension: config.dimension,
        trajectories,
    })
}

/// Mirror a point that left the ball of `radius` back inside.
fn reflect(offset: &mut [f64; 3], radius: f64) {
    let r = offset.iter().map(|v| v * v).sum::<f64>().sqrt();
    if r <= radius {
        return;
    }
    // Mirror across the boundary; clamp if the step overshot by more than a diameter.
    let mirrored = (2.0 * radius - r).max(0.0);
    let scale = mirrored / r;
    for v in offset.iter_mut() {
        *v *= scale;
    }
}

/// Write trajectories as `particle_id,t,x,y[,z]` CSV.
pub fn write_trajectories_csv(path: &Path, set: &TrajectorySet) -> Result<(), AppError> {
    let mut w = csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", path.display())))?;
    let write_err = |e: csv::Error| AppError::input(format!("Failed to write '{}': {e}", path.display()));

    let three = set.dimension == Dimension::Three;
    let header: &[&str] = if three {
        &["particle_id", "t", "x", "y", "z"]
    } else {
        &["particle_id", "t", "x", "y"]
    };
    w.write_record(header).map_err(write_err)?;

    for track in &set.trajectories {
        for p in &track.points {
            let mut row = vec![
                track.id.clone(),
                p.t.to_string(),
                p.pos[0].to_string(),
                p.pos[1].to_string(),
            ];
            if three {
                row.push(p.pos[2].to_string());
            }
            w.write_record(&row).map_err(write_err)?;
        }
    }

    w.flush()
        .map_err(|e| AppError::input(format!("Failed to write '{}': {e}", path.display())))?;
    tracing::info!(path = %path.display(), particles = set.len(), "trajectories written");
    Ok(())
}
