//! Model evaluation for the Brownian / drift / confined MSD models.
//!
//! The fitter relies on three primitive operations:
//! - predict `MSD(t)` given the parameter vector (for residuals/plots)
//! - fill the Jacobian row `∂MSD/∂p` (for Levenberg–Marquardt)
//! - choose a starting point from the data
//!
//! Parameter vectors are `[D]` for Brownian motion, `[D, V]` for drift and
//! `[D, L]` for confinement.

use crate::domain::{DiffusionModel, Dimension};

/// Smallest confinement length used when evaluating the confined model.
const MIN_LENGTH: f64 = 1e-12;

/// Predict `MSD(t)`.
pub fn predict(model: DiffusionModel, dim: Dimension, t: f64, params: &[f64]) -> f64 {
    let k = 2.0 * dim.as_f64();
    match model {
        DiffusionModel::Brownian => k * params[0] * t,
        DiffusionModel::Drift => k * params[0] * t + params[1] * params[1] * t * t,
        DiffusionModel::Confined => {
            let l2 = params[1].max(MIN_LENGTH).powi(2);
            l2 * (1.0 - (-k * params[0] * t / l2).exp())
        }
    }
}

/// Fill `out` with the partial derivatives of `MSD(t)` with respect to each
/// parameter.
///
/// # Panics
/// Panics if `out` or `params` is shorter than `model.param_count()`.
pub fn fill_jacobian_row(model: DiffusionModel, dim: Dimension, t: f64, params: &[f64], out: &mut [f64]) {
    let k = 2.0 * dim.as_f64();
    match model {
        DiffusionModel::Brownian => {
            out[0] = k * t;
        }
        DiffusionModel::Drift => {
            out[0] = k * t;
            out[1] = 2.0 * params[1] * t * t;
        }
        DiffusionModel::Confined => {
            let l = params[1].max(MIN_LENGTH);
            let u = k * params[0] * t / (l * l);
            let e = (-u).exp();
            out[0] = k * t * e;
            out[1] = 2.0 * l * (1.0 - e * (1.0 + u));
        }
    }
}

/// Starting parameters for the nonlinear fit.
pub fn initial_guess(model: DiffusionModel, msd: &[f64]) -> Vec<f64> {
    match model {
        DiffusionModel::Brownian => vec![0.01],
        DiffusionModel::Drift => vec![0.01, 0.1],
        DiffusionModel::Confined => {
            let max = msd.iter().copied().fold(0.0_f64, f64::max);
            vec![0.01, max.sqrt()]
        }
    }
}
