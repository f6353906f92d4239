//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - choose the fit window (manual, or automatic from RDC linearity)
//! - fit a diffusion model to the averaged MSD
//! - run the log-log power-law scaling analysis

pub mod fitter;
pub mod grid;
pub mod range;
pub mod scaling;

pub use fitter::*;
pub use grid::*;
pub use range::*;
pub use scaling::*;
