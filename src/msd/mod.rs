//! MSD computation: per-particle curves, ensemble average, running diffusion
//! coefficient.

pub mod calculator;

pub use calculator::*;
