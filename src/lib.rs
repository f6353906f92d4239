//! `msd-analyzer` library crate.
//!
//! The binary (`msd`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the CLI and the TUI share one analysis pipeline
//!
//! Data flow: [`io::ingest`] loads trajectories, [`msd`] computes per-particle
//! and averaged MSD curves, [`fit`] fits diffusion models and the power-law
//! scaling, and [`report`], [`plot`] and [`io::export`] present the results.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod msd;
pub mod plot;
pub mod report;
pub mod tui;
