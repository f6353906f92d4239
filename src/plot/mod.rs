//! Plotting: terminal ASCII plots and SVG report figures.

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;
