//! Numerical building blocks: linear least squares and Levenberg–Marquardt.

pub mod levmar;
pub mod ols;

pub use levmar::*;
pub use ols::*;
