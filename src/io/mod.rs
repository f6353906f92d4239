//! Input/output helpers.
//!
//! - trajectory CSV ingest + validation (`ingest`)
//! - result exports (CSV) (`export`)
//! - analysis JSON read/write (`session`)

pub mod export;
pub mod ingest;
pub mod session;

pub use export::*;
pub use ingest::*;
pub use session::*;
