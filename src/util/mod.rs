//! Utility types and functions for the material processor.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`io`] - JSON loading and dumping helpers

mod error;
pub mod io;

pub use error::*;
