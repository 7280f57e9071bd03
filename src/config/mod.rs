//! Configuration loading
//!
//! The schema lives in `phenology-core`; this module reads files, expands
//! environment references and validates crop configurations.

pub mod loader;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning};
pub use phenology_core::config::*;
pub use validation::{ValidationResult, Validator};
