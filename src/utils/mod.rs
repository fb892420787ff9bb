//! Utility functions and shared plumbing.
//!
//! ## Modules
//!
//! - [`app_data`] - Configuration loading and default locations
//! - [`encoding`] - Little-endian offset words and `atol`-style parsing
//! - [`progress`] - Progress bar shim (no-op without the `progress` feature)

pub mod app_data;
pub mod encoding;
pub mod progress;

pub use app_data::*;
pub use encoding::*;
