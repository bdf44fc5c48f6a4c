//! Cutsync Common Utilities
//!
//! Shared infrastructure for all Cutsync crates:
//! - Error types and result aliases
//! - SMPTE timecode conversion (drop-frame and non-drop)
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod timecode;

pub use config::*;
pub use error::*;
