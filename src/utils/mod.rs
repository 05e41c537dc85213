//! Utils Module - Helper Functions & Shared Utilities
//!
//! Shared constants and the telemetry collector. Single source of truth
//! for anything more than one module needs.

pub mod constants;
pub mod telemetry;

pub use constants::*;
pub use telemetry::*;
