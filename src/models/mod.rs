//! Models Module - Data Structures & Configuration
//!
//! Single source of truth for the engine's data types, errors and
//! configuration. No other module defines domain structures.

pub mod address;
pub mod config;
pub mod errors;
pub mod types;

pub use address::*;
pub use config::*;
pub use errors::*;
pub use types::*;
