//! Providers Module - External Data Sources
//!
//! The explorer HTTP client plus the risk data sources built on top of it.
//! Everything that leaves the process lives here.

pub mod explorer;
pub mod sources;

pub use explorer::*;
pub use sources::*;
