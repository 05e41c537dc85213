//! Core Module - Business Logic
//!
//! The aggregation engine and the blocklist edit session machine. No I/O
//! primitives of its own: sources and the store are injected.

pub mod aggregator;
pub mod session;

pub use aggregator::*;
pub use session::*;
