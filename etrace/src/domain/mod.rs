//! Domain model for etrace
//!
//! This module contains core domain types and errors that provide:
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

pub use types::{Direction, Granularity, SymbolLocation, UNKNOWN};

pub use errors::{ConfigError, SymbolTableError, TraceError};
