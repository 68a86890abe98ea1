//! Batch analysis of whole traces
//!
//! This module contains the hot-function profile, separated from the viewer
//! and from command-line handling.

pub mod profile;
pub mod symbol_table;

pub use profile::{
    profile_trace, FunctionProfile, PcHits, ProfileAggregator, ProfileReport, ProgressMeter,
    DEFAULT_TOP,
};
pub use symbol_table::SymbolTable;
