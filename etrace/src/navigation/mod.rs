//! # Navigation
//!
//! Cursor over a decoded trace that moves by instruction, source line or
//! symbol, in either direction, and keeps a log of the memory accesses and
//! counter events it passes.

pub mod event_log;
pub mod navigator;
pub mod position;

pub use event_log::{EventLog, EVENT_LOG_CAPACITY};
pub use navigator::{Navigator, SearchOutcome};
pub use position::{Landing, Position};
