//! Structured error types for etrace
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Only startup and I/O paths surface these to the user; the decoder,
//! resolver and source cache turn their failures into ordinary return values.

use std::path::PathBuf;
use thiserror::Error;

/// Why the trace decoder stopped in a given direction.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Suspicious payload length {len} at offset 0x{offset:x} (limit {max})")]
    PayloadTooLarge { offset: u64, len: u32, max: u32 },

    #[error("Malformed exec record at offset 0x{offset:x}: payload length {len}")]
    MalformedExec { offset: u64, len: u32 },

    #[error("Truncated record at offset 0x{offset:x}")]
    Truncated { offset: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Invalid config {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("Invalid address map rule: start 0x{start:x} is not below end 0x{end:x}")]
    EmptyRange { start: u64, end: u64 },
}

#[derive(Error, Debug)]
pub enum SymbolTableError {
    #[error("Failed to read symbol table {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Symbol table {0} contains no text symbols")]
    Empty(PathBuf),
}
