//! # etrace - Trace Navigator and Profiler for Simulator Execution Traces
//!
//! etrace reads the binary execution traces written by an instrumented
//! hardware simulator: an append-only log mixing instruction-execution
//! spans, memory accesses and named counter events. It offers two ways in.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     trace file (EXEC/MEM/EVENT)                 │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ decode_forward / decode_backward
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        TraceReader                              │
//! └──────────┬──────────────────────────────────────┬───────────────┘
//!            │                                      │
//!            ▼                                      ▼
//! ┌──────────────────────┐               ┌──────────────────────┐
//! │      Navigator       │──▶ Symbol     │  ProfileAggregator   │
//! │ entry / line / symbol│    Resolver   │  (nm symbol table)   │
//! └──────────┬───────────┘               └──────────┬───────────┘
//!            │                                      │
//!            ▼                                      ▼
//! ┌──────────────────────┐               ┌──────────────────────┐
//! │  TUI + SourceCache   │               │  text / JSON report  │
//! └──────────────────────┘               └──────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`trace`]: Record model and the bidirectional decoder
//! - [`navigation`]: Stepping by instruction, source line or symbol, in
//!   either direction, plus symbol search
//! - [`symbolization`]: Address to (symbol, file, line) with caching, an
//!   `addr2line` process backend and an in-process DWARF backend
//! - [`source`]: Bounded cache of source file lines
//! - [`analysis`]: Hot-function profile from an `nm` symbol table
//! - [`config`]: Optional JSON configuration (address map, defaults)
//! - [`tui`]: Terminal viewer
//! - [`cli`]: Command-line argument parsing
//! - [`domain`]: Shared value types and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Step through a trace with source display
//! etrace view --trace run.etrace --elf firmware.elf --comp-dir ~/fw
//!
//! # Hottest functions
//! nm firmware.elf > nm.txt
//! etrace profile run.etrace nm.txt --json hot.json
//! ```
//!
//! ## Key Concepts
//!
//! - **EXEC record**: One or more contiguous PC ranges executed in sequence
//! - **Entry step**: One 4-byte instruction stride, the atomic move
//! - **Sentinel location**: `??:0 ??`, returned whenever symbolization fails
//! - **Offset index**: Record boundaries discovered scanning forward, which
//!   make backward decoding possible

pub mod analysis;
pub mod cli;
pub mod config;
pub mod domain;
pub mod navigation;
pub mod source;
pub mod symbolization;
pub mod trace;
pub mod tui;
