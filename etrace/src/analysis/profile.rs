//! Hot-function profile over the EXEC records of a trace.
//!
//! # Architecture
//!
//! - **`ProfileAggregator`** - Accumulates hits as EXEC records stream in
//! - **`profile_trace()`** - One sequential pass over a [`TraceReader`]
//! - **`ProfileReport`** - Ranked view model, rendered as text or JSON
//!
//! ## Data Flow
//!
//! ```text
//! TraceReader.decode_forward()
//!     │
//!     └──► ProfileAggregator.record_exec()  ← one hit per entry start
//!              │
//!              └──► SymbolTable.lookup(pc)  ← owning function
//! ```
//!
//! # Performance
//!
//! - `record_pc()`: O(log n) table search plus O(1) amortized map updates
//! - `report()`: O(f log f + p log p) for f functions and p distinct PCs
//! - Memory: O(functions) × O(distinct PCs per function)

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::io::{self, Read, Seek, Write};

use super::symbol_table::SymbolTable;
use crate::trace::{ExecPayload, TraceReader};

/// Functions listed when the caller does not choose
pub const DEFAULT_TOP: usize = 30;

// =============================================================================
// REPORT (OUTPUT TYPES)
// =============================================================================

/// Hits on one program counter inside a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PcHits {
    pub pc: u32,
    pub count: u64,
}

/// One ranked function.
///
/// ```text
/// 0x00001000  main                                         42
///     0x00001010 :     30
///     0x00001000 :     12
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionProfile {
    /// Lowest table address seen for this name, 0 for unknown code
    pub addr: u64,
    pub name: String,
    pub count: u64,
    /// Sorted by descending hits, then ascending address
    pub pcs: Vec<PcHits>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileReport {
    pub total_hits: u64,
    pub functions: Vec<FunctionProfile>,
}

impl ProfileReport {
    /// Human-readable ranked listing
    ///
    /// # Errors
    /// Returns an error if writing fails
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "=== Hottest Functions (Top {}) ===", self.functions.len())?;
        for func in &self.functions {
            writeln!(out, "0x{:08x}  {:40} {:6}", func.addr, func.name, func.count)?;
            for hits in &func.pcs {
                writeln!(out, "    0x{:08x} : {:6}", hits.pc, hits.count)?;
            }
        }
        Ok(())
    }

    /// # Errors
    /// Returns an error if serialization or writing fails
    pub fn write_json<W: Write>(&self, out: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(out, self)
    }
}

// =============================================================================
// AGGREGATOR
// =============================================================================

#[derive(Debug, Default)]
pub struct ProfileAggregator {
    /// Per-function statistics, keyed by function name
    functions: HashMap<String, FunctionStats>,
    total_hits: u64,
}

#[derive(Debug, Clone)]
struct FunctionStats {
    addr: u64,
    count: u64,
    pcs: HashMap<u32, u64>,
}

impl ProfileAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one hit for the start of every entry in the record
    pub fn record_exec(&mut self, table: &SymbolTable, exec: &ExecPayload) {
        for entry in &exec.entries {
            self.record_pc(table, entry.start);
        }
    }

    pub fn record_pc(&mut self, table: &SymbolTable, pc: u32) {
        let (name, addr) = table.lookup(u64::from(pc));
        self.total_hits += 1;

        let stats = self
            .functions
            .entry(name.to_owned())
            .or_insert_with(|| FunctionStats { addr, count: 0, pcs: HashMap::new() });
        stats.addr = stats.addr.min(addr);
        stats.count += 1;
        *stats.pcs.entry(pc).or_insert(0) += 1;
    }

    #[must_use]
    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    /// The `top` hottest functions, ties broken by name
    #[must_use]
    pub fn report(&self, top: usize) -> ProfileReport {
        let mut functions: Vec<FunctionProfile> = self
            .functions
            .iter()
            .map(|(name, stats)| {
                let mut pcs: Vec<PcHits> =
                    stats.pcs.iter().map(|(&pc, &count)| PcHits { pc, count }).collect();
                pcs.sort_unstable_by_key(|h| (Reverse(h.count), h.pc));
                FunctionProfile { addr: stats.addr, name: name.clone(), count: stats.count, pcs }
            })
            .collect();

        functions.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        functions.truncate(top);
        ProfileReport { total_hits: self.total_hits, functions }
    }
}

/// Aggregate every EXEC record from the reader's current position to the end.
///
/// `progress` receives `(bytes consumed, total bytes)` before each record and
/// once more at the end.
pub fn profile_trace<R, F>(
    reader: &mut TraceReader<R>,
    table: &SymbolTable,
    mut progress: F,
) -> ProfileAggregator
where
    R: Read + Seek,
    F: FnMut(u64, u64),
{
    let mut aggregator = ProfileAggregator::new();
    loop {
        progress(reader.offset(), reader.len());
        let Some(record) = reader.decode_forward() else { break };
        if let Some(exec) = record.exec() {
            aggregator.record_exec(table, exec);
        }
    }
    progress(reader.len(), reader.len());
    aggregator
}

/// Whole-percent progress that only reports changes
#[derive(Debug, Default)]
pub struct ProgressMeter {
    last: Option<u64>,
}

impl ProgressMeter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// New percentage, or `None` if it has not changed since the last call
    pub fn update(&mut self, done: u64, total: u64) -> Option<u64> {
        let pct = if total == 0 { 100 } else { done.min(total).saturating_mul(100) / total };
        if self.last == Some(pct) {
            return None;
        }
        self.last = Some(pct);
        Some(pct)
    }
}
