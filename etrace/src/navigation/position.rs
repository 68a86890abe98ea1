//! Cursor position inside the record stream and the entry-step arithmetic.
//!
//! A single EXEC record can stand for many instructions, so the position is
//! a composite of the record, an entry index and a program counter. The
//! functions here move that composite within one record; leaving the record
//! is the navigator's job.

use etrace_common::{ExecEntry, INSN_STRIDE};

use crate::domain::Direction;
use crate::trace::Record;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Position {
    /// Nothing decoded yet, or the stream ran out in the last direction
    #[default]
    NoPosition,
    /// `pc` lies in `[entries[entry].start, entries[entry].end)`
    InExec { record: Record, entry: usize, pc: u32 },
    /// A non-EXEC record, consumed whole
    AtNonExec(Record),
}

impl Position {
    /// Position after decoding `record` while travelling in `dir`.
    ///
    /// Forward lands on the first entry's start, backward on the last
    /// reachable stride of the last entry.
    #[must_use]
    pub fn enter(record: Record, dir: Direction) -> Self {
        let landing = match record.exec() {
            Some(exec) if !exec.entries.is_empty() => {
                let entries = &exec.entries;
                match dir {
                    Direction::Forward => Some((0, entries[0].start)),
                    Direction::Backward => {
                        let last = entries.len() - 1;
                        Some((last, entries[last].last_stride()))
                    }
                }
            }
            _ => None,
        };
        match landing {
            Some((entry, pc)) => Self::InExec { record, entry, pc },
            None => Self::AtNonExec(record),
        }
    }

    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::NoPosition => None,
            Self::InExec { record, .. } | Self::AtNonExec(record) => Some(record),
        }
    }

    #[must_use]
    pub fn is_exec(&self) -> bool {
        matches!(self, Self::InExec { .. })
    }

    #[must_use]
    pub fn pc(&self) -> Option<u32> {
        match self {
            Self::InExec { pc, .. } => Some(*pc),
            _ => None,
        }
    }

    /// Current entry index and range
    #[must_use]
    pub fn entry(&self) -> Option<(usize, ExecEntry)> {
        match self {
            Self::InExec { record, entry, .. } => {
                record.exec().and_then(|e| e.entries.get(*entry)).map(|range| (*entry, *range))
            }
            _ => None,
        }
    }
}

/// What an entry step landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Exec { pc: u32 },
    Other { record_type: u16 },
}

impl Landing {
    #[must_use]
    pub fn is_exec(self) -> bool {
        matches!(self, Self::Exec { .. })
    }
}

/// Move one stride within a record's entries.
///
/// Returns the new `(entry, pc)`, or `None` when the step leaves the record
/// (past the last entry forward, before the first entry backward).
#[must_use]
pub fn advance_within(
    entries: &[ExecEntry],
    entry: usize,
    pc: u32,
    dir: Direction,
) -> Option<(usize, u32)> {
    let current = entries.get(entry)?;
    match dir {
        Direction::Forward => {
            let pc = pc.saturating_add(INSN_STRIDE);
            if pc < current.end {
                return Some((entry, pc));
            }
            let next = entry + 1;
            entries.get(next).map(|range| (next, range.start))
        }
        Direction::Backward => {
            if pc > current.start {
                return Some((entry, pc.saturating_sub(INSN_STRIDE).max(current.start)));
            }
            let prev = entry.checked_sub(1)?;
            Some((prev, entries[prev].last_stride()))
        }
    }
}
