//! Function address table loaded from `nm` output.

use log::info;
use std::path::Path;

use crate::domain::{SymbolTableError, UNKNOWN};
use crate::symbolization::addr2line_process::demangle_symbol;

/// Text symbols sorted by ascending address
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: Vec<(u64, String)>,
}

impl SymbolTable {
    /// Load an `nm` listing.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or holds no text symbols
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SymbolTableError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| SymbolTableError::Read { path: path.to_path_buf(), source })?;
        let table = Self::parse(&text);
        if table.is_empty() {
            return Err(SymbolTableError::Empty(path.to_path_buf()));
        }
        info!("Loaded {} text symbols from {}", table.len(), path.display());
        Ok(table)
    }

    /// Parse `"<hex address> <type> <name>"` lines, keeping `t`/`T` rows.
    ///
    /// Lines with another shape or an unparsable address are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let (addr, kind, name) = (parts.next()?, parts.next()?, parts.next()?);
                if parts.next().is_some() || !kind.eq_ignore_ascii_case("t") {
                    return None;
                }
                let addr = u64::from_str_radix(addr, 16).ok()?;
                Some((addr, demangle_symbol(name)))
            })
            .collect();
        Self::from_entries(entries)
    }

    #[must_use]
    pub fn from_entries(mut entries: Vec<(u64, String)>) -> Self {
        entries.sort_by_key(|(addr, _)| *addr);
        Self { entries }
    }

    /// Function owning `pc`: the last entry at or below it, or `("??", 0)`.
    #[must_use]
    pub fn lookup(&self, pc: u64) -> (&str, u64) {
        match self.entries.partition_point(|(addr, _)| *addr <= pc) {
            0 => (UNKNOWN, 0),
            n => {
                let (addr, name) = &self.entries[n - 1];
                (name, *addr)
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
