//! Small value types shared across the navigator, resolver and viewer

use std::fmt;

/// Direction of a navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    #[must_use]
    pub fn is_forward(self) -> bool {
        self == Self::Forward
    }
}

/// Unit of advancement for a navigation step.
///
/// Each granularity is a repeated application of the one before it plus a
/// stop condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Entry,
    Line,
    Symbol,
}

/// Name used for every part of a location that could not be resolved
pub const UNKNOWN: &str = "??";

/// Resolved symbol and source position of one program counter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolLocation {
    pub symbol: String,
    pub file: String,
    pub line: u32,
}

impl SymbolLocation {
    #[must_use]
    pub fn new(symbol: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self { symbol: symbol.into(), file: file.into(), line }
    }

    /// Placeholder for a failed resolution: `("??", ("??", "0"))`
    #[must_use]
    pub fn sentinel() -> Self {
        Self::new(UNKNOWN, UNKNOWN, 0)
    }

    #[must_use]
    pub fn has_source(&self) -> bool {
        self.file != UNKNOWN && !self.file.is_empty()
    }

    /// Same `(file, line)` pair, ignoring the symbol
    #[must_use]
    pub fn same_line(&self, other: &Self) -> bool {
        self.file == other.file && self.line == other.line
    }
}

impl fmt::Display for SymbolLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.file, self.line, self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_has_no_source() {
        let loc = SymbolLocation::sentinel();
        assert_eq!(loc.symbol, "??");
        assert_eq!(loc.file, "??");
        assert_eq!(loc.line, 0);
        assert!(!loc.has_source());
    }

    #[test]
    fn test_same_line_ignores_symbol() {
        let a = SymbolLocation::new("main", "main.c", 10);
        let b = SymbolLocation::new("helper", "main.c", 10);
        assert!(a.same_line(&b));
        assert!(!a.same_line(&SymbolLocation::new("main", "main.c", 11)));
    }
}
