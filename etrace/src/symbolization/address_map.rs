//! Address remapping applied before symbolization
//!
//! Traces record the addresses the simulated CPU executed, which can differ
//! from the link-time addresses in the ELF image (a relocated loader, an
//! MMU alias, a boot ROM copy). An [`AddressMap`] translates trace addresses
//! back to image addresses:
//!
//! ```text
//! Image Address = to + (Trace Address - start)     for start <= addr < end
//! ```
//!
//! The first matching rule wins; unmatched addresses pass through unchanged.

use serde::{Deserialize, Deserializer};

use crate::domain::ConfigError;

/// One relocated window of the address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RemapRule {
    #[serde(deserialize_with = "deserialize_addr")]
    pub start: u64,
    #[serde(deserialize_with = "deserialize_addr")]
    pub end: u64,
    #[serde(deserialize_with = "deserialize_addr")]
    pub to: u64,
}

impl RemapRule {
    /// Check if an address falls within this rule's window
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressMap {
    rules: Vec<RemapRule>,
}

impl AddressMap {
    /// Build a map, rejecting rules whose window is empty
    ///
    /// # Errors
    /// Returns [`ConfigError::EmptyRange`] for a rule with `start >= end`
    pub fn new(rules: Vec<RemapRule>) -> Result<Self, ConfigError> {
        if let Some(bad) = rules.iter().find(|r| r.start >= r.end) {
            return Err(ConfigError::EmptyRange { start: bad.start, end: bad.end });
        }
        Ok(Self { rules })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Translate a trace address into an image address
    #[must_use]
    pub fn apply(&self, addr: u64) -> u64 {
        self.rules
            .iter()
            .find(|rule| rule.contains(addr))
            .map_or(addr, |rule| rule.to.wrapping_add(addr - rule.start))
    }
}

/// Accept either a JSON integer or a `"0x…"` / decimal string
fn deserialize_addr<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Addr {
        Int(u64),
        Text(String),
    }

    match Addr::deserialize(deserializer)? {
        Addr::Int(v) => Ok(v),
        Addr::Text(s) => parse_addr(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid address '{s}'"))),
    }
}

/// Parse `0x`-prefixed hex or plain decimal
#[must_use]
pub fn parse_addr(s: &str) -> Option<u64> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}
