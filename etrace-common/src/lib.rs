//! # Shared Trace Format Definitions (Producer ↔ Analyzer)
//!
//! Defines the wire vocabulary of the etrace container format: record type
//! ids, fixed header and entry sizes, payload layouts and the sanity ceiling
//! applied to payload lengths. Both the simulator-side producer and the
//! analyzer agree on these values; the analyzer never guesses a layout that
//! is not listed here.
//!
//! ## Container Layout
//!
//! All integers are little-endian and packed without padding:
//!
//! ```text
//! ┌──────────┬──────────┬──────────────┬─────────────────────────┐
//! │ type u16 │ unit u16 │ payload_len  │ payload (payload_len B) │
//! │          │          │ u32          │                         │
//! └──────────┴──────────┴──────────────┴─────────────────────────┘
//! ```
//!
//! An EXEC payload is `start_time: u64` followed by
//! `(payload_len - 8) / 12` entries of `duration: u32, start: u32, end: u32`.
//!
//! ## Key Items
//!
//! - [`ExecEntry`] - One contiguous program-counter range
//! - [`exec_entry_count`] / [`exec_payload_len`] - EXEC framing arithmetic
//! - [`TraceWriter`] - Encoder used by fixtures and tests (feature `alloc`)

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// ============================================================================
// Record Type Ids
// ============================================================================

/// Instruction execution spans
pub const TYPE_EXEC: u16 = 1;
/// Translation block notification
pub const TYPE_TB: u16 = 2;
/// Free-form producer note
pub const TYPE_NOTE: u16 = 3;
/// Memory access
pub const TYPE_MEM: u16 = 4;
/// Architecture description
pub const TYPE_ARCH: u16 = 5;
/// Synchronisation barrier
pub const TYPE_BARRIER: u16 = 6;
/// Counter event, legacy layout (payload never interpreted)
pub const TYPE_OLD_EVENT_U64: u16 = 7;
/// Named 64-bit counter event
pub const TYPE_EVENT_U64: u16 = 8;
/// Trace info block ("ET")
pub const TYPE_INFO: u16 = 0x4554;

/// Display name for a record type id
#[must_use]
pub fn type_name(record_type: u16) -> &'static str {
    match record_type {
        TYPE_EXEC => "exec",
        TYPE_TB => "tb",
        TYPE_NOTE => "note",
        TYPE_MEM => "mem",
        TYPE_ARCH => "arch",
        TYPE_BARRIER => "barrier",
        TYPE_OLD_EVENT_U64 => "old-event-u64",
        TYPE_EVENT_U64 => "event-u64",
        TYPE_INFO => "info",
        _ => "unknown",
    }
}

// ============================================================================
// Sizes and Limits
// ============================================================================

/// Fixed record header: `type u16, unit_id u16, payload_len u32`
pub const HEADER_SIZE: usize = 8;

/// Fixed EXEC payload header: `start_time u64`
pub const EXEC_HEADER_SIZE: usize = 8;

/// One EXEC entry: `duration u32, start u32, end u32`
pub const EXEC_ENTRY_SIZE: usize = 12;

/// MEM payload: `time, vaddr, paddr, value: u64, attr: u32, size: u8, pad[3]`
pub const MEM_PAYLOAD_SIZE: usize = 40;

/// EVENT_U64 payload before the two names
pub const EVENT_U64_FIXED_SIZE: usize = 36;

/// Payload lengths above this are treated as corruption, never as "large".
///
/// Decoding stops at such a record instead of trusting the length to locate
/// the next one.
pub const MAX_PAYLOAD_LEN: u32 = 10_000_000;

/// MEM `attr` bit set for writes (clear for reads)
pub const MEM_ATTR_WRITE: u32 = 1 << 0;

/// Fixed instruction width assumed when stepping through an EXEC range
pub const INSN_STRIDE: u32 = 4;

// ============================================================================
// EXEC Framing
// ============================================================================

/// A contiguous program-counter range executed without an intervening
/// control-flow record boundary. `end` is exclusive.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecEntry {
    pub duration: u32,
    pub start: u32,
    pub end: u32,
}

impl ExecEntry {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { duration: 0, start, end }
    }

    /// Last address reachable by a full stride inside the range.
    #[must_use]
    pub fn last_stride(&self) -> u32 {
        self.start.max(self.end.saturating_sub(INSN_STRIDE))
    }
}

/// Number of entries carried by an EXEC payload of `payload_len` bytes.
///
/// Returns `None` when the length cannot frame a well-formed record: shorter
/// than the EXEC header, a fractional entry remainder, or zero entries.
#[must_use]
pub fn exec_entry_count(payload_len: u32) -> Option<usize> {
    let body = (payload_len as usize).checked_sub(EXEC_HEADER_SIZE)?;
    if body % EXEC_ENTRY_SIZE != 0 {
        return None;
    }
    match body / EXEC_ENTRY_SIZE {
        0 => None,
        n => Some(n),
    }
}

/// Payload length of an EXEC record carrying `count` entries.
#[must_use]
pub fn exec_payload_len(count: usize) -> u32 {
    #[allow(clippy::cast_possible_truncation)]
    let len = (EXEC_HEADER_SIZE + count * EXEC_ENTRY_SIZE) as u32;
    len
}

// ============================================================================
// Encoder
// ============================================================================

#[cfg(feature = "alloc")]
pub use writer::TraceWriter;

#[cfg(feature = "alloc")]
mod writer {
    use super::{
        exec_payload_len, ExecEntry, EVENT_U64_FIXED_SIZE, MEM_PAYLOAD_SIZE, TYPE_EVENT_U64,
        TYPE_EXEC, TYPE_MEM,
    };
    use alloc::vec::Vec;

    /// Appends encoded records to an in-memory buffer.
    ///
    /// The analyzer never writes traces; this exists for fixtures.
    #[derive(Debug, Default, Clone)]
    pub struct TraceWriter {
        buf: Vec<u8>,
    }

    impl TraceWriter {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        fn header(&mut self, record_type: u16, unit_id: u16, payload_len: u32) {
            self.buf.extend_from_slice(&record_type.to_le_bytes());
            self.buf.extend_from_slice(&unit_id.to_le_bytes());
            self.buf.extend_from_slice(&payload_len.to_le_bytes());
        }

        /// Record with an arbitrary, uninterpreted payload.
        ///
        /// # Panics
        /// If `payload` is longer than `u32::MAX` bytes.
        pub fn raw(&mut self, record_type: u16, unit_id: u16, payload: &[u8]) -> &mut Self {
            let len = u32::try_from(payload.len()).expect("payload fits in u32");
            self.header(record_type, unit_id, len);
            self.buf.extend_from_slice(payload);
            self
        }

        /// Header only, with a caller-chosen length and no payload bytes.
        pub fn header_only(&mut self, record_type: u16, unit_id: u16, payload_len: u32) -> &mut Self {
            self.header(record_type, unit_id, payload_len);
            self
        }

        pub fn exec(&mut self, unit_id: u16, start_time: u64, entries: &[ExecEntry]) -> &mut Self {
            self.header(TYPE_EXEC, unit_id, exec_payload_len(entries.len()));
            self.buf.extend_from_slice(&start_time.to_le_bytes());
            for entry in entries {
                self.buf.extend_from_slice(&entry.duration.to_le_bytes());
                self.buf.extend_from_slice(&entry.start.to_le_bytes());
                self.buf.extend_from_slice(&entry.end.to_le_bytes());
            }
            self
        }

        #[allow(clippy::too_many_arguments)]
        pub fn mem(
            &mut self,
            unit_id: u16,
            time: u64,
            vaddr: u64,
            paddr: u64,
            value: u64,
            attr: u32,
            size: u8,
        ) -> &mut Self {
            #[allow(clippy::cast_possible_truncation)]
            const MEM_LEN: u32 = MEM_PAYLOAD_SIZE as u32;
            self.header(TYPE_MEM, unit_id, MEM_LEN);
            for word in [time, vaddr, paddr, value] {
                self.buf.extend_from_slice(&word.to_le_bytes());
            }
            self.buf.extend_from_slice(&attr.to_le_bytes());
            self.buf.push(size);
            self.buf.extend_from_slice(&[0; 3]);
            self
        }

        /// # Panics
        /// If either name is longer than `u16::MAX` bytes.
        pub fn event_u64(
            &mut self,
            unit_id: u16,
            time: u64,
            dev_name: &str,
            event_name: &str,
            val: u64,
            prev_val: u64,
        ) -> &mut Self {
            let dev_len = u16::try_from(dev_name.len()).expect("device name fits in u16");
            let event_len = u16::try_from(event_name.len()).expect("event name fits in u16");
            let payload_len = EVENT_U64_FIXED_SIZE + dev_name.len() + event_name.len();
            self.header(
                TYPE_EVENT_U64,
                unit_id,
                u32::try_from(payload_len).expect("payload fits in u32"),
            );
            self.buf.extend_from_slice(&0u32.to_le_bytes()); // flags
            self.buf.extend_from_slice(&unit_id.to_le_bytes());
            self.buf.extend_from_slice(&0u16.to_le_bytes()); // reserved
            for word in [time, val, prev_val] {
                self.buf.extend_from_slice(&word.to_le_bytes());
            }
            self.buf.extend_from_slice(&dev_len.to_le_bytes());
            self.buf.extend_from_slice(&event_len.to_le_bytes());
            self.buf.extend_from_slice(dev_name.as_bytes());
            self.buf.extend_from_slice(event_name.as_bytes());
            self
        }

        #[must_use]
        pub fn len(&self) -> usize {
            self.buf.len()
        }

        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.buf.is_empty()
        }

        #[must_use]
        pub fn as_bytes(&self) -> &[u8] {
            &self.buf
        }

        #[must_use]
        pub fn into_bytes(self) -> Vec<u8> {
            self.buf
        }
    }
}
