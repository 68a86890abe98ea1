//! Typed trace records and explicit field-by-field payload decoding.
//!
//! Payload bytes are never overlaid onto structs: every field is read through
//! [`Fields`], which bounds-checks each read and reports `None` when the
//! buffer runs short.

use bitflags::bitflags;
use etrace_common::{
    exec_entry_count, type_name, ExecEntry, EVENT_U64_FIXED_SIZE, MEM_ATTR_WRITE,
    MEM_PAYLOAD_SIZE, TYPE_EVENT_U64, TYPE_EXEC, TYPE_MEM,
};

bitflags! {
    /// Attribute bits of a memory access
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MemAttr: u32 {
        const WRITE = MEM_ATTR_WRITE;
    }
}

/// Decoded EXEC payload. `entries` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecPayload {
    pub start_time: u64,
    pub entries: Vec<ExecEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemPayload {
    pub time: u64,
    pub vaddr: u64,
    pub phys_addr: u64,
    pub value: u64,
    pub attr: MemAttr,
    pub size: u8,
}

impl MemPayload {
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.attr.contains(MemAttr::WRITE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPayload {
    pub time: u64,
    pub device_name: String,
    pub event_name: String,
    pub value: u64,
    pub prev_value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Exec(ExecPayload),
    Mem(MemPayload),
    Event(EventPayload),
    /// Payload skipped; only the header is known
    Opaque,
}

/// One self-describing unit of the trace log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Position of the record in the stream, counting from 0
    pub index: usize,
    /// Byte offset of the record header
    pub offset: u64,
    pub record_type: u16,
    pub unit_id: u16,
    pub payload_len: u32,
    pub payload: Payload,
}

impl Record {
    #[must_use]
    pub fn is_exec(&self) -> bool {
        matches!(self.payload, Payload::Exec(_))
    }

    #[must_use]
    pub fn exec(&self) -> Option<&ExecPayload> {
        match &self.payload {
            Payload::Exec(exec) => Some(exec),
            _ => None,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        type_name(self.record_type)
    }
}

/// Why an interpreted payload could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PayloadError {
    MalformedExec,
}

/// Bounds-checked little-endian field reader over a payload buffer
pub(crate) struct Fields<'a> {
    buf: &'a [u8],
}

impl<'a> Fields<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let (head, rest) = self.buf.split_first_chunk::<N>()?;
        self.buf = rest;
        Some(*head)
    }

    fn bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() < n {
            return None;
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Some(head)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Whether a record of this type has its payload decoded at all.
///
/// Everything else is skipped using `payload_len` alone.
pub(crate) fn is_interpreted(record_type: u16) -> bool {
    matches!(record_type, TYPE_EXEC | TYPE_MEM | TYPE_EVENT_U64)
}

pub(crate) fn decode_payload(record_type: u16, payload: &[u8]) -> Result<Payload, PayloadError> {
    match record_type {
        TYPE_EXEC => decode_exec(payload).map(Payload::Exec).ok_or(PayloadError::MalformedExec),
        TYPE_MEM => Ok(decode_mem(payload).map_or(Payload::Opaque, Payload::Mem)),
        TYPE_EVENT_U64 => Ok(decode_event(payload).map_or(Payload::Opaque, Payload::Event)),
        _ => Ok(Payload::Opaque),
    }
}

fn decode_exec(payload: &[u8]) -> Option<ExecPayload> {
    let count = exec_entry_count(u32::try_from(payload.len()).ok()?)?;
    let mut fields = Fields::new(payload);
    let start_time = fields.u64()?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let duration = fields.u32()?;
        let start = fields.u32()?;
        let end = fields.u32()?;
        entries.push(ExecEntry { duration, start, end });
    }
    Some(ExecPayload { start_time, entries })
}

// Only the exact producer layout is decoded; any other length stays opaque.
fn decode_mem(payload: &[u8]) -> Option<MemPayload> {
    if payload.len() != MEM_PAYLOAD_SIZE {
        return None;
    }
    let mut fields = Fields::new(payload);
    let time = fields.u64()?;
    let vaddr = fields.u64()?;
    let phys_addr = fields.u64()?;
    let value = fields.u64()?;
    let attr = MemAttr::from_bits_retain(fields.u32()?);
    let size = fields.u8()?;
    Some(MemPayload { time, vaddr, phys_addr, value, attr, size })
}

fn decode_event(payload: &[u8]) -> Option<EventPayload> {
    if payload.len() < EVENT_U64_FIXED_SIZE {
        return None;
    }
    let mut fields = Fields::new(payload);
    let _flags = fields.u32()?;
    let _unit_id = fields.u16()?;
    let _reserved = fields.u16()?;
    let time = fields.u64()?;
    let value = fields.u64()?;
    let prev_value = fields.u64()?;
    let dev_len = usize::from(fields.u16()?);
    let event_len = usize::from(fields.u16()?);
    let device_name = name_from_bytes(fields.bytes(dev_len)?);
    let event_name = name_from_bytes(fields.bytes(event_len)?);
    if !fields.is_empty() {
        return None;
    }
    Some(EventPayload { time, device_name, event_name, value, prev_value })
}

fn name_from_bytes(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use etrace_common::{TraceWriter, HEADER_SIZE, TYPE_NOTE};

    fn payload_of(writer: &TraceWriter) -> &[u8] {
        &writer.as_bytes()[HEADER_SIZE..]
    }

    #[test]
    fn test_decode_exec_entries_in_order() {
        let mut w = TraceWriter::new();
        w.exec(0, 99, &[ExecEntry::new(0x100, 0x110), ExecEntry::new(0x120, 0x124)]);
        let Payload::Exec(exec) = decode_payload(TYPE_EXEC, payload_of(&w)).unwrap() else {
            panic!("expected exec payload");
        };
        assert_eq!(exec.start_time, 99);
        assert_eq!(exec.entries, vec![ExecEntry::new(0x100, 0x110), ExecEntry::new(0x120, 0x124)]);
    }

    #[test]
    fn test_decode_exec_fractional_entry_is_malformed() {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x110)]);
        let mut payload = payload_of(&w).to_vec();
        payload.extend_from_slice(&[0xaa; 5]);
        assert_eq!(decode_payload(TYPE_EXEC, &payload), Err(PayloadError::MalformedExec));
    }

    #[test]
    fn test_decode_exec_without_entries_is_malformed() {
        assert_eq!(decode_payload(TYPE_EXEC, &[0; 8]), Err(PayloadError::MalformedExec));
    }

    #[test]
    fn test_decode_mem_write() {
        let mut w = TraceWriter::new();
        w.mem(1, 5, 0xdead, 0xbeef, 0x42, MEM_ATTR_WRITE, 4);
        let Payload::Mem(mem) = decode_payload(TYPE_MEM, payload_of(&w)).unwrap() else {
            panic!("expected mem payload");
        };
        assert!(mem.is_write());
        assert_eq!(mem.phys_addr, 0xbeef);
        assert_eq!(mem.value, 0x42);
        assert_eq!(mem.size, 4);
    }

    #[test]
    fn test_decode_mem_unknown_layout_is_opaque() {
        assert_eq!(decode_payload(TYPE_MEM, &[0; 12]), Ok(Payload::Opaque));
    }

    #[test]
    fn test_decode_event_strips_nul() {
        let mut w = TraceWriter::new();
        w.event_u64(0, 1, "uart0\0", "irq", 3, 2);
        let Payload::Event(event) = decode_payload(TYPE_EVENT_U64, payload_of(&w)).unwrap() else {
            panic!("expected event payload");
        };
        assert_eq!(event.device_name, "uart0");
        assert_eq!(event.event_name, "irq");
        assert_eq!((event.value, event.prev_value), (3, 2));
    }

    #[test]
    fn test_decode_event_with_trailing_garbage_is_opaque() {
        let mut w = TraceWriter::new();
        w.event_u64(0, 1, "dev", "ev", 3, 2);
        let mut payload = payload_of(&w).to_vec();
        payload.push(0xff);
        assert_eq!(decode_payload(TYPE_EVENT_U64, &payload), Ok(Payload::Opaque));
    }

    #[test]
    fn test_other_types_are_opaque() {
        assert!(!is_interpreted(TYPE_NOTE));
        assert_eq!(decode_payload(TYPE_NOTE, b"hello"), Ok(Payload::Opaque));
    }
}
