//! Bounded log of memory accesses and counter events met while stepping

use std::collections::VecDeque;

use crate::domain::Direction;
use crate::trace::{Payload, Record};
use etrace_common::{TYPE_EVENT_U64, TYPE_MEM};

/// Entries kept before the oldest is dropped
pub const EVENT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: VecDeque<String>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `record` if it is a memory access or counter event
    pub fn record(&mut self, record: &Record, dir: Direction) {
        if let Some(line) = describe(record, dir) {
            self.push(line);
        }
    }

    pub fn push(&mut self, line: String) {
        if self.entries.len() == EVENT_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(line);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// The newest `n` entries, oldest first
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &str> {
        self.iter().skip(self.entries.len().saturating_sub(n))
    }
}

/// One-line description of a MEM or EVENT_U64 record.
///
/// Counter events show their previous value when reached backward, since
/// that is the value in effect on the earlier side of the event.
#[must_use]
pub fn describe(record: &Record, dir: Direction) -> Option<String> {
    match &record.payload {
        Payload::Mem(mem) => {
            let op = if mem.is_write() { "write" } else { "read" };
            Some(format!("mem {op} {:x} = {:x}", mem.phys_addr, mem.value))
        }
        Payload::Event(event) => {
            let val = if dir.is_forward() { event.value } else { event.prev_value };
            Some(format!(
                "event {} {} {val:x} prev={:x}",
                event.device_name, event.event_name, event.prev_value
            ))
        }
        Payload::Opaque if matches!(record.record_type, TYPE_MEM | TYPE_EVENT_U64) => Some(format!(
            "{} unit={} len={}",
            record.type_name(),
            record.unit_id,
            record.payload_len
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{EventPayload, MemAttr, MemPayload};
    use etrace_common::TYPE_NOTE;

    fn record(record_type: u16, payload: Payload) -> Record {
        Record { index: 0, offset: 0, record_type, unit_id: 2, payload_len: 40, payload }
    }

    fn mem(attr: MemAttr) -> Record {
        record(
            TYPE_MEM,
            Payload::Mem(MemPayload {
                time: 0,
                vaddr: 0,
                phys_addr: 0x8000_0010,
                value: 0xff,
                attr,
                size: 4,
            }),
        )
    }

    #[test]
    fn test_describe_mem() {
        assert_eq!(
            describe(&mem(MemAttr::WRITE), Direction::Forward).unwrap(),
            "mem write 80000010 = ff"
        );
        assert_eq!(
            describe(&mem(MemAttr::empty()), Direction::Forward).unwrap(),
            "mem read 80000010 = ff"
        );
    }

    #[test]
    fn test_describe_event_uses_prev_value_backward() {
        let rec = record(
            TYPE_EVENT_U64,
            Payload::Event(EventPayload {
                time: 0,
                device_name: "timer".into(),
                event_name: "irq".into(),
                value: 1,
                prev_value: 0,
            }),
        );
        assert_eq!(describe(&rec, Direction::Forward).unwrap(), "event timer irq 1 prev=0");
        assert_eq!(describe(&rec, Direction::Backward).unwrap(), "event timer irq 0 prev=0");
    }

    #[test]
    fn test_describe_header_only_and_unlogged_types() {
        let opaque = record(TYPE_MEM, Payload::Opaque);
        assert_eq!(describe(&opaque, Direction::Forward).unwrap(), "mem unit=2 len=40");
        assert!(describe(&record(TYPE_NOTE, Payload::Opaque), Direction::Forward).is_none());
    }

    #[test]
    fn test_log_drops_oldest_at_capacity() {
        let mut log = EventLog::new();
        for i in 0..=EVENT_LOG_CAPACITY {
            log.push(format!("entry {i}"));
        }
        assert_eq!(log.len(), EVENT_LOG_CAPACITY);
        assert_eq!(log.iter().next(), Some("entry 1"));
        assert_eq!(log.tail(2).collect::<Vec<_>>(), ["entry 99", "entry 100"]);
    }
}
