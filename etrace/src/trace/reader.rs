//! Bidirectional record decoder over a seekable trace stream.
//!
//! The container has no reverse-length markers, so backward decoding relies
//! on an offset index built while scanning forward: `index[i]` is the header
//! offset of record `i`, and an entry is only ever pushed after the record
//! before it decoded successfully. Any record reachable backward has
//! therefore been read forward at least once.
//!
//! # Position model
//!
//! The reader remembers the record it returned last. `decode_forward` yields
//! the record after it, `decode_backward` the record before it. Running off
//! either end parks the position just outside the stream, so a decode in the
//! opposite direction returns the first (or last) record again.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::record::{decode_payload, is_interpreted, Payload, PayloadError, Record};
use crate::domain::TraceError;
use etrace_common::{HEADER_SIZE, MAX_PAYLOAD_LEN};

/// Saved reader position, see [`TraceReader::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderCheckpoint {
    current: Option<usize>,
}

pub struct TraceReader<R> {
    inner: R,
    /// Physical position of `inner`
    stream_pos: u64,
    /// Total stream length in bytes
    len: u64,
    /// Header offsets of every record boundary discovered so far
    index: Vec<u64>,
    /// Index of the record returned last; `None` before the start
    current: Option<usize>,
    last_error: Option<TraceError>,
}

impl TraceReader<BufReader<File>> {
    /// Open a trace file for decoding
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its size queried
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        let file = File::open(path.as_ref())?;
        let reader = Self::new(BufReader::new(file))?;
        info!("Opened trace {} ({} bytes)", path.as_ref().display(), reader.len());
        Ok(reader)
    }
}

impl<R: Read + Seek> TraceReader<R> {
    /// Wrap a seekable stream positioned anywhere; decoding starts at offset 0.
    ///
    /// # Errors
    /// Returns an error if seeking the stream fails
    pub fn new(mut inner: R) -> Result<Self, TraceError> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            stream_pos: 0,
            len,
            index: vec![0],
            current: None,
            last_error: None,
        })
    }

    /// Decode the record after the current position.
    ///
    /// Returns `None` at the end of the stream, including when the next
    /// record is corrupt; [`last_error`](Self::last_error) tells the two apart.
    pub fn decode_forward(&mut self) -> Option<Record> {
        let next = self.current.map_or(0, |i| i + 1);
        // No known boundary: decoding already stopped before this slot
        let offset = *self.index.get(next)?;

        match self.read_at(next, offset) {
            Ok(Some((record, end))) => {
                if self.index.len() == next + 1 {
                    self.index.push(end);
                }
                self.current = Some(next);
                self.last_error = None;
                Some(record)
            }
            Ok(None) => {
                self.current = Some(next);
                self.last_error = None;
                None
            }
            Err(e) => {
                warn!("Stopping forward decode: {e}");
                self.current = Some(next);
                self.last_error = Some(e);
                None
            }
        }
    }

    /// Decode the record before the current position.
    pub fn decode_backward(&mut self) -> Option<Record> {
        let prev = match self.current {
            None | Some(0) => {
                self.current = None;
                return None;
            }
            Some(i) => i - 1,
        };
        let offset = self.index[prev];

        match self.read_at(prev, offset) {
            Ok(Some((record, _))) => {
                self.current = Some(prev);
                self.last_error = None;
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Stopping backward decode: {e}");
                self.last_error = Some(e);
                None
            }
        }
    }

    /// Reposition before the first record. The offset index is kept.
    pub fn reset(&mut self) {
        self.current = None;
        self.last_error = None;
    }

    #[must_use]
    pub fn checkpoint(&self) -> ReaderCheckpoint {
        ReaderCheckpoint { current: self.current }
    }

    pub fn restore(&mut self, checkpoint: ReaderCheckpoint) {
        self.current = checkpoint.current;
    }

    /// Index of the record returned last
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Bytes of the stream consumed so far
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.stream_pos
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reason the most recent decode stopped, if it was not a clean end
    #[must_use]
    pub fn last_error(&self) -> Option<&TraceError> {
        self.last_error.as_ref()
    }

    /// Decode the record whose header is at `offset`.
    ///
    /// Returns the record and the offset just past it, or `None` on a clean
    /// end of stream.
    fn read_at(&mut self, index: usize, offset: u64) -> Result<Option<(Record, u64)>, TraceError> {
        self.seek_to(offset)?;

        let mut header = [0u8; HEADER_SIZE];
        match self.read_full(&mut header)? {
            0 => return Ok(None),
            n if n < HEADER_SIZE => return Err(TraceError::Truncated { offset }),
            _ => {}
        }

        let record_type = u16::from_le_bytes([header[0], header[1]]);
        let unit_id = u16::from_le_bytes([header[2], header[3]]);
        let payload_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if payload_len > MAX_PAYLOAD_LEN {
            return Err(TraceError::PayloadTooLarge {
                offset,
                len: payload_len,
                max: MAX_PAYLOAD_LEN,
            });
        }

        let end = offset + HEADER_SIZE as u64 + u64::from(payload_len);
        if end > self.len {
            return Err(TraceError::Truncated { offset });
        }

        let payload = if is_interpreted(record_type) {
            let mut bytes = vec![0u8; payload_len as usize];
            if self.read_full(&mut bytes)? < bytes.len() {
                return Err(TraceError::Truncated { offset });
            }
            decode_payload(record_type, &bytes).map_err(|e| match e {
                PayloadError::MalformedExec => TraceError::MalformedExec { offset, len: payload_len },
            })?
        } else {
            debug!("Skipping {payload_len} byte payload of type 0x{record_type:x} at 0x{offset:x}");
            Payload::Opaque
        };

        Ok(Some((Record { index, offset, record_type, unit_id, payload_len, payload }, end)))
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        if offset == self.stream_pos {
            return Ok(());
        }
        // Relative seeks let a buffered reader keep its buffer when skipping ahead
        let delta = i64::try_from(offset).ok().zip(i64::try_from(self.stream_pos).ok());
        match delta {
            Some((to, from)) => self.inner.seek_relative(to - from)?,
            None => {
                self.inner.seek(SeekFrom::Start(offset))?;
            }
        }
        self.stream_pos = offset;
        Ok(())
    }

    /// Fill `buf` as far as the stream allows, returning the bytes read
    fn read_full(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        self.stream_pos += filled as u64;
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etrace_common::{ExecEntry, TraceWriter, TYPE_EXEC, TYPE_NOTE};
    use std::io::Cursor;

    fn reader(writer: &TraceWriter) -> TraceReader<Cursor<Vec<u8>>> {
        TraceReader::new(Cursor::new(writer.as_bytes().to_vec())).unwrap()
    }

    fn three_records() -> TraceWriter {
        let mut w = TraceWriter::new();
        w.exec(0, 1, &[ExecEntry::new(0x100, 0x110)]);
        w.raw(TYPE_NOTE, 0, b"note");
        w.exec(0, 2, &[ExecEntry::new(0x200, 0x204), ExecEntry::new(0x300, 0x308)]);
        w
    }

    #[test]
    fn test_forward_decodes_in_order() {
        let mut r = reader(&three_records());
        let a = r.decode_forward().unwrap();
        let b = r.decode_forward().unwrap();
        let c = r.decode_forward().unwrap();
        assert!(r.decode_forward().is_none());
        assert!(r.last_error().is_none());

        assert_eq!((a.index, a.record_type), (0, TYPE_EXEC));
        assert_eq!((b.index, b.record_type, b.payload_len), (1, TYPE_NOTE, 4));
        assert_eq!(b.payload, Payload::Opaque);
        assert_eq!(c.exec().unwrap().entries.len(), 2);
    }

    #[test]
    fn test_backward_returns_preceding_record() {
        let mut r = reader(&three_records());
        r.decode_forward();
        r.decode_forward();
        r.decode_forward();
        assert_eq!(r.decode_backward().unwrap().index, 1);
        assert_eq!(r.decode_backward().unwrap().index, 0);
        assert!(r.decode_backward().is_none());
        // Parked before the start: forward yields the first record again
        assert_eq!(r.decode_forward().unwrap().index, 0);
    }

    #[test]
    fn test_backward_after_end_returns_last_record() {
        let mut r = reader(&three_records());
        while r.decode_forward().is_some() {}
        assert!(r.decode_forward().is_none());
        assert_eq!(r.decode_backward().unwrap().index, 2);
    }

    #[test]
    fn test_direction_change_does_not_repeat_record() {
        let mut r = reader(&three_records());
        r.decode_forward();
        r.decode_forward();
        assert_eq!(r.decode_backward().unwrap().index, 0);
        assert_eq!(r.decode_forward().unwrap().index, 1);
    }

    #[test]
    fn test_oversized_payload_stops_decoding() {
        let mut w = TraceWriter::new();
        w.exec(0, 1, &[ExecEntry::new(0x100, 0x104)]);
        w.header_only(TYPE_EXEC, 0, 50_000_000);
        w.exec(0, 2, &[ExecEntry::new(0x200, 0x204)]);
        let mut r = reader(&w);

        assert!(r.decode_forward().is_some());
        assert!(r.decode_forward().is_none());
        assert!(matches!(
            r.last_error(),
            Some(TraceError::PayloadTooLarge { offset: 28, len: 50_000_000, .. })
        ));
        // Never skips past the corrupt record
        assert!(r.decode_forward().is_none());
    }

    #[test]
    fn test_malformed_exec_stops_decoding() {
        let mut w = TraceWriter::new();
        w.raw(TYPE_EXEC, 0, &[0u8; 8 + 12 + 3]);
        let mut r = reader(&w);
        assert!(r.decode_forward().is_none());
        assert!(matches!(r.last_error(), Some(TraceError::MalformedExec { offset: 0, len: 23 })));
    }

    #[test]
    fn test_truncated_payload_stops_decoding() {
        let mut w = TraceWriter::new();
        w.exec(0, 1, &[ExecEntry::new(0x100, 0x104)]);
        let mut bytes = w.into_bytes();
        bytes.truncate(bytes.len() - 2);
        let mut r = TraceReader::new(Cursor::new(bytes)).unwrap();
        assert!(r.decode_forward().is_none());
        assert!(matches!(r.last_error(), Some(TraceError::Truncated { offset: 0 })));
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut r = reader(&three_records());
        r.decode_forward();
        let cp = r.checkpoint();
        r.decode_forward();
        r.decode_forward();
        r.restore(cp);
        assert_eq!(r.current_index(), Some(0));
        assert_eq!(r.decode_forward().unwrap().index, 1);
    }

    #[test]
    fn test_reset_rewinds_to_start() {
        let mut r = reader(&three_records());
        while r.decode_forward().is_some() {}
        r.reset();
        assert_eq!(r.decode_forward().unwrap().index, 0);
        assert_eq!(r.offset(), 28);
    }

    #[test]
    fn test_empty_stream() {
        let mut r = TraceReader::new(Cursor::new(Vec::new())).unwrap();
        assert!(r.is_empty());
        assert!(r.decode_forward().is_none());
        assert!(r.decode_backward().is_none());
    }
}
