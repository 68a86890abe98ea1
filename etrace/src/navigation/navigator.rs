//! Bidirectional stepping over a decoded trace.
//!
//! Every granularity is built on [`Navigator::step_entry`]:
//!
//! | Granularity | Repeats      | Stops when                                   |
//! |-------------|--------------|----------------------------------------------|
//! | entry       | one stride   | always                                       |
//! | line        | entry steps  | `(file, line)` changes, stream ends, non-EXEC |
//! | symbol      | line steps   | symbol changes, stream ends, non-EXEC         |
//!
//! Searches repeat line steps until the resolved symbol equals the target and
//! put the cursor back where it started when the target never shows up.

use log::{debug, info};
use std::io::{Read, Seek};

use super::event_log::EventLog;
use super::position::{advance_within, Landing, Position};
use crate::domain::{Direction, Granularity, SymbolLocation, TraceError};
use crate::symbolization::SymbolResolver;
use crate::trace::{ReaderCheckpoint, Record, TraceReader};
use etrace_common::ExecEntry;

/// Result of a symbol search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found,
    /// Target absent in that direction; the cursor did not move
    NotFound,
}

impl SearchOutcome {
    #[must_use]
    pub fn is_found(self) -> bool {
        self == Self::Found
    }
}

/// Everything a failed search has to roll back
struct Snapshot {
    position: Position,
    reader: ReaderCheckpoint,
    location: Option<SymbolLocation>,
    log: EventLog,
}

pub struct Navigator<R> {
    reader: TraceReader<R>,
    resolver: SymbolResolver,
    position: Position,
    /// Location of the last EXEC position reached
    location: Option<SymbolLocation>,
    log: EventLog,
    search: String,
}

impl<R: Read + Seek> Navigator<R> {
    /// Navigator with no position; the first step decodes the first record.
    #[must_use]
    pub fn new(reader: TraceReader<R>, resolver: SymbolResolver) -> Self {
        Self {
            reader,
            resolver,
            position: Position::NoPosition,
            location: None,
            log: EventLog::new(),
            search: String::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------------

    /// Move one instruction stride, leaving the record when its entries run out.
    ///
    /// Returns `None` once the stream is exhausted in `dir`; the position is
    /// then [`Position::NoPosition`] and a step the other way re-enters it.
    pub fn step_entry(&mut self, dir: Direction) -> Option<Landing> {
        let next = match std::mem::take(&mut self.position) {
            Position::InExec { record, entry, pc } => {
                let within = record
                    .exec()
                    .and_then(|exec| advance_within(&exec.entries, entry, pc, dir));
                match within {
                    Some((entry, pc)) => Some(Position::InExec { record, entry, pc }),
                    None => self.next_record(dir),
                }
            }
            Position::NoPosition | Position::AtNonExec(_) => self.next_record(dir),
        };
        self.position = next.unwrap_or_default();

        match &self.position {
            Position::InExec { pc, .. } => {
                let pc = *pc;
                self.location = Some(self.resolver.resolve(u64::from(pc)));
                Some(Landing::Exec { pc })
            }
            Position::AtNonExec(record) => {
                self.log.record(record, dir);
                Some(Landing::Other { record_type: record.record_type })
            }
            Position::NoPosition => {
                if let Some(err) = self.reader.last_error() {
                    debug!("Stepping stopped: {err}");
                }
                None
            }
        }
    }

    fn next_record(&mut self, dir: Direction) -> Option<Position> {
        let record = match dir {
            Direction::Forward => self.reader.decode_forward(),
            Direction::Backward => self.reader.decode_backward(),
        }?;
        Some(Position::enter(record, dir))
    }

    /// Step entries until the source line changes.
    ///
    /// Returns early, possibly on an unchanged line, when the stream ends or a
    /// non-EXEC record is reached.
    pub fn step_line(&mut self, dir: Direction) -> Option<Landing> {
        let start = self.exec_location().cloned();
        loop {
            let landing = self.step_entry(dir)?;
            if !landing.is_exec() || self.line_changed(start.as_ref()) {
                return Some(landing);
            }
        }
    }

    /// Step lines until the symbol changes, with the same early returns.
    pub fn step_symbol(&mut self, dir: Direction) -> Option<Landing> {
        let start = self.current_symbol().map(str::to_owned);
        loop {
            let landing = self.step_line(dir)?;
            if !landing.is_exec() || self.current_symbol() != start.as_deref() {
                return Some(landing);
            }
        }
    }

    pub fn step(&mut self, granularity: Granularity, dir: Direction) -> Option<Landing> {
        match granularity {
            Granularity::Entry => self.step_entry(dir),
            Granularity::Line => self.step_line(dir),
            Granularity::Symbol => self.step_symbol(dir),
        }
    }

    fn line_changed(&self, start: Option<&SymbolLocation>) -> bool {
        match (start, &self.location) {
            (Some(prev), Some(now)) => !prev.same_line(now),
            _ => true,
        }
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Line-step in `dir` until the current symbol is `target`.
    ///
    /// A position already on `target` matches immediately.
    pub fn search(&mut self, target: &str, dir: Direction) -> SearchOutcome {
        let snapshot = self.snapshot();
        if self.seek_symbol(target, dir) {
            SearchOutcome::Found
        } else {
            self.restore(snapshot);
            SearchOutcome::NotFound
        }
    }

    /// Set the search pattern and look for it forward from here
    pub fn start_search(&mut self, pattern: &str) -> SearchOutcome {
        self.search = pattern.trim().to_owned();
        if self.search.is_empty() {
            return SearchOutcome::NotFound;
        }
        let target = self.search.clone();
        let outcome = self.search(&target, Direction::Forward);
        info!("Search for {target}: {outcome:?}");
        outcome
    }

    /// Find the next occurrence of the current pattern in `dir`.
    ///
    /// When the cursor already sits in the target symbol it first leaves it,
    /// so repeated calls walk from occurrence to occurrence.
    pub fn repeat_search(&mut self, dir: Direction) -> SearchOutcome {
        if self.search.is_empty() {
            return SearchOutcome::NotFound;
        }
        let target = self.search.clone();
        let snapshot = self.snapshot();
        if self.leave_symbol(&target, dir) && self.seek_symbol(&target, dir) {
            SearchOutcome::Found
        } else {
            self.restore(snapshot);
            SearchOutcome::NotFound
        }
    }

    fn seek_symbol(&mut self, target: &str, dir: Direction) -> bool {
        while self.current_symbol() != Some(target) {
            if self.step_line(dir).is_none() {
                return false;
            }
        }
        true
    }

    fn leave_symbol(&mut self, target: &str, dir: Direction) -> bool {
        while self.current_symbol() == Some(target) {
            if self.step_symbol(dir).is_none() {
                return false;
            }
        }
        true
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            position: self.position.clone(),
            reader: self.reader.checkpoint(),
            location: self.location.clone(),
            log: self.log.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.position = snapshot.position;
        self.reader.restore(snapshot.reader);
        self.location = snapshot.location;
        self.log = snapshot.log;
    }

    // ------------------------------------------------------------------------
    // Composite moves
    // ------------------------------------------------------------------------

    /// Rewind to the start of the trace and land on the first EXEC position
    pub fn reset(&mut self) -> Option<Landing> {
        self.reader.reset();
        self.position = Position::NoPosition;
        self.location = None;
        self.seek_exec(Direction::Forward)
    }

    /// Consume the rest of the trace, then land on the last EXEC position.
    ///
    /// Records on the way are logged once, going forward; their
    /// instructions are not resolved one by one.
    pub fn run_to_end(&mut self) -> Option<Landing> {
        self.position = Position::NoPosition;
        let mut consumed = 0usize;
        while let Some(record) = self.reader.decode_forward() {
            self.log.record(&record, Direction::Forward);
            consumed += 1;
        }
        debug!("Ran {consumed} records to the end of the trace");

        // The walk back to the last EXEC record re-crosses the tail
        let log = self.log.clone();
        let landing = self.seek_exec(Direction::Backward);
        self.log = log;
        landing
    }

    fn seek_exec(&mut self, dir: Direction) -> Option<Landing> {
        loop {
            let landing = self.step_entry(dir)?;
            if landing.is_exec() {
                return Some(landing);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn position(&self) -> &Position {
        &self.position
    }

    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        self.position.record()
    }

    #[must_use]
    pub fn entry(&self) -> Option<(usize, ExecEntry)> {
        self.position.entry()
    }

    #[must_use]
    pub fn pc(&self) -> Option<u32> {
        self.position.pc()
    }

    #[must_use]
    pub fn location(&self) -> Option<&SymbolLocation> {
        self.location.as_ref()
    }

    /// Location under the cursor; `location` outlives the EXEC position
    /// that produced it, this does not
    fn exec_location(&self) -> Option<&SymbolLocation> {
        self.location.as_ref().filter(|_| self.position.is_exec())
    }

    fn current_symbol(&self) -> Option<&str> {
        self.exec_location().map(|loc| loc.symbol.as_str())
    }

    #[must_use]
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    #[must_use]
    pub fn search_pattern(&self) -> &str {
        &self.search
    }

    /// Why the reader last stopped early, if it did
    #[must_use]
    pub fn reader_error(&self) -> Option<&TraceError> {
        self.reader.last_error()
    }

    #[must_use]
    pub fn resolver(&self) -> &SymbolResolver {
        &self.resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolization::Symbolize;
    use etrace_common::{TraceWriter, MEM_ATTR_WRITE};
    use std::io::Cursor;

    /// Maps address ranges to fixed locations
    struct Table(Vec<(u64, u64, SymbolLocation)>);

    impl Symbolize for Table {
        fn symbolize(&self, addr: u64) -> Option<SymbolLocation> {
            self.0
                .iter()
                .find(|(start, end, _)| (*start..*end).contains(&addr))
                .map(|(_, _, loc)| loc.clone())
        }
    }

    fn navigator(writer: &TraceWriter, table: Vec<(u64, u64, SymbolLocation)>) -> Navigator<Cursor<Vec<u8>>> {
        let reader = TraceReader::new(Cursor::new(writer.as_bytes().to_vec())).unwrap();
        Navigator::new(reader, SymbolResolver::new(Box::new(Table(table))))
    }

    fn loc(symbol: &str, line: u32) -> SymbolLocation {
        SymbolLocation::new(symbol, "main.c", line)
    }

    /// Two EXEC records around a MEM record
    fn two_execs() -> TraceWriter {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x110)])
            .mem(0, 1, 0, 0x8000, 0x2a, MEM_ATTR_WRITE, 4)
            .exec(0, 2, &[ExecEntry::new(0x200, 0x204)]);
        w
    }

    fn entry_steps<R: Read + Seek>(nav: &mut Navigator<R>, dir: Direction, n: usize) {
        for _ in 0..n {
            nav.step_entry(dir).unwrap();
        }
    }

    #[test]
    fn test_forward_entry_steps_cross_into_next_record() {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x110)])
            .exec(0, 1, &[ExecEntry::new(0x200, 0x204)]);
        let mut nav = navigator(&w, vec![]);

        entry_steps(&mut nav, Direction::Forward, 4);
        assert_eq!(nav.pc(), Some(0x10c));

        assert_eq!(nav.step_entry(Direction::Forward), Some(Landing::Exec { pc: 0x200 }));
        assert_eq!(nav.entry().unwrap().0, 0);
        assert!(nav.step_entry(Direction::Forward).is_none());
        assert_eq!(*nav.position(), Position::NoPosition);
    }

    #[test]
    fn test_entry_steps_are_symmetric() {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x10c), ExecEntry::new(0x180, 0x188)])
            .header_only(etrace_common::TYPE_BARRIER, 0, 0)
            .exec(0, 1, &[ExecEntry::new(0x200, 0x210)]);
        let mut nav = navigator(&w, vec![]);

        nav.step_entry(Direction::Forward).unwrap();
        entry_steps(&mut nav, Direction::Forward, 2);
        let start = (nav.entry().unwrap().0, nav.pc().unwrap());

        for n in 1..=7 {
            entry_steps(&mut nav, Direction::Forward, n);
            entry_steps(&mut nav, Direction::Backward, n);
            assert_eq!((nav.entry().unwrap().0, nav.pc().unwrap()), start, "n = {n}");
        }
    }

    #[test]
    fn test_backward_out_of_record_and_back_returns_to_first_start() {
        let mut nav = navigator(&two_execs(), vec![]);
        // Four strides, the MEM record, then the second EXEC record
        entry_steps(&mut nav, Direction::Forward, 6);
        assert_eq!(nav.pc(), Some(0x200));

        nav.step_entry(Direction::Backward).unwrap();
        assert!(!nav.position().is_exec());
        nav.step_entry(Direction::Forward).unwrap();
        assert_eq!(nav.pc(), Some(0x200));
    }

    #[test]
    fn test_backward_lands_on_last_stride() {
        let mut nav = navigator(&two_execs(), vec![]);
        assert_eq!(nav.run_to_end(), Some(Landing::Exec { pc: 0x200 }));
        entry_steps(&mut nav, Direction::Backward, 2);
        assert_eq!(nav.pc(), Some(0x10c));
    }

    #[test]
    fn test_non_exec_records_are_logged() {
        let mut nav = navigator(&two_execs(), vec![]);
        entry_steps(&mut nav, Direction::Forward, 4);
        assert_eq!(nav.step_entry(Direction::Forward), Some(Landing::Other { record_type: 4 }));
        assert_eq!(nav.log().iter().collect::<Vec<_>>(), ["mem write 8000 = 2a"]);
        // Location stays on the last EXEC position
        assert!(nav.location().is_some());
    }

    #[test]
    fn test_line_step_skips_same_line_entries() {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x108), ExecEntry::new(0x300, 0x304)])
            .exec(0, 1, &[ExecEntry::new(0x400, 0x404)]);
        let table = vec![(0x100, 0x108, loc("f", 1)), (0x300, 0x304, loc("f", 1)), (0x400, 0x404, loc("f", 2))];
        let mut nav = navigator(&w, table);

        nav.step_line(Direction::Forward).unwrap();
        assert_eq!(nav.pc(), Some(0x100));
        nav.step_line(Direction::Forward).unwrap();
        assert_eq!(nav.pc(), Some(0x400));
        assert_eq!(nav.location().unwrap().line, 2);
    }

    #[test]
    fn test_line_step_stops_at_non_exec_record() {
        let table = vec![(0x100, 0x110, loc("f", 1)), (0x200, 0x204, loc("f", 2))];
        let mut nav = navigator(&two_execs(), table);
        nav.step_line(Direction::Forward).unwrap();
        assert_eq!(nav.step_line(Direction::Forward), Some(Landing::Other { record_type: 4 }));
        assert_eq!(nav.step_line(Direction::Forward), Some(Landing::Exec { pc: 0x200 }));
        assert!(nav.step_line(Direction::Forward).is_none());

        // Leaving a non-EXEC record always lands on the next instruction
        let table = vec![(0x100, 0x110, loc("f", 1)), (0x200, 0x204, loc("f", 1))];
        let mut nav = navigator(&two_execs(), table);
        nav.step_line(Direction::Forward).unwrap();
        assert!(!nav.step_line(Direction::Forward).unwrap().is_exec());
        assert_eq!(nav.step_line(Direction::Forward), Some(Landing::Exec { pc: 0x200 }));
    }

    #[test]
    fn test_unchanged_line_runs_into_end_of_stream() {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x108)])
            .exec(0, 1, &[ExecEntry::new(0x200, 0x204)]);
        let table = vec![(0x100, 0x108, loc("f", 1)), (0x200, 0x204, loc("f", 1))];
        let mut nav = navigator(&w, table);
        nav.step_line(Direction::Forward).unwrap();
        assert!(nav.step_line(Direction::Forward).is_none());
    }

    fn calls_trace() -> (TraceWriter, Vec<(u64, u64, SymbolLocation)>) {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x108)])
            .exec(0, 1, &[ExecEntry::new(0x200, 0x208)])
            .exec(0, 2, &[ExecEntry::new(0x100, 0x108)])
            .exec(0, 3, &[ExecEntry::new(0x200, 0x208)]);
        let table = vec![
            (0x100, 0x104, loc("main", 1)),
            (0x104, 0x108, loc("main", 2)),
            (0x200, 0x208, loc("helper", 10)),
        ];
        (w, table)
    }

    #[test]
    fn test_symbol_step_crosses_lines() {
        let (w, table) = calls_trace();
        let mut nav = navigator(&w, table);
        nav.reset().unwrap();
        assert_eq!(nav.location().unwrap().symbol, "main");
        nav.step_symbol(Direction::Forward).unwrap();
        assert_eq!(nav.pc(), Some(0x200));
        nav.step_symbol(Direction::Backward).unwrap();
        assert_eq!(nav.pc(), Some(0x104));
    }

    #[test]
    fn test_repeat_search_advances_past_current_occurrence() {
        let (w, table) = calls_trace();
        let mut nav = navigator(&w, table);
        nav.reset().unwrap();

        assert_eq!(nav.start_search("helper"), SearchOutcome::Found);
        let first = nav.reader.current_index();
        assert_eq!(nav.repeat_search(Direction::Forward), SearchOutcome::Found);
        assert_eq!(nav.pc(), Some(0x200));
        assert!(nav.reader.current_index() > first);
    }

    #[test]
    fn test_search_miss_restores_position() {
        let (w, table) = calls_trace();
        let mut nav = navigator(&w, table);
        nav.reset().unwrap();
        nav.step_line(Direction::Forward).unwrap();
        let before = (nav.pc(), nav.reader.current_index(), nav.location().cloned());

        assert_eq!(nav.start_search("missing"), SearchOutcome::NotFound);
        assert_eq!((nav.pc(), nav.reader.current_index(), nav.location().cloned()), before);
        assert_eq!(nav.search_pattern(), "missing");

        // Decoding continues from the restored position
        nav.step_line(Direction::Forward).unwrap();
        assert_eq!(nav.pc(), Some(0x200));
    }

    #[test]
    fn test_repeat_search_backward_and_miss() {
        let (w, table) = calls_trace();
        let mut nav = navigator(&w, table);
        nav.run_to_end().unwrap();
        assert_eq!(nav.location().unwrap().symbol, "helper");

        nav.start_search("helper");
        assert_eq!(nav.repeat_search(Direction::Backward), SearchOutcome::Found);
        assert_eq!(nav.reader.current_index(), Some(1));

        let before = nav.pc();
        assert_eq!(nav.repeat_search(Direction::Backward), SearchOutcome::NotFound);
        assert_eq!(nav.pc(), before);
        assert_eq!(nav.reader.current_index(), Some(1));
    }

    #[test]
    fn test_reset_and_run_to_end() {
        let mut w = TraceWriter::new();
        w.event_u64(0, 0, "timer", "irq", 1, 0).exec(0, 1, &[ExecEntry::new(0x100, 0x108)]);
        w.mem(0, 2, 0, 0x10, 0, 0, 4);
        let mut nav = navigator(&w, vec![]);

        assert_eq!(nav.reset(), Some(Landing::Exec { pc: 0x100 }));
        assert_eq!(nav.log().len(), 1);
        assert_eq!(nav.location(), Some(&SymbolLocation::sentinel()));

        assert_eq!(nav.run_to_end(), Some(Landing::Exec { pc: 0x104 }));
        assert_eq!(nav.log().iter().last(), Some("mem read 10 = 0"));
        assert_eq!(nav.log().len(), 2);

        assert_eq!(nav.reset(), Some(Landing::Exec { pc: 0x100 }));
    }

    #[test]
    fn test_run_to_end_logs_trailing_records_once() {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x104)])
            .mem(0, 1, 0, 0x10, 0, 0, 4)
            .event_u64(0, 2, "timer", "irq", 5, 4);
        let mut nav = navigator(&w, vec![]);

        assert_eq!(nav.run_to_end(), Some(Landing::Exec { pc: 0x100 }));
        let log: Vec<&str> = nav.log().iter().collect();
        assert_eq!(log, ["mem read 10 = 0", "event timer irq 5 prev=4"]);
    }

    #[test]
    fn test_search_past_end_does_not_match_stale_symbol() {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x104)]);
        let mut nav = navigator(&w, vec![(0x100, 0x104, loc("main", 1))]);
        nav.reset().unwrap();
        assert!(nav.step_entry(Direction::Forward).is_none());

        assert_eq!(nav.start_search("main"), SearchOutcome::NotFound);
        assert_eq!(*nav.position(), Position::NoPosition);

        assert_eq!(nav.repeat_search(Direction::Backward), SearchOutcome::Found);
        assert_eq!(nav.pc(), Some(0x100));
    }

    #[test]
    fn test_search_from_non_exec_record() {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x104)]).mem(0, 1, 0, 0x10, 0, 0, 4);
        let mut nav = navigator(&w, vec![(0x100, 0x104, loc("main", 1))]);
        nav.reset().unwrap();
        assert!(!nav.step_entry(Direction::Forward).unwrap().is_exec());

        assert_eq!(nav.start_search("main"), SearchOutcome::NotFound);
        assert!(matches!(nav.position(), Position::AtNonExec(_)));

        assert_eq!(nav.repeat_search(Direction::Backward), SearchOutcome::Found);
        assert_eq!(nav.pc(), Some(0x100));
        assert_eq!(nav.reader.current_index(), Some(0));
    }

    #[test]
    fn test_empty_trace() {
        let mut nav = navigator(&TraceWriter::new(), vec![]);
        assert!(nav.reset().is_none());
        assert!(nav.run_to_end().is_none());
        assert!(nav.step(Granularity::Symbol, Direction::Forward).is_none());
    }

    #[test]
    fn test_corrupt_record_ends_stream() {
        let mut w = TraceWriter::new();
        w.exec(0, 0, &[ExecEntry::new(0x100, 0x104)]).header_only(3, 0, 50_000_000);
        let mut nav = navigator(&w, vec![]);
        nav.reset().unwrap();
        assert!(nav.step_entry(Direction::Forward).is_none());
        assert!(matches!(nav.reader_error(), Some(TraceError::PayloadTooLarge { .. })));
        assert_eq!(nav.step_entry(Direction::Backward), Some(Landing::Exec { pc: 0x100 }));
    }
}
