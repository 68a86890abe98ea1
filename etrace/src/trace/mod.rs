//! Trace container decoding
//!
//! - `record`: typed records and payload decoding
//! - `reader`: forward/backward record decoder with an incremental offset index

pub mod reader;
pub mod record;

pub use reader::{ReaderCheckpoint, TraceReader};
pub use record::{EventPayload, ExecPayload, MemAttr, MemPayload, Payload, Record};
