//! # Symbol Resolution
//!
//! Converts program counters recorded in a trace into a human-readable
//! `(symbol, file, line)` triple for the step-through viewer.
//!
//! ## Resolution Flow
//!
//! ```text
//! 1. Trace PC                          0xffff0104
//! 2. AddressMap (optional)             0xffff0104 → 0x00000104
//! 3. Cache lookup                      hit → done
//! 4. Backend (one call, synchronous)   0x104 → main at boot/start.c:42
//! 5. Cache insert (hits and misses)
//! ```
//!
//! Failures never reach the caller: a backend answering `None` is replaced
//! by the sentinel `("??", "??", 0)`, and that sentinel is cached too.
//!
//! ## Backends
//!
//! - **`addr2line_process`**: spawns `addr2line -f -e <elf>` per uncached
//!   address (default; works for any toolchain's ELF)
//! - **`symbolizer`**: in-process DWARF lookup via the `addr2line` crate
//! - [`NullSymbolizer`]: no image given, everything is the sentinel
//!
//! ## Concurrency
//!
//! The resolver is owned by the single control thread. The cache uses a
//! `RefCell`, so a resolver cannot be shared across threads; prefetching
//! would need a message-passing boundary in front of it.

pub mod addr2line_process;
pub mod address_map;
pub mod resolver;
pub mod symbolizer;

pub use addr2line_process::Addr2Line;
pub use address_map::{AddressMap, RemapRule};
pub use resolver::{NullSymbolizer, SymbolResolver, Symbolize};
pub use symbolizer::DwarfSymbolizer;
