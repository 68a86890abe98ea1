//! External `addr2line` process backend
//!
//! One child process per lookup, fully serialized:
//!
//! ```text
//! addr2line -f -e <elf>      stdin:  0x<addr>\n
//!                            stdout: <symbol>\n<file>:<line>\n
//! ```
//!
//! Any deviation (spawn failure, fewer than two lines, no `:` separator)
//! yields `None`, which the resolver turns into the sentinel.

use log::debug;
use rustc_demangle::demangle;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

use super::resolver::Symbolize;
use crate::domain::{SymbolLocation, UNKNOWN};

/// Default program name, looked up on `PATH`
pub const DEFAULT_ADDR2LINE: &str = "addr2line";

pub struct Addr2Line {
    program: PathBuf,
    elf: PathBuf,
}

impl Addr2Line {
    pub fn new<P: AsRef<Path>>(elf: P) -> Self {
        Self::with_program(DEFAULT_ADDR2LINE, elf)
    }

    pub fn with_program<S: AsRef<Path>, P: AsRef<Path>>(program: S, elf: P) -> Self {
        Self { program: program.as_ref().to_path_buf(), elf: elf.as_ref().to_path_buf() }
    }

    fn run(&self, addr: u64) -> std::io::Result<String> {
        let child = Command::new(&self.program)
            .arg("-f")
            .arg("-e")
            .arg(&self.elf)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let output = exchange(child, format!("0x{addr:x}\n").as_bytes())?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Feed `request` to the child and collect its output.
///
/// The child is always waited on, including when the write fails.
fn exchange(mut child: Child, request: &[u8]) -> std::io::Result<Output> {
    let written = child.stdin.take().map_or(Ok(()), |mut stdin| stdin.write_all(request));
    let output = child.wait_with_output()?;
    written.map(|()| output)
}

impl Symbolize for Addr2Line {
    fn symbolize(&self, addr: u64) -> Option<SymbolLocation> {
        match self.run(addr) {
            Ok(out) => parse_output(&out),
            Err(e) => {
                debug!("{} failed for 0x{addr:x}: {e}", self.program.display());
                None
            }
        }
    }
}

/// Parse the two-line `addr2line -f` answer
#[must_use]
pub fn parse_output(out: &str) -> Option<SymbolLocation> {
    let mut lines = out.trim().lines();
    let symbol = lines.next()?.trim();
    let file_line = lines.next()?.trim();
    let (file, line) = file_line.split_once(':')?;

    Some(SymbolLocation {
        symbol: demangle_symbol(symbol),
        file: if file.is_empty() { UNKNOWN.to_string() } else { file.to_string() },
        line: parse_line_number(line),
    })
}

/// Leading decimal digits of the line field; `?` and friends become 0.
///
/// addr2line may append a discriminator: `42 (discriminator 3)`.
fn parse_line_number(field: &str) -> u32 {
    let digits = field.find(|c: char| !c.is_ascii_digit()).map_or(field, |end| &field[..end]);
    digits.parse().unwrap_or(0)
}

/// Demangle a Rust symbol name; other names pass through unchanged
#[must_use]
pub fn demangle_symbol(symbol: &str) -> String {
    format!("{:#}", demangle(symbol))
}
