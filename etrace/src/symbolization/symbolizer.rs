//! In-process DWARF backend
//!
//! Resolves addresses straight from the ELF image's DWARF sections using the
//! `addr2line` crate, avoiding one child process per address. The innermost
//! (possibly inlined) frame is reported, matching `addr2line -f` without `-i`.

use addr2line::Context;
use anyhow::{Context as _, Result};
use gimli::{EndianRcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use super::addr2line_process::demangle_symbol;
use super::resolver::Symbolize;
use crate::domain::{SymbolLocation, UNKNOWN};

type Section = EndianRcSlice<RunTimeEndian>;

pub struct DwarfSymbolizer {
    ctx: Context<Section>,
}

impl DwarfSymbolizer {
    /// Load the DWARF sections of the firmware image at `image`
    ///
    /// # Errors
    /// Returns an error naming the image if it cannot be read, is not an
    /// object file, or its debug sections do not parse
    pub fn new<P: AsRef<Path>>(image: P) -> Result<Self> {
        let image = image.as_ref();
        let bytes = fs::read(image)
            .with_context(|| format!("Failed to read ELF image {}", image.display()))?;
        let elf = object::File::parse(&*bytes)
            .with_context(|| format!("{} is not an object file", image.display()))?;

        let endian =
            if elf.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };
        let dwarf = gimli::Dwarf::load(|id| Ok::<_, gimli::Error>(load_section(&elf, id, endian)))
            .with_context(|| format!("Bad DWARF section in {}", image.display()))?;
        let ctx = Context::from_dwarf(dwarf)
            .with_context(|| format!("No usable DWARF line info in {}", image.display()))?;

        Ok(Self { ctx })
    }
}

/// Section contents, or an empty slice when the image lacks it
fn load_section(elf: &object::File<'_>, id: SectionId, endian: RunTimeEndian) -> Section {
    let data = elf
        .section_by_name(id.name())
        .and_then(|section| section.uncompressed_data().ok())
        .unwrap_or_default();
    Section::new(Rc::from(&*data), endian)
}

impl Symbolize for DwarfSymbolizer {
    fn symbolize(&self, addr: u64) -> Option<SymbolLocation> {
        let mut frames = self.ctx.find_frames(addr).skip_all_loads().ok()?;
        let frame = frames.next().ok()??;

        let symbol = frame
            .function
            .as_ref()
            .and_then(|f| f.raw_name().ok().map(|name| demangle_symbol(&name)))
            .unwrap_or_else(|| UNKNOWN.to_string());

        let (file, line) = frame.location.map_or((UNKNOWN.to_string(), 0), |loc| {
            (loc.file.map_or_else(|| UNKNOWN.to_string(), str::to_string), loc.line.unwrap_or(0))
        });

        if symbol == UNKNOWN && file == UNKNOWN {
            return None;
        }
        Some(SymbolLocation { symbol, file, line })
    }
}
