//! Source file cache for line display
//!
//! Files are read whole and split into lines on first request. The cache is
//! bounded by a single cheap check: once [`MAX_CACHED_FILES`] files are held,
//! the next insertion drops the entire cache first. There is no per-entry
//! eviction.

use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Distinct files held before the whole cache is discarded
pub const MAX_CACHED_FILES: usize = 256;

#[derive(Debug, Default)]
pub struct SourceCache {
    /// Directory relative file names are resolved against (compilation dir)
    root: Option<PathBuf>,
    files: HashMap<String, Vec<String>>,
}

impl SourceCache {
    #[must_use]
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root, files: HashMap::new() }
    }

    /// Lines of `file`, reading it on first use.
    ///
    /// `None` means the file could not be read; the caller should render an
    /// empty region rather than whatever it showed before. Failed reads are
    /// not cached and are retried on the next request.
    pub fn lines_for(&mut self, file: &str) -> Option<&[String]> {
        if !self.files.contains_key(file) {
            let lines = self.load(file)?;
            if self.files.len() >= MAX_CACHED_FILES {
                debug!("Source cache full ({} files), dropping it", self.files.len());
                self.files.clear();
            }
            self.files.insert(file.to_string(), lines);
        }
        self.files.get(file).map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_cached(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn resolve_path(&self, file: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(file),
            None => PathBuf::from(file),
        }
    }

    fn load(&self, file: &str) -> Option<Vec<String>> {
        let path = self.resolve_path(file);
        match read_lines(&path) {
            Ok(lines) => Some(lines),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Source not found: {}", path.display());
                None
            }
            Err(e) => {
                warn!("Failed to read source {}: {e}", path.display());
                None
            }
        }
    }
}

fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect())
}
