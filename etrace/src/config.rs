//! Optional JSON configuration for the viewer.
//!
//! ```json
//! {
//!   "comp_dir": "/work/firmware",
//!   "addr2line": "riscv64-unknown-elf-addr2line",
//!   "address_map": [
//!     { "start": "0xffff0000", "end": "0xffff8000", "to": "0x0" }
//!   ]
//! }
//! ```
//!
//! Every field is optional. Command-line flags take precedence over the file.

use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::ConfigError;
use crate::symbolization::{AddressMap, RemapRule};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory that relative source paths are resolved against
    pub comp_dir: Option<PathBuf>,
    /// Symbolizer program to spawn instead of `addr2line`
    pub addr2line: Option<String>,
    #[serde(default)]
    pub address_map: Vec<RemapRule>,
}

impl Config {
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid config JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        info!(
            "Loaded config {} ({} address map rules)",
            path.display(),
            config.address_map.len()
        );
        Ok(config)
    }

    /// Replace file values with any that were given on the command line
    #[must_use]
    pub fn with_overrides(mut self, comp_dir: Option<PathBuf>, addr2line: Option<String>) -> Self {
        if comp_dir.is_some() {
            self.comp_dir = comp_dir;
        }
        if addr2line.is_some() {
            self.addr2line = addr2line;
        }
        self
    }

    /// Address transform for the resolver, `None` when no rules are configured
    ///
    /// # Errors
    /// Returns an error if a rule covers an empty range
    pub fn address_map(&self) -> Result<Option<AddressMap>, ConfigError> {
        if self.address_map.is_empty() {
            return Ok(None);
        }
        AddressMap::new(self.address_map.clone()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(text: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etrace.json");
        std::fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_full_config() {
        let (_dir, path) = write_config(
            r#"{
                "comp_dir": "/src",
                "addr2line": "riscv64-unknown-elf-addr2line",
                "address_map": [
                    { "start": "0xffff0000", "end": "0xffff8000", "to": 0 },
                    { "start": 4096, "end": "8192", "to": "0x80000000" }
                ]
            }"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.comp_dir, Some(PathBuf::from("/src")));
        assert_eq!(config.address_map[1], RemapRule { start: 0x1000, end: 0x2000, to: 0x8000_0000 });

        let map = config.address_map().unwrap().unwrap();
        assert_eq!(map.apply(0xffff_0010), 0x10);
        assert_eq!(map.apply(0x1004), 0x8000_0004);
    }

    #[test]
    fn test_empty_config_has_no_transform() {
        let (_dir, path) = write_config("{}");
        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.address_map().unwrap().is_none());
    }

    #[test]
    fn test_invalid_config_errors() {
        let (_dir, path) = write_config(r#"{ "address_map": [ { "start": "0xzz", "end": 1, "to": 0 } ] }"#);
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));

        let (_dir, path) = write_config(r#"{ "unknown": true }"#);
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));

        assert!(matches!(Config::load("/nonexistent/etrace.json"), Err(ConfigError::Read { .. })));

        let (_dir, path) = write_config(r#"{ "address_map": [ { "start": 8, "end": 8, "to": 0 } ] }"#);
        let config = Config::load(&path).unwrap();
        assert!(matches!(config.address_map(), Err(ConfigError::EmptyRange { .. })));
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let config = Config { comp_dir: Some("/a".into()), addr2line: Some("a2l".into()), address_map: vec![] };
        let merged = config.clone().with_overrides(Some("/b".into()), None);
        assert_eq!(merged.comp_dir, Some(PathBuf::from("/b")));
        assert_eq!(merged.addr2line.as_deref(), Some("a2l"));
        assert_eq!(config.with_overrides(None, None).comp_dir, Some(PathBuf::from("/a")));
    }
}
