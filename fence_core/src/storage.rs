//! `KvStore` backends: a TOML file on disk and an in-memory map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fence_traits::{BoxError, KvStore};
use tracing::{debug, warn};

use crate::atomic::write_atomic;

/// Flat TOML file of `key = value` pairs.
///
/// Opening never fails: a missing or unparsable file reads as empty so the
/// calibration loader can fall back to defaults.
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
    table: toml::Table,
}

impl TomlFileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let table = match std::fs::read_to_string(&path) {
            Ok(text) => match text.parse::<toml::Table>() {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "calibration file unreadable; ignoring");
                    toml::Table::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no calibration file yet");
                toml::Table::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read calibration file; ignoring");
                toml::Table::new()
            }
        };
        Self { path, table }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for TomlFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.table.get(key).map(|v| match v {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    fn put_all(&mut self, entries: &[(&'static str, String)]) -> Result<(), BoxError> {
        let mut next = self.table.clone();
        for (k, v) in entries {
            next.insert((*k).to_string(), toml::Value::String(v.clone()));
        }
        let text = toml::to_string(&next)?;
        write_atomic(&self.path, text.as_bytes())?;
        self.table = next;
        Ok(())
    }
}

/// In-memory store; `failing()` rejects every write.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    map: BTreeMap<String, String>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.map.insert(key.to_string(), value.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn put_all(&mut self, entries: &[(&'static str, String)]) -> Result<(), BoxError> {
        if self.fail_writes {
            return Err("store is read-only".into());
        }
        for (k, v) in entries {
            self.map.insert((*k).to_string(), v.clone());
        }
        Ok(())
    }
}
