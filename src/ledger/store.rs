//! JSON-backed ledger store.
//!
//! A flat JSON array on disk, UTF-8, pretty-printed with 2-space indent.
//! Appends are whole-file read-modify-write, which is fine for a low-volume
//! audit log but NOT safe under concurrent writers: this store assumes a
//! single process and effectively a single writer. Multi-process signing
//! needs external mutual exclusion (e.g. a file lock) on top.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{LedgerError, Result};

use super::ValidationRecord;

/// Handle to one ledger file. No state is cached; every operation goes to
/// disk.
#[derive(Debug, Clone)]
pub struct ValidationStore {
    path: PathBuf,
}

impl ValidationStore {
    /// Opens the store, creating an empty ledger (`[]`) if none exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(LedgerError::Write)?;
                }
            }
            fs::write(&path, "[]").map_err(LedgerError::Write)?;
            debug!(path = %path.display(), "created empty ledger");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record, in insertion order.
    ///
    /// Reads are permissive: a missing or corrupt file is treated as an
    /// empty store with a warning, never an error. The on-disk file is left
    /// alone; it is only rewritten by the next successful append.
    pub fn load_all(&self) -> Vec<ValidationRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ledger unreadable, treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ledger corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    /// Appends one record durably: load everything, push, rewrite the whole
    /// array pretty-printed.
    pub fn append(&self, record: &ValidationRecord) -> Result<()> {
        let mut records = self.load_all();
        records.push(record.clone());
        let json = serde_json::to_string_pretty(&records).map_err(LedgerError::Serialize)?;
        fs::write(&self.path, json).map_err(LedgerError::Write)?;
        debug!(code = %record.code, total = records.len(), "ledger record appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(code: &str) -> ValidationRecord {
        ValidationRecord::new(
            code.into(),
            "demo_user".into(),
            "doc.pdf".into(),
            format!("constancias/doc_constancia_{}.pdf", &code[..8.min(code.len())]),
            "1-2".into(),
            "ff".repeat(32),
        )
    }

    #[test]
    fn open_creates_empty_array_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validaciones.json");
        let store = ValidationStore::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn open_leaves_existing_ledger_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validaciones.json");
        let store = ValidationStore::open(&path).unwrap();
        store.append(&record(&"ab".repeat(16))).unwrap();
        let reopened = ValidationStore::open(&path).unwrap();
        assert_eq!(reopened.load_all().len(), 1);
    }

    #[test]
    fn hundred_appends_preserve_order_and_unique_codes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ValidationStore::open(dir.path().join("v.json")).unwrap();
        for _ in 0..100 {
            store.append(&record(&crate::code::new_code())).unwrap();
        }
        let records = store.load_all();
        assert_eq!(records.len(), 100);
        let codes: HashSet<&str> = records.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes.len(), 100);

        // And the file itself is parseable JSON with 2-space indentation.
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.starts_with("[\n  {"));
        assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
    }

    #[test]
    fn corrupt_ledger_reads_as_empty_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        fs::write(&path, "{ not json ]").unwrap();
        let store = ValidationStore::open(&path).unwrap();
        assert!(store.load_all().is_empty());
        // The corrupt content is not eagerly repaired.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json ]");
    }

    #[test]
    fn append_after_corruption_resets_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        fs::write(&path, "garbage").unwrap();
        let store = ValidationStore::open(&path).unwrap();
        store.append(&record(&"cd".repeat(16))).unwrap();
        assert_eq!(store.load_all().len(), 1);
    }
}
