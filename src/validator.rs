//! Signature lookup and hash verification.
//!
//! Given a document name and a 1-based page number, scans the ledger for a
//! record that covers that page and whose constancia file still hashes to
//! the recorded digest. Non-matches (missing file, hash mismatch, bad
//! recorded range) are ordinary skips, logged and scanned past; only a
//! record passing both checks is returned.

use std::path::Path;

use tracing::{info, warn};

use crate::hash_utils;
use crate::ledger::{ValidationRecord, ValidationStore};
use crate::page_range;

/// Read-side companion to the workflow, bound to one ledger.
pub struct SignatureValidator {
    store: ValidationStore,
}

impl SignatureValidator {
    pub fn new(store: ValidationStore) -> Self {
        Self { store }
    }

    /// Returns the first record proving `page_number` (1-based) of the named
    /// document was signed and whose constancia hash still matches, or
    /// `None` when nothing qualifies.
    pub fn validate(&self, main_document: &Path, page_number: u32) -> Option<ValidationRecord> {
        let document_name = main_document.file_name()?.to_string_lossy().into_owned();
        info!(document = %document_name, page = page_number, "validation requested");

        let base_dir = main_document.parent().unwrap_or_else(|| Path::new("."));
        self.store
            .load_all()
            .into_iter()
            .filter(|record| record.original_filename == document_name)
            .find(|record| self.record_covers_page(record, page_number, base_dir))
    }

    fn record_covers_page(
        &self,
        record: &ValidationRecord,
        page_number: u32,
        base_dir: &Path,
    ) -> bool {
        match page_range::expression_covers(&record.signed_pages_str, page_number) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!(code = %record.code, error = %e, "record has unparseable page range");
                return false;
            }
        }

        let constancia_path = base_dir.join(&record.constancia_filename);
        if !constancia_path.exists() {
            warn!(code = %record.code, path = %constancia_path.display(), "constancia file missing");
            return false;
        }
        match hash_utils::verify_file_sha256(&constancia_path, &record.sha256_constancia) {
            Ok(true) => {
                info!(code = %record.code, page = page_number, "hash check passed");
                true
            }
            Ok(false) => {
                warn!(code = %record.code, page = page_number, "constancia hash mismatch");
                false
            }
            Err(e) => {
                warn!(code = %record.code, error = %e, "constancia unreadable");
                false
            }
        }
    }
}
