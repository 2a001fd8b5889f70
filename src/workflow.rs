//! Constancia signing workflow.
//!
//! Strictly sequential stage machine; a failure in any stage aborts the
//! whole operation. The original document and the ledger are only touched
//! after the signed constancia is durably on disk with its hash recorded,
//! so a ledger record always refers to an existing, matching constancia.
//! The record is appended *before* the original is stamped: an unstamped
//! original with a ledger entry is recoverable, the reverse is not.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::{info, instrument};

use crate::code;
use crate::config::WorkflowConfig;
use crate::error::Result;
use crate::hash_utils;
use crate::ledger::{ValidationRecord, ValidationStore};
use crate::page_range;
use crate::pdf::{extract_pages, Stamper};
use crate::signing::{Credential, SignatureEngine, SignatureMeta, SigningAdapter};

/// Stages of one signing operation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    ParsingRange,
    Extracting,
    GeneratingCode,
    Overlaying,
    Signing,
    Persisting,
    RecordingLedger,
    StampingOriginal,
    Done,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStage::ParsingRange => "parsing range",
            WorkflowStage::Extracting => "extracting pages",
            WorkflowStage::GeneratingCode => "generating code",
            WorkflowStage::Overlaying => "overlaying QR",
            WorkflowStage::Signing => "signing",
            WorkflowStage::Persisting => "persisting constancia",
            WorkflowStage::RecordingLedger => "recording ledger",
            WorkflowStage::StampingOriginal => "stamping original",
            WorkflowStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// One signing request, as handed over by the shell.
#[derive(Debug, Clone)]
pub struct SignRequest<'a> {
    pub main_document: &'a Path,
    pub credential_path: &'a Path,
    pub credential_password: &'a str,
    pub page_range: &'a str,
    pub user: &'a str,
}

/// Orchestrates parse → extract → code → overlay → sign → persist →
/// ledger → stamp for one document at a time. Synchronous and blocking
/// throughout; each call is independent and mints a fresh code.
pub struct ConstanciaWorkflow<E: SignatureEngine> {
    config: WorkflowConfig,
    adapter: SigningAdapter<E>,
    store: ValidationStore,
}

impl<E: SignatureEngine> ConstanciaWorkflow<E> {
    pub fn new(config: WorkflowConfig, engine: E) -> Result<Self> {
        let store = ValidationStore::open(&config.ledger_path)?;
        Ok(Self {
            config,
            adapter: SigningAdapter::new(engine),
            store,
        })
    }

    pub fn store(&self) -> &ValidationStore {
        &self.store
    }

    /// Produces a signed constancia for the requested pages, returning the
    /// appended ledger record and the QR PNG for display.
    #[instrument(skip(self, request), fields(document = %request.main_document.display()))]
    pub fn create_signed_constancia(
        &self,
        request: &SignRequest<'_>,
    ) -> Result<(ValidationRecord, Vec<u8>)> {
        info!(stage = %WorkflowStage::ParsingRange, range = request.page_range);
        let original = Document::load(request.main_document)?;
        let total_pages = original.get_pages().len() as u32;
        let pages = page_range::parse(request.page_range, total_pages)?;
        // Credential problems also abort before any filesystem mutation.
        let credential =
            Credential::from_pkcs12_file(request.credential_path, request.credential_password)?;

        info!(stage = %WorkflowStage::Extracting, selected = pages.len(), total = total_pages);
        let mut constancia_doc = extract_pages(&original, &pages)?;

        info!(stage = %WorkflowStage::GeneratingCode);
        let code = code::new_code();
        let url = format!("{}{}", self.config.validation_base_url, code);
        let qr_png = code::qr_png(&url)?;

        info!(stage = %WorkflowStage::Overlaying, code = %code);
        let caption = format!("Código de validación: {code}");
        let stamper = Stamper::new(&qr_png, &caption, self.config.qr_position, self.config.qr_size);
        stamper.stamp_first_page(&mut constancia_doc)?;
        let mut stamped_bytes = Vec::new();
        constancia_doc.save_to(&mut stamped_bytes)?;

        info!(stage = %WorkflowStage::Signing);
        let meta = SignatureMeta {
            reason: self.config.reason.clone(),
            location: self.config.location.clone(),
            field_name: self.config.field_name.clone(),
        };
        let signed = self.adapter.sign(&stamped_bytes, &credential, &meta)?;

        info!(stage = %WorkflowStage::Persisting);
        let constancia_rel = self.constancia_relative_path(request.main_document, &code);
        let base_dir = request
            .main_document
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let constancia_path = base_dir.join(&constancia_rel);
        if let Some(parent) = constancia_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&constancia_path, &signed)?;
        let sha256 = hash_utils::sha256_file(&constancia_path)?;

        info!(stage = %WorkflowStage::RecordingLedger);
        let original_filename = request
            .main_document
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let record = ValidationRecord::new(
            code,
            request.user.to_string(),
            original_filename,
            constancia_rel.to_string_lossy().into_owned(),
            request.page_range.to_string(),
            sha256,
        );
        self.store.append(&record)?;

        info!(stage = %WorkflowStage::StampingOriginal);
        let mut original = original;
        stamper.stamp_pages(&mut original, &pages)?;
        original.save(request.main_document)?;

        info!(stage = %WorkflowStage::Done, constancia = %constancia_path.display());
        Ok((record, qr_png))
    }

    /// `{constancia_dir}/{stem}_constancia_{first 8 hex of code}.pdf`,
    /// relative to the original document's directory.
    fn constancia_relative_path(&self, main_document: &Path, code: &str) -> PathBuf {
        let stem = main_document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "documento".into());
        PathBuf::from(&self.config.constancia_dir)
            .join(format!("{}_constancia_{}.pdf", stem, &code[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::Pkcs12SignatureEngine;

    #[test]
    fn constancia_filename_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkflowConfig {
            ledger_path: dir.path().join("v.json"),
            ..WorkflowConfig::default()
        };
        let workflow = ConstanciaWorkflow::new(config, Pkcs12SignatureEngine::new()).unwrap();
        let rel = workflow.constancia_relative_path(
            Path::new("/tmp/expediente.pdf"),
            "deadbeefcafebabe0000111122223333",
        );
        assert_eq!(
            rel,
            PathBuf::from("constancias/expediente_constancia_deadbeef.pdf")
        );
    }

    #[test]
    fn stage_order_matches_design() {
        use WorkflowStage::*;
        let order = [
            ParsingRange,
            Extracting,
            GeneratingCode,
            Overlaying,
            Signing,
            Persisting,
            RecordingLedger,
            StampingOriginal,
            Done,
        ];
        assert_eq!(order.len(), 9);
        assert_eq!(format!("{}", RecordingLedger), "recording ledger");
    }
}
