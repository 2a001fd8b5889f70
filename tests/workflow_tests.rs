//! End-to-end signing workflow tests.

mod common;

use std::fs;

use constancia::{
    ConstanciaWorkflow, Error, Pkcs12SignatureEngine, SignRequest, WorkflowConfig,
};
use lopdf::Document;

fn test_config(dir: &std::path::Path) -> WorkflowConfig {
    WorkflowConfig {
        ledger_path: dir.join("validaciones.json"),
        ..WorkflowConfig::default()
    }
}

#[test]
fn signs_a_page_subset_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let document = common::write_pdf(dir.path(), "expediente.pdf", 10);
    let credential = common::write_credential(dir.path());

    let config = test_config(dir.path());
    let workflow = ConstanciaWorkflow::new(config, Pkcs12SignatureEngine::new()).unwrap();
    let request = SignRequest {
        main_document: &document,
        credential_path: &credential,
        credential_password: common::TEST_PASSPHRASE,
        page_range: "1-3,7",
        user: "maria",
    };

    let (record, qr_png) = workflow.create_signed_constancia(&request).unwrap();

    assert_eq!(record.user, "maria");
    assert_eq!(record.original_filename, "expediente.pdf");
    assert_eq!(record.signed_pages_str, "1-3,7");
    assert_eq!(record.code.len(), 32);
    assert!(record.code.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(qr_png.starts_with(&[0x89, b'P', b'N', b'G']));

    // The constancia holds exactly the selected pages and carries the
    // signature structure.
    let constancia_path = dir.path().join(&record.constancia_filename);
    assert!(constancia_path.exists());
    let bytes = fs::read(&constancia_path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(bytes.windows(10).any(|w| w == b"/ByteRange"));
    let constancia = Document::load_mem(&bytes).unwrap();
    assert_eq!(constancia.get_pages().len(), 4);

    // The recorded hash matches the file on disk.
    let sha = constancia::hash_utils::sha256_file(&constancia_path).unwrap();
    assert_eq!(sha, record.sha256_constancia);

    // The ledger holds the record, and the original is still a readable
    // 10-page document after stamping.
    let records = workflow.store().load_all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].code, record.code);
    let original = Document::load(&document).unwrap();
    assert_eq!(original.get_pages().len(), 10);
}

#[test]
fn each_signing_mints_a_distinct_code() {
    let dir = tempfile::tempdir().unwrap();
    let document = common::write_pdf(dir.path(), "expediente.pdf", 5);
    let credential = common::write_credential(dir.path());

    let workflow =
        ConstanciaWorkflow::new(test_config(dir.path()), Pkcs12SignatureEngine::new()).unwrap();
    let request = SignRequest {
        main_document: &document,
        credential_path: &credential,
        credential_password: common::TEST_PASSPHRASE,
        page_range: "1",
        user: "maria",
    };

    let (first, _) = workflow.create_signed_constancia(&request).unwrap();
    let (second, _) = workflow.create_signed_constancia(&request).unwrap();
    assert_ne!(first.code, second.code);
    assert_ne!(first.constancia_filename, second.constancia_filename);
    assert_eq!(workflow.store().load_all().len(), 2);
}

#[test]
fn out_of_bounds_range_aborts_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let document = common::write_pdf(dir.path(), "expediente.pdf", 3);
    let credential = common::write_credential(dir.path());
    let before = fs::read(&document).unwrap();

    let workflow =
        ConstanciaWorkflow::new(test_config(dir.path()), Pkcs12SignatureEngine::new()).unwrap();
    let request = SignRequest {
        main_document: &document,
        credential_path: &credential,
        credential_password: common::TEST_PASSPHRASE,
        page_range: "2-9",
        user: "maria",
    };

    let err = workflow.create_signed_constancia(&request).unwrap_err();
    assert!(err.is_user_input());
    assert!(matches!(err, Error::InvalidRange(_)));
    assert_eq!(fs::read(&document).unwrap(), before);
    assert!(!dir.path().join("constancias").exists());
    assert!(workflow.store().load_all().is_empty());
}

#[test]
fn wrong_passphrase_aborts_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let document = common::write_pdf(dir.path(), "expediente.pdf", 3);
    let credential = common::write_credential(dir.path());
    let before = fs::read(&document).unwrap();

    let workflow =
        ConstanciaWorkflow::new(test_config(dir.path()), Pkcs12SignatureEngine::new()).unwrap();
    let request = SignRequest {
        main_document: &document,
        credential_path: &credential,
        credential_password: "not-the-passphrase",
        page_range: "1-2",
        user: "maria",
    };

    let err = workflow.create_signed_constancia(&request).unwrap_err();
    assert!(matches!(err, Error::Credential(_)));
    assert_eq!(fs::read(&document).unwrap(), before);
    assert!(!dir.path().join("constancias").exists());
}
