//! Constancia signing and validation for PDF documents.
//!
//! Extracts a user-selected page subset of a PDF, watermarks it with a
//! validation QR code, applies a PKCS#12-backed digital signature, records
//! the result in an append-only JSON ledger, and later re-validates a
//! document/page pair against that ledger by content hash.

// Configuration and shared plumbing
pub mod config;
pub mod error;
pub mod hash_utils;

// Inputs: page selection and validation codes
pub mod code;
pub mod page_range;

// Document manipulation: subset extraction and QR overlay
pub mod pdf;

// Digital signing
pub mod signing;

// Persistence and validation
pub mod ledger;
pub mod validator;

// Orchestration
pub mod workflow;

pub use config::WorkflowConfig;
pub use error::{Error, Result};
pub use ledger::{ValidationRecord, ValidationStore};
pub use page_range::PageSet;
pub use signing::{Credential, Pkcs12SignatureEngine, SignatureEngine, SignatureMeta, SigningAdapter};
pub use validator::SignatureValidator;
pub use workflow::{ConstanciaWorkflow, SignRequest, WorkflowStage};
