//! Error types and handling for the constancia signing core.

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Custom result type for constancia operations
pub type Result<T> = StdResult<T, Error>;

/// Core error type for constancia operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid page range: {0}")]
    InvalidRange(#[from] RangeError),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("PDF structure error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("QR encoding error: {0}")]
    Qr(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether this error is caused by caller-supplied input (bad page
    /// expression, wrong passphrase) rather than a system failure. The CLI
    /// uses this to word its messages.
    pub fn is_user_input(&self) -> bool {
        matches!(self, Error::InvalidRange(_) | Error::Credential(_))
    }
}

// -------------------- Sub-Error Categories --------------------

/// Page-range expression failures, surfaced verbatim to the caller
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RangeError {
    #[error("token {0:?} does not match `n` or `n-m`")]
    BadToken(String),

    #[error("page {page} is outside 1..={max_pages}")]
    OutOfBounds { page: u32, max_pages: u32 },

    #[error("range {start}-{end} is inverted")]
    Inverted { start: u32, end: u32 },

    #[error("expression selects no pages")]
    Empty,
}

/// PKCS#12 container problems, recoverable by retrying with correct input
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CredentialError {
    #[error("malformed PKCS#12 container: {0}")]
    Malformed(String),

    #[error("PKCS#12 passphrase rejected: {0}")]
    BadPassphrase(String),

    #[error("container holds no private key")]
    MissingKey,

    #[error("container holds no certificate")]
    MissingCertificate,
}

/// Failures inside the signing engine, fatal for the current call
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SigningError {
    #[error("CMS signature creation failed: {0}")]
    Cms(String),

    #[error("signed output is empty or unreadable")]
    EmptyOutput,

    #[error("signature ({got} bytes) exceeds reserved placeholder ({max} bytes)")]
    PlaceholderOverflow { got: usize, max: usize },

    #[error("document lacks required structure: {0}")]
    MissingStructure(String),
}

/// Ledger write-path failures. Corrupt reads are deliberately not errors:
/// the store resets to empty in memory and logs a warning instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store write failed: {0}")]
    Write(#[from] io::Error),
}
