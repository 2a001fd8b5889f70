//! Ledger record for one successful signing operation.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Immutable value recorded once per signed constancia. Never mutated after
/// creation; the store only ever appends.
///
/// `sha256_constancia` pins the constancia file's content at persistence
/// time. Later modification of the file invalidates the record without
/// deleting it; the validator detects the mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Opaque unique 128-bit hex code; also the QR payload suffix.
    pub code: String,
    /// Acting user, caller-supplied free text.
    pub user: String,
    /// ISO-8601 UTC timestamp of record creation.
    pub datetime_utc: String,
    /// Name of the source document at signing time.
    pub original_filename: String,
    /// Path of the signed subset document, relative to the original's directory.
    pub constancia_filename: String,
    /// The page-range expression as the user typed it, verbatim for audit.
    pub signed_pages_str: String,
    /// Hex SHA-256 of the constancia file at the moment of persistence.
    pub sha256_constancia: String,
}

impl ValidationRecord {
    /// Stamps a new record with the current UTC time.
    pub fn new(
        code: String,
        user: String,
        original_filename: String,
        constancia_filename: String,
        signed_pages_str: String,
        sha256_constancia: String,
    ) -> Self {
        Self {
            code,
            user,
            datetime_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            original_filename,
            constancia_filename,
            signed_pages_str,
            sha256_constancia,
        }
    }
}
