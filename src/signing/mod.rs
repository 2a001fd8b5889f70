//! Cryptographic signing capability.
//!
//! The workflow never talks to a concrete signing library directly: it goes
//! through [`SignatureEngine`], a narrow capability interface (`sign bytes
//! with a credential, get signed bytes back`), so the engine is swappable
//! and mockable. [`Pkcs12SignatureEngine`] is the production implementation.

pub mod engine;

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use tracing::debug;

use crate::error::{CredentialError, Result, SigningError};

pub use engine::Pkcs12SignatureEngine;

/// A signing identity loaded from a PKCS#12 container.
pub struct Credential {
    pkey: PKey<Private>,
    cert: X509,
    chain: Vec<X509>,
}

impl Credential {
    /// Loads and opens a PKCS#12 container from disk.
    pub fn from_pkcs12_file(path: &Path, passphrase: &str) -> Result<Self> {
        let der = fs::read(path)?;
        Self::from_pkcs12_der(&der, passphrase)
    }

    /// Opens a PKCS#12 container from DER bytes. A container that does not
    /// parse is malformed; one that parses but does not open is a wrong
    /// passphrase.
    pub fn from_pkcs12_der(der: &[u8], passphrase: &str) -> Result<Self> {
        let pkcs12 =
            Pkcs12::from_der(der).map_err(|e| CredentialError::Malformed(e.to_string()))?;
        let parsed = pkcs12
            .parse2(passphrase)
            .map_err(|e| CredentialError::BadPassphrase(e.to_string()))?;
        let pkey = parsed.pkey.ok_or(CredentialError::MissingKey)?;
        let cert = parsed.cert.ok_or(CredentialError::MissingCertificate)?;
        let chain = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();
        Ok(Self { pkey, cert, chain })
    }

    pub fn private_key(&self) -> &PKey<Private> {
        &self.pkey
    }

    pub fn certificate(&self) -> &X509 {
        &self.cert
    }

    pub fn chain(&self) -> &[X509] {
        &self.chain
    }
}

// Hand-written so key material never reaches log output.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("chain_certs", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Metadata embedded in the signature dictionary.
#[derive(Debug, Clone)]
pub struct SignatureMeta {
    pub reason: String,
    pub location: String,
    pub field_name: String,
}

/// The external signing capability: sign a finalized document byte stream
/// with a credential and produce a standards-compliant signed document.
pub trait SignatureEngine {
    fn sign(&self, document: &[u8], credential: &Credential, meta: &SignatureMeta)
        -> Result<Vec<u8>>;
}

/// Wraps an engine with the input normalization signing requires.
///
/// Documents arriving here are in-memory artifacts of earlier overlay
/// stages. Signing needs a finalized, stable byte stream, so the adapter
/// round-trips the bytes through a temporary file before invoking the
/// engine. The temp file is removed on every exit path (drop-guarded).
pub struct SigningAdapter<E: SignatureEngine> {
    engine: E,
}

impl<E: SignatureEngine> SigningAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn sign(
        &self,
        document: &[u8],
        credential: &Credential,
        meta: &SignatureMeta,
    ) -> Result<Vec<u8>> {
        let mut tmp = tempfile::NamedTempFile::new()?;
        tmp.write_all(document)?;
        tmp.flush()?;
        debug!(size = document.len(), "normalized document through {}", tmp.path().display());
        let normalized = fs::read(tmp.path())?;

        let signed = self.engine.sign(&normalized, credential, meta)?;
        if signed.is_empty() || !signed.starts_with(b"%PDF-") {
            return Err(SigningError::EmptyOutput.into());
        }
        Ok(signed)
    }
}
