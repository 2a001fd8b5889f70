//! PKCS#12-backed signature engine.
//!
//! Adds an invisible signature field to the document, re-serializes it with
//! fixed-width ByteRange and Contents placeholders, signs the covered byte
//! ranges with a detached CMS (PKCS#7) signature and splices the DER into
//! the placeholder. The ByteRange excludes exactly the hex Contents string,
//! which is the structure PDF signature validators expect.

use chrono::Utc;
use lopdf::{Dictionary, Document, Object, StringFormat};
use openssl::cms::{CMSOptions, CmsContentInfo};
use openssl::stack::Stack;
use openssl::x509::X509;
use tracing::{debug, info};

use crate::error::{Result, SigningError};

use super::{Credential, SignatureEngine, SignatureMeta};

/// Width of the zero-padded ByteRange integers. 10 decimal digits cover any
/// document under 10 GB.
const BYTE_RANGE_DIGITS: usize = 10;
const BYTE_RANGE_PLACEHOLDER: i64 = 9_999_999_999;

/// Signs documents with an embedded CMS signature over a PKCS#12 identity.
pub struct Pkcs12SignatureEngine {
    /// Bytes reserved for the DER-encoded CMS structure.
    reserved_size: usize,
}

impl Pkcs12SignatureEngine {
    pub fn new() -> Self {
        Self {
            reserved_size: 8192,
        }
    }

    /// Overrides the reserved signature size, for credentials with long
    /// certificate chains.
    pub fn with_reserved_size(mut self, bytes: usize) -> Self {
        self.reserved_size = bytes;
        self
    }

    fn placeholder_len(&self) -> usize {
        // Hex-encoded plus the angle brackets.
        self.reserved_size * 2 + 2
    }

    /// Inserts the signature dictionary, field widget and AcroForm entry,
    /// then returns the re-serialized document bytes.
    fn prepare_document(&self, document: &[u8], meta: &SignatureMeta) -> Result<Vec<u8>> {
        let mut doc = Document::load_mem(document)?;

        let first_page = doc
            .get_pages()
            .values()
            .next()
            .copied()
            .ok_or_else(|| SigningError::MissingStructure("document has no pages".into()))?;
        let root_id = match doc.trailer.get(b"Root") {
            Ok(Object::Reference(id)) => *id,
            _ => {
                return Err(SigningError::MissingStructure("trailer has no catalog".into()).into())
            }
        };

        let mut sig = Dictionary::new();
        sig.set("Type", Object::Name(b"Sig".to_vec()));
        sig.set("Filter", Object::Name(b"Adobe.PPKLite".to_vec()));
        sig.set("SubFilter", Object::Name(b"adbe.pkcs7.detached".to_vec()));
        sig.set(
            "ByteRange",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(BYTE_RANGE_PLACEHOLDER),
                Object::Integer(BYTE_RANGE_PLACEHOLDER),
                Object::Integer(BYTE_RANGE_PLACEHOLDER),
            ]),
        );
        sig.set(
            "Contents",
            Object::String(vec![0u8; self.reserved_size], StringFormat::Hexadecimal),
        );
        sig.set(
            "Reason",
            Object::String(latin1(&meta.reason), StringFormat::Literal),
        );
        sig.set(
            "Location",
            Object::String(latin1(&meta.location), StringFormat::Literal),
        );
        sig.set(
            "M",
            Object::String(
                Utc::now()
                    .format("D:%Y%m%d%H%M%S+00'00'")
                    .to_string()
                    .into_bytes(),
                StringFormat::Literal,
            ),
        );
        let sig_id = doc.add_object(Object::Dictionary(sig));

        // Invisible widget: zero-area rect, printed flag set.
        let mut widget = Dictionary::new();
        widget.set("Type", Object::Name(b"Annot".to_vec()));
        widget.set("Subtype", Object::Name(b"Widget".to_vec()));
        widget.set("FT", Object::Name(b"Sig".to_vec()));
        widget.set(
            "Rect",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(0),
            ]),
        );
        widget.set(
            "T",
            Object::String(latin1(&meta.field_name), StringFormat::Literal),
        );
        widget.set("F", Object::Integer(132));
        widget.set("V", Object::Reference(sig_id));
        widget.set("P", Object::Reference(first_page));
        let widget_id = doc.add_object(Object::Dictionary(widget));

        let mut annots = match doc.get_dictionary(first_page)?.get(b"Annots") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(other) => vec![other.clone()],
            Err(_) => vec![],
        };
        annots.push(Object::Reference(widget_id));
        let page = doc.get_object_mut(first_page).and_then(Object::as_dict_mut)?;
        page.set("Annots", Object::Array(annots));

        let mut acroform = Dictionary::new();
        acroform.set("Fields", Object::Array(vec![Object::Reference(widget_id)]));
        acroform.set("SigFlags", Object::Integer(3));
        let catalog = doc.get_object_mut(root_id).and_then(Object::as_dict_mut)?;
        catalog.set("AcroForm", Object::Dictionary(acroform));

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }
}

impl Default for Pkcs12SignatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureEngine for Pkcs12SignatureEngine {
    fn sign(
        &self,
        document: &[u8],
        credential: &Credential,
        meta: &SignatureMeta,
    ) -> Result<Vec<u8>> {
        let mut out = self.prepare_document(document, meta)?;

        let range_start = rfind(&out, b"/ByteRange")
            .ok_or_else(|| SigningError::MissingStructure("ByteRange not emitted".into()))?;
        let contents_open = find_from(&out, b"/Contents", range_start)
            .and_then(|p| find_from(&out, b"<", p))
            .ok_or_else(|| SigningError::MissingStructure("Contents not emitted".into()))?;

        let placeholder_len = self.placeholder_len();
        let contents_end = contents_open + placeholder_len;
        if contents_end > out.len() {
            return Err(SigningError::MissingStructure("Contents truncated".into()).into());
        }

        // [0, up to the '<', from after the '>', to end of file]
        let byte_range = [
            0i64,
            contents_open as i64,
            contents_end as i64,
            (out.len() - contents_end) as i64,
        ];
        write_byte_range(&mut out, range_start, &byte_range)?;
        debug!(?byte_range, "signature byte range fixed");

        let mut signed_bytes = Vec::with_capacity(out.len() - placeholder_len);
        signed_bytes.extend_from_slice(&out[..contents_open]);
        signed_bytes.extend_from_slice(&out[contents_end..]);

        let mut chain = Stack::<X509>::new().map_err(|e| SigningError::Cms(e.to_string()))?;
        for cert in credential.chain() {
            chain
                .push(cert.clone())
                .map_err(|e| SigningError::Cms(e.to_string()))?;
        }
        let cms = CmsContentInfo::sign(
            Some(credential.certificate()),
            Some(credential.private_key()),
            Some(&chain),
            Some(&signed_bytes),
            CMSOptions::DETACHED | CMSOptions::BINARY | CMSOptions::NOSMIMECAP,
        )
        .map_err(|e| SigningError::Cms(e.to_string()))?;
        let der = cms.to_der().map_err(|e| SigningError::Cms(e.to_string()))?;

        if der.len() > self.reserved_size {
            return Err(SigningError::PlaceholderOverflow {
                got: der.len(),
                max: self.reserved_size,
            }
            .into());
        }

        // Hex in place; the remainder of the placeholder stays zero-padded.
        let hex = hex::encode_upper(&der);
        out[contents_open + 1..contents_open + 1 + hex.len()].copy_from_slice(hex.as_bytes());

        info!(signature_bytes = der.len(), "document signed");
        Ok(out)
    }
}

/// Rewrites the serialized ByteRange array with zero-padded actual values,
/// keeping the byte length of the array unchanged.
fn write_byte_range(out: &mut [u8], range_start: usize, byte_range: &[i64; 4]) -> Result<()> {
    let open = find_from(out, b"[", range_start)
        .ok_or_else(|| SigningError::MissingStructure("ByteRange array not found".into()))?;
    let close = find_from(out, b"]", open)
        .ok_or_else(|| SigningError::MissingStructure("ByteRange array not closed".into()))?;

    let rendered = format!(
        "0 {:0w$} {:0w$} {:0w$}",
        byte_range[1],
        byte_range[2],
        byte_range[3],
        w = BYTE_RANGE_DIGITS
    );
    let region = &mut out[open + 1..close];
    if rendered.len() != region.len() {
        return Err(SigningError::MissingStructure("ByteRange placeholder width mismatch".into()).into());
    }
    region.copy_from_slice(rendered.as_bytes());
    Ok(())
}

fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_range_rewrite_preserves_length() {
        let mut buf =
            b"xx/ByteRange [0 9999999999 9999999999 9999999999] yy".to_vec();
        let before = buf.len();
        write_byte_range(&mut buf, 0, &[0, 123, 456, 789]).unwrap();
        assert_eq!(buf.len(), before);
        assert!(buf
            .windows(14)
            .any(|w| w == b"[0 0000000123 ".as_slice()));
    }

    #[test]
    fn find_helpers() {
        let data = b"aa/Contents <00> /Contents <11>";
        assert_eq!(find_from(data, b"/Contents", 0), Some(2));
        assert_eq!(rfind(data, b"/Contents"), Some(17));
        assert_eq!(find_from(data, b"<", 2), Some(12));
    }
}
