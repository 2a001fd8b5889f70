//! SHA-256 helpers for constancia integrity checks.
//!
//! Every ledger record carries the hex digest of its constancia file; the
//! validator recomputes it here. Files are hashed in 8 KiB chunks so large
//! documents never land in memory whole.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Hashes a byte slice, returning the lowercase hex digest.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hashes file content at the given path with a streaming read.
pub fn sha256_file(path: &Path) -> Result<String, std::io::Error> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Verifies file content against an expected hex digest.
pub fn verify_file_sha256(path: &Path, expected: &str) -> Result<bool, std::io::Error> {
    Ok(sha256_file(path)?.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_is_hex_sha256() {
        let digest = sha256_bytes(b"constancia");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn file_and_bytes_digests_agree() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"some signed content").unwrap();
        tmp.flush().unwrap();
        assert_eq!(
            sha256_file(tmp.path()).unwrap(),
            sha256_bytes(b"some signed content")
        );
    }

    #[test]
    fn verify_detects_single_byte_change() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"original").unwrap();
        tmp.flush().unwrap();
        let digest = sha256_file(tmp.path()).unwrap();
        assert!(verify_file_sha256(tmp.path(), &digest).unwrap());

        tmp.write_all(b"x").unwrap();
        tmp.flush().unwrap();
        assert!(!verify_file_sha256(tmp.path(), &digest).unwrap());
    }
}
