//! Cryptographic Utilities
//!
//! Digest helpers used to derive certificate identifiers. Nothing here is a
//! secret-handling primitive: inputs are public or derivable fields.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest
pub const SHA256_HEX_LEN: usize = 64;

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lower-case hex encoding of the SHA-256 digest
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// First `len` hex characters of the SHA-256 digest
///
/// `len` is clamped to [`SHA256_HEX_LEN`].
pub fn sha256_hex_prefix(data: &[u8], len: usize) -> String {
    let mut digest = sha256_hex(data);
    digest.truncate(len.min(SHA256_HEX_LEN));
    digest
}
