//! SHA-256 checksums for backed-up files

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Whether `data` hashes to `expected` (hex, case-insensitive).
///
/// Uses constant-time comparison.
pub fn matches_sha256(data: &[u8], expected: &str) -> bool {
    let computed = sha256_hex(data);
    let expected = expected.to_ascii_lowercase();

    if computed.len() != expected.len() {
        return false;
    }

    let mut diff = 0u8;
    for (a, b) in computed.bytes().zip(expected.bytes()) {
        diff |= a ^ b;
    }
    diff == 0
}
