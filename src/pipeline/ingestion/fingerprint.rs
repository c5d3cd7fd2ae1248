use sha2::{Digest, Sha256};

/// Content fingerprint of an upload: sha256 hex over the exact raw bytes.
///
/// Identity is byte-level, not semantic: the same data re-saved with
/// different line endings or a BOM fingerprints differently and is treated
/// as a new upload.
pub fn fingerprint(raw: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw);
    hex::encode(hasher.finalize())
}
