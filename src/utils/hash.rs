//! Hashing utilities

use sha2::{Sha256, Digest};

/// SHA-256 of `data` as lowercase hex
pub fn image_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let hash = hasher.finalize();

    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Cache key for an image scanned with a given segment and name prefix
pub fn cache_key(digest: &str, segment: &str, prefix: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(digest.as_bytes());
    hasher.update([0u8]);
    hasher.update(segment.as_bytes());
    hasher.update([0u8]);
    hasher.update(prefix.as_bytes());
    let hash = hasher.finalize();

    hash.iter().map(|b| format!("{:02x}", b)).collect()
}
