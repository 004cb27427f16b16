//! Content fingerprints: SHA-256 over the exact file bytes, hex-encoded.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash plus length; together they decide whether a file is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash: String,
    pub size_bytes: u64,
}

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self {
            hash: fingerprint(bytes),
            size_bytes: bytes.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_identical_bytes_identical_fingerprint() {
        let a = Fingerprint::of(b"same bytes");
        let b = Fingerprint::of(b"same bytes");
        let c = Fingerprint::of(b"other bytes");
        assert_eq!(a, b);
        assert_ne!(a.hash, c.hash);
        assert_eq!(a.size_bytes, 10);
    }
}
