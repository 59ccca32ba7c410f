//! Short, stable digests for log fields.

use sha2::{Digest, Sha256};

use crate::ResourceLocator;

/// Compute the SHA-256 hex digest of a locator's canonical form.
pub fn locator_digest(locator: &ResourceLocator) -> String {
    let mut hasher = Sha256::new();
    hasher.update(locator.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// First 12 hex chars of [`locator_digest`], enough to correlate log lines.
pub fn short_digest(locator: &ResourceLocator) -> String {
    let mut digest = locator_digest(locator);
    digest.truncate(12);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(s: &str) -> ResourceLocator {
        ResourceLocator::parse(s).unwrap()
    }

    #[test]
    fn test_hash_stability() {
        let hash1 = locator_digest(&locator("https://example.com/a.png"));
        let hash2 = locator_digest(&locator("https://EXAMPLE.com/a.png"));
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_locators() {
        assert_ne!(
            locator_digest(&locator("https://example.com/a.png")),
            locator_digest(&locator("https://example.com/b.png"))
        );
    }

    #[test]
    fn test_hash_format() {
        let hash = locator_digest(&locator("https://example.com"));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(short_digest(&locator("https://example.com")), hash[..12]);
    }
}
