use {
    sha2::{Digest, Sha256},
    sitewatch_common::Fingerprint,
};

/// SHA-256 of the canonical text's UTF-8 bytes.
pub fn fingerprint(canonical: &str) -> Fingerprint {
    Fingerprint::from_digest(&Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        assert_eq!(
            fingerprint("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            fingerprint("hello world").as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn distinct_text_distinct_fingerprint() {
        assert_ne!(fingerprint("price: 100"), fingerprint("price: 120"));
        assert_eq!(fingerprint("同じ"), fingerprint("同じ"));
    }
}
