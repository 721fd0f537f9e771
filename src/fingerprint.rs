//! Content fingerprints used as the article uniqueness key
//!
//! A fingerprint is the SHA-256 digest of designated fields concatenated in a
//! fixed order with no separator. The two source families hash different
//! field pairs but share the digest format.

use sha2::{Digest, Sha256};
use std::fmt;

/// A 256-bit content digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form, as stored in the database
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses the 64-character hex form
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Computes the fingerprint of `fields` in the given order
///
/// # Examples
///
/// ```
/// use newsfusion::fingerprint;
///
/// let a = fingerprint(&["Monsoon arrives early", "Rains hit Kerala"]);
/// let b = fingerprint(&["Monsoon arrives early", "Rains hit Kerala"]);
/// assert_eq!(a, b);
/// ```
pub fn fingerprint(fields: &[&str]) -> Fingerprint {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
    }
    Fingerprint(hasher.finalize().into())
}

/// Which field pair a source family hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintScheme {
    /// Listing pages: headline followed by summary
    HeadlineSummary,
    /// Search feeds: title followed by article URL
    TitleUrl,
}

impl FingerprintScheme {
    pub fn apply(&self, title: &str, summary: &str, url: &str) -> Fingerprint {
        match self {
            Self::HeadlineSummary => fingerprint(&[title, summary]),
            Self::TitleUrl => fingerprint(&[title, url]),
        }
    }
}
