//! Checksum utilities for record and artifact integrity

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(data)))
    }

    /// Fingerprint of IDL text
    pub fn of(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, content: &str) -> bool {
        *self == Self::of(content)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Checksum {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let idl = r#"{"type": "record", "name": "Order", "fields": []}"#;
        assert_eq!(Checksum::of(idl), Checksum::of(idl));
        assert_eq!(Checksum::of(idl).as_str().len(), 64);
    }

    #[test]
    fn test_checksum_verification() {
        let checksum = Checksum::of("syntax = \"proto3\";");
        assert!(checksum.verify("syntax = \"proto3\";"));
        assert!(!checksum.verify("syntax = \"proto2\";"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let checksum = Checksum::from("abc".to_string());
        assert_eq!(serde_json::to_string(&checksum).unwrap(), "\"abc\"");
    }
}
