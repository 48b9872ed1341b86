//! # Schema Digest: Content-Addressed Schema Identity
//!
//! A `SchemaDigest` is a SHA-256 over a schema document. Two flavours:
//!
//! - [`schema_digest`] hashes the RFC 8785 canonical bytes and identifies
//!   the document's content regardless of member order.
//! - [`layout_digest`] hashes the compact bytes in document order. Member
//!   order of `properties` and `optionalProperties` drives validation and
//!   output order, so compiled programs are cached under this digest.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CanonicalizationError;

/// SHA-256 digest of a canonical schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaDigest([u8; 32]);

impl SchemaDigest {
    /// The raw 32-byte digest value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for SchemaDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute the digest of canonical schema bytes.
///
/// Accepts only `&CanonicalBytes`, so every digest flows through
/// canonicalization.
pub fn schema_digest(data: &CanonicalBytes) -> SchemaDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    SchemaDigest(out)
}

/// Compute the digest of `document` serialized compactly with object
/// members in document order.
///
/// Documents that differ only in whitespace share a layout digest.
///
/// # Errors
///
/// Returns `CanonicalizationError::SerializationFailed` if `document`
/// cannot be serialized.
pub fn layout_digest(document: &serde_json::Value) -> Result<SchemaDigest, CanonicalizationError> {
    let bytes = serde_json::to_vec(document)?;
    let hash = Sha256::digest(&bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    Ok(SchemaDigest(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_digest() {
        // sha256("{}")
        let cb = CanonicalBytes::new(&json!({})).unwrap();
        assert_eq!(
            schema_digest(&cb).to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_equal_documents_share_digest() {
        let a = CanonicalBytes::new(&json!({"type": "string", "nullable": true})).unwrap();
        let b = CanonicalBytes::new(&json!({"nullable": true, "type": "string"})).unwrap();
        assert_eq!(schema_digest(&a), schema_digest(&b));
    }

    #[test]
    fn test_different_documents_differ() {
        let a = CanonicalBytes::new(&json!({"type": "string"})).unwrap();
        let b = CanonicalBytes::new(&json!({"type": "int8"})).unwrap();
        assert_ne!(schema_digest(&a), schema_digest(&b));
    }

    #[test]
    fn test_layout_digest_keeps_member_order() {
        let ab: serde_json::Value = serde_json::from_str(r#"{"properties": {"a": {}, "b": {}}}"#).unwrap();
        let ba: serde_json::Value = serde_json::from_str(r#"{"properties": {"b": {}, "a": {}}}"#).unwrap();
        let spaced: serde_json::Value =
            serde_json::from_str("{ \"properties\" :\n {\"a\": {},\t\"b\": { } } }").unwrap();
        assert_ne!(layout_digest(&ab).unwrap(), layout_digest(&ba).unwrap());
        assert_eq!(layout_digest(&ab).unwrap(), layout_digest(&spaced).unwrap());
        assert_eq!(
            schema_digest(&CanonicalBytes::new(&ab).unwrap()),
            schema_digest(&CanonicalBytes::new(&ba).unwrap())
        );
    }

    #[test]
    fn test_display_has_algorithm_prefix() {
        let cb = CanonicalBytes::new(&json!({})).unwrap();
        let s = schema_digest(&cb).to_string();
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), "sha256:".len() + 64);
    }
}
