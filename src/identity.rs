//! Identity derivation for annotation blocks
//!
//! A record without an explicit id in its payload gets a stable derived one:
//! the 32-bit FNV-1a hash of its canonical fields, rendered as 8 hex digits.
//! The hash is a pure function of the payload, quote, and comment, so an
//! unchanged block keeps its id across re-parses. Editing the quote or the
//! comment changes the derived id; callers that need identity to survive
//! text edits pin an explicit id in the payload instead.

use crate::annotations::Payload;
use crate::error::RenderError;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Separator between the canonical fields, chosen to never occur in text
const FIELD_SEPARATOR: u8 = 0x1f;

/// Compute the 32-bit FNV-1a hash of a byte sequence
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Derive a record id from its canonical fields
///
/// The canonical byte sequence is the blanked payload JSON, the quote text,
/// and the comment text, joined by an ASCII unit separator. The blanked
/// payload serializes with sorted extension keys, so the same logical record
/// always hashes to the same id regardless of inline key order.
pub fn derive_id(payload: &Payload, quote: &str, comment: &str) -> Result<String, RenderError> {
    let canonical = payload.canonical_json()?;
    let mut bytes = Vec::with_capacity(canonical.len() + quote.len() + comment.len() + 2);
    bytes.extend_from_slice(canonical.as_bytes());
    bytes.push(FIELD_SEPARATOR);
    bytes.extend_from_slice(quote.as_bytes());
    bytes.push(FIELD_SEPARATOR);
    bytes.extend_from_slice(comment.as_bytes());
    Ok(format!("{:08x}", fnv1a_32(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_vectors() {
        // Published FNV-1a 32-bit test vectors
        assert_eq!(fnv1a_32(b""), 0x811c9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9cf968);
    }

    #[test]
    fn test_derive_id_is_stable() {
        let payload = Payload::default();
        let a = derive_id(&payload, "quoted text", "a comment").unwrap();
        let b = derive_id(&payload, "quoted text", "a comment").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_derive_id_tracks_content() {
        let payload = Payload::default();
        let a = derive_id(&payload, "quoted text", "a comment").unwrap();
        let b = derive_id(&payload, "quoted text", "another comment").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_separator_prevents_field_bleed() {
        let payload = Payload::default();
        // "ab" + "c" must not collide with "a" + "bc"
        let a = derive_id(&payload, "ab", "c").unwrap();
        let b = derive_id(&payload, "a", "bc").unwrap();
        assert_ne!(a, b);
    }
}
