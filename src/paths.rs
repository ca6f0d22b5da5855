// Copyright (c) 2025 Snapvault Contributors. Licensed under AGPLv3.
//! Identifier validation and workflow-key directory encoding.
//!
//! Every operation that maps an identifier to a file path must go through
//! `validate_id` first; callers never build a path from an unvalidated id.

use crate::errors::StoreError;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Escape set for workflow keys used as directory names. Everything outside
/// `[A-Za-z0-9_\-~]` is percent-encoded. `.` is escaped as well, so a key
/// like `..` can never become a parent-reference path component.
const KEY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'~');

/// Reject path-unsafe record identifiers.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
        return Err(StoreError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

/// Encode an arbitrary workflow key as a safe directory name.
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ESCAPE).to_string()
}

/// Exact inverse of `encode_key`. None if the name does not decode to UTF-8.
pub fn decode_key(dir_name: &str) -> Option<String> {
    percent_decode_str(dir_name)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_ids() {
        assert!(validate_id("").is_err());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id("a\\b").is_err());
        assert!(validate_id("..").is_err());
        assert!(validate_id("a..b").is_err());
        assert!(validate_id("snap-1756._ok").is_ok());
    }

    #[test]
    fn key_encoding_round_trips() {
        for key in ["workflow.json", "a/b\\c", "..", "über workflow", "plain"] {
            let encoded = encode_key(key);
            assert!(!encoded.contains('/'));
            assert!(!encoded.contains('\\'));
            assert!(!encoded.contains('.'));
            assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        }
    }

    #[test]
    fn dot_components_cannot_escape() {
        assert_eq!(encode_key("."), "%2E");
        assert_eq!(encode_key(".."), "%2E%2E");
    }
}
