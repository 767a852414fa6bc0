//! Content-addressed book identifiers

use crate::error::LibraryError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Number of hex characters kept from the SHA-256 digest
///
/// Truncation trades collision resistance for short ids; fine for a personal
/// library, not a security boundary.
pub const BOOK_ID_LEN: usize = 12;

/// Identifier of a book, derived from its content bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookId(String);

impl BookId {
    /// Hash the full content and keep the first [`BOOK_ID_LEN`] hex characters
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(BOOK_ID_LEN);
        Self(digest)
    }

    /// Parse an id received from outside (URL path, CLI argument, stored pointer)
    ///
    /// Only lowercase hex of the exact length is accepted, which also keeps ids
    /// safe to embed in storage paths.
    pub fn parse(value: &str) -> Result<Self, LibraryError> {
        let valid = value.len() == BOOK_ID_LEN
            && value
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(LibraryError::InvalidId(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Compute the content-addressed id of a book
pub fn compute_id(content: &[u8]) -> BookId {
    BookId::from_content(content)
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BookId {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BookId {
    type Error = LibraryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BookId> for String {
    fn from(id: BookId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_digest_prefix() {
        // sha256("") = e3b0c44298fc1c149afbf4c8996fb924...
        assert_eq!(compute_id(b"").as_str(), "e3b0c44298fc");
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(compute_id(b"abc").as_str(), "ba7816bf8f01");
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert!(BookId::parse("ba7816bf8f01").is_ok());
        assert!(BookId::parse("BA7816BF8F01").is_err());
        assert!(BookId::parse("ba7816bf8f0").is_err());
        assert!(BookId::parse("../../etc/pa").is_err());
        assert!(BookId::parse("").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let id: BookId = serde_json::from_str("\"ba7816bf8f01\"").unwrap();
        assert_eq!(id, compute_id(b"abc"));
        assert!(serde_json::from_str::<BookId>("\"not-an-id\"").is_err());
    }

    proptest! {
        #[test]
        fn compute_id_is_deterministic(content in proptest::collection::vec(any::<u8>(), 0..512)) {
            let first = compute_id(&content);
            let second = compute_id(&content.clone());
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.as_str().len(), BOOK_ID_LEN);
            prop_assert!(BookId::parse(first.as_str()).is_ok());
        }

        #[test]
        fn differing_content_differs(
            content in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
        ) {
            let mut other = content.clone();
            let i = index.index(other.len());
            other[i] = other[i].wrapping_add(1);
            prop_assert_ne!(compute_id(&content), compute_id(&other));
        }
    }
}
