//! Public wish identifiers.
//!
//! A slug is the short opaque token in a share link (`/w/{slug}`). It is
//! distinct from the internal row id and carries no information about the
//! wish. The alphabet omits easily-confused characters (0/O, 1/l/I).

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of every generated slug.
pub const SLUG_LENGTH: usize = 8;

/// Characters used in generated slugs.
const SLUG_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";

/// A validated wish slug.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    /// Create from a string, validating length and alphabet.
    pub fn parse(slug: impl Into<String>) -> crate::Result<Self> {
        let slug = slug.into();
        if slug.len() != SLUG_LENGTH {
            return Err(crate::Error::InvalidSlug(format!(
                "slug must be {SLUG_LENGTH} chars, got {}",
                slug.len()
            )));
        }
        for c in slug.bytes() {
            if !SLUG_ALPHABET.contains(&c) {
                return Err(crate::Error::InvalidSlug(format!(
                    "invalid character in slug: {}",
                    c as char
                )));
            }
        }
        Ok(Self(slug))
    }

    /// Generate a fresh random slug.
    ///
    /// Uniqueness is not guaranteed here; callers retry on collision when
    /// inserting.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let slug: String = (0..SLUG_LENGTH)
            .map(|_| SLUG_ALPHABET[rng.random_range(0..SLUG_ALPHABET.len())] as char)
            .collect();
        Self(slug)
    }

    /// Get the slug string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slug({self})")
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_slugs_are_valid() {
        for _ in 0..100 {
            let slug = Slug::generate();
            assert_eq!(slug.as_str().len(), SLUG_LENGTH);
            Slug::parse(slug.as_str()).unwrap();
        }
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(Slug::parse("short").is_err());
        assert!(Slug::parse("waytoolongforaslug").is_err());
    }

    #[test]
    fn parse_rejects_ambiguous_characters() {
        // 0, O, 1, l, I are not in the alphabet
        assert!(Slug::parse("abcdefg0").is_err());
        assert!(Slug::parse("abcdefgO").is_err());
        assert!(Slug::parse("abcdefg1").is_err());
    }

    #[test]
    fn parse_rejects_non_alphanumeric() {
        assert!(Slug::parse("abc/defg").is_err());
        assert!(Slug::parse("abc.defg").is_err());
    }
}
