//! Strongly-typed identifiers used across the domain.
//!
//! Every identifier here doubles as a key in the remote document tree, so all of
//! them share the same key rules (see [`validate_key`]).

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Characters the document store does not accept inside a key.
pub const FORBIDDEN_KEY_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

/// Trim `raw` and check that it can be used as a single document key.
pub fn validate_key<'a>(what: &str, raw: &'a str) -> Result<&'a str, DomainError> {
    check_key(what, raw.trim())
}

/// Check a key exactly as given. Surrounding whitespace is kept, but a key
/// made only of whitespace is still rejected.
pub fn check_key<'a>(what: &str, key: &'a str) -> Result<&'a str, DomainError> {
    if key.trim().is_empty() {
        return Err(DomainError::invalid_id(format!("{what} cannot be blank")));
    }
    if let Some(ch) = key.chars().find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_control()) {
        return Err(DomainError::invalid_id(format!(
            "{what} '{key}' contains forbidden character {ch:?}"
        )));
    }
    Ok(key)
}

/// Product barcode (primary key of a product document).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Barcode(String);

/// Category name (key under the category directory and the anchor map).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryName(String);

/// Registry key of a buyer or wholesaler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartnerId(String);

/// Key of one partner's price grid inside a product.
///
/// Usually a [`PartnerId`]; products created by older clients may carry a
/// free-text partner name instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartnerKey(String);

macro_rules! impl_key_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Validate and wrap a raw key (surrounding whitespace is trimmed).
            pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
                validate_key($name, raw.as_ref()).map(|k| Self(k.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_key_newtype!(Barcode, "barcode");
impl_key_newtype!(CategoryName, "category");
impl_key_newtype!(PartnerId, "partner id");
impl_key_newtype!(PartnerKey, "partner key");

impl PartnerId {
    /// Generate a fresh registry key (UUIDv7, like the store's push keys).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }
}

impl PartnerKey {
    /// Wrap a grid key read back from the store, keeping it byte-for-byte.
    ///
    /// Older clients wrote untrimmed keys ("Acme "); trimming them would
    /// address a different grid.
    pub fn stored(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        check_key("partner key", raw.as_ref()).map(|k| Self(k.to_string()))
    }
}

impl From<PartnerId> for PartnerKey {
    fn from(value: PartnerId) -> Self {
        // Registry ids are already valid keys.
        Self(value.0)
    }
}

impl From<&PartnerId> for PartnerKey {
    fn from(value: &PartnerId) -> Self {
        Self(value.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_trimmed() {
        let barcode = Barcode::new("  012345 ").unwrap();
        assert_eq!(barcode.as_str(), "012345");
    }

    #[test]
    fn stored_partner_keys_keep_whitespace() {
        let key = PartnerKey::stored("Acme ").unwrap();
        assert_eq!(key.as_str(), "Acme ");
        assert_ne!(key, PartnerKey::new("Acme ").unwrap());
        assert!(PartnerKey::stored("  ").is_err());
        assert!(PartnerKey::stored("a.b").is_err());
    }

    #[test]
    fn blank_keys_are_rejected() {
        assert!(matches!(Barcode::new("   "), Err(DomainError::InvalidId(_))));
        assert!(matches!(CategoryName::new(""), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn forbidden_characters_are_rejected() {
        for raw in ["a/b", "Dr. Smith", "#1", "$x", "[y]"] {
            assert!(PartnerKey::new(raw).is_err(), "{raw} should be rejected");
        }
        assert!(PartnerKey::new("Acme Wholesale").is_ok());
    }

    #[test]
    fn generated_partner_ids_are_valid_keys() {
        let a = PartnerId::generate();
        let b = PartnerId::generate();
        assert!(PartnerId::new(a.as_str()).is_ok());
        assert_ne!(a, b);
    }

    #[test]
    fn serde_rejects_invalid_keys() {
        let ok: Barcode = serde_json::from_str("\"777\"").unwrap();
        assert_eq!(ok.as_str(), "777");
        assert!(serde_json::from_str::<Barcode>("\"\"").is_err());
    }
}
