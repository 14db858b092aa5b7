use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::object::IndexKey;

/// Declares an opaque string identifier.
///
/// Identifiers are derived upstream (content hashes, DIDs, URLs) and are
/// never interpreted here beyond equality and index hashing.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $label:literal, $domain:expr) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier, rejecting the empty string.
            pub fn parse(value: impl Into<String>) -> Result<Self, TypeError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(TypeError::EmptyIdentifier($label));
                }
                Ok(Self(value))
            }

            /// Wrap an identifier without validation.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Index key used by collections to store this identifier.
            pub fn index_key(&self) -> IndexKey {
                IndexKey::derive($domain, &self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a ledger record, shared by every operation that mutates it.
    RecordId,
    "record",
    IndexKey::RECORD
);

string_id!(
    /// Content hash of an event (e.g. `ni:///sha-256;...`).
    EventHash,
    "event hash",
    IndexKey::EVENT
);

string_id!(
    /// Content hash of a single operation.
    OperationHash,
    "operation hash",
    IndexKey::OPERATION
);

string_id!(
    /// Identity of the ledger a projection belongs to.
    LedgerId,
    "ledger",
    IndexKey::LEDGER
);

impl LedgerId {
    /// Generate a fresh ledger identity (`urn:uuid:` with a UUID v7).
    pub fn generate() -> Self {
        Self(format!("urn:uuid:{}", uuid::Uuid::now_v7()))
    }
}

impl Default for LedgerId {
    fn default() -> Self {
        Self::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(
            RecordId::parse("").unwrap_err(),
            TypeError::EmptyIdentifier("record")
        );
        assert!(RecordId::parse("did:v1:abc").is_ok());
    }

    #[test]
    fn serde_is_transparent() {
        let hash = EventHash::new("ni:///sha-256;xyz");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, "\"ni:///sha-256;xyz\"");
        let parsed: EventHash = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn record_and_event_keys_differ() {
        let record = RecordId::new("x");
        let event = EventHash::new("x");
        assert_ne!(record.index_key(), event.index_key());
    }

    #[test]
    fn generated_ledger_ids_are_unique() {
        let a = LedgerId::generate();
        let b = LedgerId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("urn:uuid:"));
    }
}
