use std::fmt;

use serde::{Deserialize, Serialize};

/// Index key for a stored identifier.
///
/// Identifiers in WSM (record ids, event hashes, object ids) are arbitrary
/// strings of unbounded length. Collections never key on them directly;
/// they key on the domain-separated BLAKE3 hash of the identifier so index
/// entries have a fixed size and a record id can never collide with an
/// event hash that happens to share its text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexKey([u8; 32]);

impl IndexKey {
    /// Domain for projected object ids.
    pub const OBJECT: &'static str = "wsm-object-v1";
    /// Domain for record ids.
    pub const RECORD: &'static str = "wsm-record-v1";
    /// Domain for event hashes.
    pub const EVENT: &'static str = "wsm-event-v1";
    /// Domain for operation hashes.
    pub const OPERATION: &'static str = "wsm-operation-v1";
    /// Domain for ledger ids.
    pub const LEDGER: &'static str = "wsm-ledger-v1";

    /// Hash `value` under the given domain tag.
    pub fn derive(domain: &str, value: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexKey({})", self.short_hex())
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
