use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::object::IndexKey;

/// Metadata supplied by the writer of a projected object.
///
/// `created` and `updated` default to the time of the write when absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeta {
    /// Height of the block whose replay produced the write. Zero means
    /// "not specified" and is rejected by the state machine.
    #[serde(default)]
    pub block_height: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl UpdateMeta {
    pub fn at_height(block_height: u64) -> Self {
        Self {
            block_height,
            ..Default::default()
        }
    }
}

/// Metadata stored alongside a projected object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Height of the block whose replay last touched the object.
    pub block_height: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

/// Materialized record state, unique per `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectedObject {
    pub id: String,
    pub object: Value,
    pub meta: ObjectMeta,
}

impl ProjectedObject {
    /// Extract the non-empty string `id` of an object body.
    pub fn id_of(object: &Value) -> Result<&str, TypeError> {
        match object.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(TypeError::MissingObjectId),
        }
    }

    /// Index key for an object id.
    pub fn key_for(id: &str) -> IndexKey {
        IndexKey::derive(IndexKey::OBJECT, id)
    }

    pub fn into_record(self) -> StateRecord {
        StateRecord {
            object: self.object,
            meta: self.meta,
        }
    }
}

/// An object as returned to readers: its body and metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub object: Value,
    pub meta: ObjectMeta,
}
