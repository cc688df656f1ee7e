//! Versioned, expiring session record and its flat-map encoding

use crate::traits::{RecordFields, StorageError, StorageResult};

pub const VALUE_FIELD: &str = "value";
pub const VERSION_FIELD: &str = "version";
pub const EXPIRATION_FIELD: &str = "expiration";

/// Protocol state of one in-flight authentication exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Serialized protocol state, opaque to this layer
    pub value: String,

    /// Incremented by one on every successful update
    pub version: u64,

    /// Epoch milliseconds after which the record is logically absent
    pub expiration: i64,
}

impl SessionRecord {
    /// Version assigned to a freshly created record
    pub const INITIAL_VERSION: u64 = 1;

    pub fn new(value: impl Into<String>, expiration: i64) -> Self {
        Self::with_version(value, expiration, Self::INITIAL_VERSION)
    }

    pub fn with_version(value: impl Into<String>, expiration: i64, version: u64) -> Self {
        Self {
            value: value.into(),
            version,
            expiration,
        }
    }

    /// A record is expired from its expiration instant onwards.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        now_millis >= self.expiration
    }

    pub fn to_fields(&self) -> RecordFields {
        RecordFields::from([
            (VALUE_FIELD.to_string(), self.value.clone()),
            (VERSION_FIELD.to_string(), self.version.to_string()),
            (EXPIRATION_FIELD.to_string(), self.expiration.to_string()),
        ])
    }

    pub fn from_fields(fields: &RecordFields) -> StorageResult<Self> {
        let value = required(fields, VALUE_FIELD)?;
        let version = stored_version(fields)?;
        let expiration = required(fields, EXPIRATION_FIELD)?
            .parse::<i64>()
            .map_err(|e| {
                StorageError::InvalidData(format!("Bad {} field: {}", EXPIRATION_FIELD, e))
            })?;

        Ok(Self {
            value: value.to_string(),
            version,
            expiration,
        })
    }
}

fn required<'a>(fields: &'a RecordFields, name: &str) -> StorageResult<&'a str> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| StorageError::InvalidData(format!("Missing {} field", name)))
}

/// Read the `version` field without decoding the rest of the record.
pub fn stored_version(fields: &RecordFields) -> StorageResult<u64> {
    required(fields, VERSION_FIELD)?
        .parse::<u64>()
        .map_err(|e| StorageError::InvalidData(format!("Bad {} field: {}", VERSION_FIELD, e)))
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
