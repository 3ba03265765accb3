//! Decoder implementations
//!
//! Each decoder handles a specific way of building entities.

use super::types::{Entity, EntityDecoder};
use crate::error::{Error, Result};
use crate::types::{EntityKey, JsonValue};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use std::marker::PhantomData;

// ============================================================================
// Page Decoding
// ============================================================================

/// Decode a whole page, failing on the first bad item
///
/// Any error raised by the decoder is reported as a `Deserialization`
/// error carrying the index of the item within the page.
pub fn decode_page<P, R, T>(
    decoder: &dyn EntityDecoder<P, R, T>,
    raw: Vec<R>,
    params: &P,
) -> Result<Vec<T>> {
    raw.into_iter()
        .enumerate()
        .map(|(index, item)| {
            decoder.decode(item, params).map_err(|e| match e {
                Error::Deserialization { message, .. } => Error::deserialization(index, message),
                other => Error::deserialization(index, other.to_string()),
            })
        })
        .collect()
}

// ============================================================================
// Serde Decoder
// ============================================================================

/// Decodes JSON payloads with serde
pub struct SerdeDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeDecoder<T> {
    /// Create a new serde decoder
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SerdeDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerdeDecoder")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<P, T> EntityDecoder<P, JsonValue, T> for SerdeDecoder<T>
where
    T: DeserializeOwned,
{
    fn decode(&self, raw: JsonValue, _params: &P) -> Result<T> {
        serde_json::from_value(raw).map_err(|e| Error::deserialization(0, e.to_string()))
    }
}

// ============================================================================
// Record Decoder
// ============================================================================

/// Untyped entity: a JSON object keyed by one of its fields
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    key: EntityKey,
    value: JsonValue,
}

impl Record {
    /// Create a record
    pub fn new(key: impl Into<EntityKey>, value: JsonValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// The full JSON payload
    pub fn value(&self) -> &JsonValue {
        &self.value
    }

    /// A top-level field of the payload
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.value.get(name)
    }

    /// Consume the record, returning its payload
    pub fn into_value(self) -> JsonValue {
        self.value
    }
}

impl Entity for Record {
    fn key(&self) -> EntityKey {
        self.key.clone()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

/// Builds `Record`s keyed by a configurable unique field
#[derive(Debug, Clone)]
pub struct RecordDecoder {
    key_field: String,
}

impl RecordDecoder {
    /// Create a decoder keyed by `key_field`
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
        }
    }

    /// Name of the key field
    pub fn key_field(&self) -> &str {
        &self.key_field
    }
}

impl Default for RecordDecoder {
    fn default() -> Self {
        Self::new("id")
    }
}

impl<P> EntityDecoder<P, JsonValue, Record> for RecordDecoder {
    fn decode(&self, raw: JsonValue, _params: &P) -> Result<Record> {
        let key = match raw.get(&self.key_field) {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            Some(_) => {
                return Err(Error::deserialization(
                    0,
                    format!("key field '{}' is not a string or number", self.key_field),
                ))
            }
            None => {
                return Err(Error::deserialization(
                    0,
                    format!("missing key field '{}'", self.key_field),
                ))
            }
        };
        Ok(Record::new(key, raw))
    }
}

// ============================================================================
// Params Merge Decoder
// ============================================================================

/// Fills fields missing from a payload with the listing parameters
///
/// Child listings (tasks of a job, nodes of a pool) return entities without
/// their parent identifiers; merging the parameters back in lets the entity
/// carry them. Payload fields always win over parameters.
#[derive(Debug, Clone, Default)]
pub struct ParamsMergeDecoder<D> {
    inner: D,
}

impl<D> ParamsMergeDecoder<D> {
    /// Wrap an inner JSON decoder
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

impl<P, T, D> EntityDecoder<P, JsonValue, T> for ParamsMergeDecoder<D>
where
    P: Serialize,
    D: EntityDecoder<P, JsonValue, T>,
{
    fn decode(&self, raw: JsonValue, params: &P) -> Result<T> {
        let raw = match (raw, serde_json::to_value(params)?) {
            (JsonValue::Object(mut fields), JsonValue::Object(extra)) => {
                for (name, value) in extra {
                    fields.entry(name).or_insert(value);
                }
                JsonValue::Object(fields)
            }
            (raw, _) => raw,
        };
        self.inner.decode(raw, params)
    }
}

// ============================================================================
// Function Decoder
// ============================================================================

/// Decoder backed by a closure
pub struct FnDecoder<F> {
    f: F,
}

impl<F> FnDecoder<F> {
    /// Create a decoder from a closure
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> std::fmt::Debug for FnDecoder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnDecoder").finish_non_exhaustive()
    }
}

impl<P, R, T, F> EntityDecoder<P, R, T> for FnDecoder<F>
where
    F: Fn(R) -> Result<T> + Send + Sync,
{
    fn decode(&self, raw: R, _params: &P) -> Result<T> {
        (self.f)(raw)
    }
}
