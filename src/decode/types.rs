//! Decoder types and traits
//!
//! Defines the core decoder abstractions.

use crate::error::Result;
use crate::types::EntityKey;

/// An entity that can be identified within a listing
pub trait Entity: Clone + Send + Sync + 'static {
    /// Unique key of this entity
    fn key(&self) -> EntityKey;
}

/// Trait for decoding raw payloads into entities
///
/// `params` are the listing parameters the payload was fetched with, for
/// decoders that decorate entities with them.
pub trait EntityDecoder<P, R, T>: Send + Sync {
    /// Decode one raw payload
    fn decode(&self, raw: R, params: &P) -> Result<T>;
}
