//! Entity decoding module
//!
//! Turns raw transport payloads into typed entities.
//!
//! # Overview
//!
//! A decoder is a pure function from one raw payload to one entity. Pages
//! are decoded all-or-nothing: if any item fails, the whole page fails with
//! a `Deserialization` error naming the offending index.

mod decoders;
mod types;

pub use decoders::{decode_page, FnDecoder, ParamsMergeDecoder, Record, RecordDecoder, SerdeDecoder};
pub use types::{Entity, EntityDecoder};
