//! Compact binary encoding for persisted values.
//!
//! Values are rendered as JSON text and then gzip-compressed. Compressed output
//! is not guaranteed to be byte-identical across runs, only to decode back to
//! an equal value.

use crate::error::CodecError;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{Read, Write};

/// Serializes `value` to JSON and compresses it.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    let json = serde_json::to_vec(value)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// Decompresses `bytes` and parses the JSON inside as `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut json = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}
