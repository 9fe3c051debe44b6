//! Lossless binary-to-text conversion
//!
//! Binary payloads cross two text boundaries in Atelier: persisted records are
//! JSON documents, and snapshot exports must be safe to write to a file or
//! send over the wire. Both use the same data-URL shaped encoding:
//! `data:<mime>;base64,<payload>`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Blob text is not in data URL form")]
    MalformedText,

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Encode a binary payload and its MIME type into a single text value.
pub fn encode_blob(bytes: &[u8], mime_type: &str) -> String {
    let mime = if mime_type.is_empty() {
        FALLBACK_MIME
    } else {
        mime_type
    };
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Decode a text value produced by [`encode_blob`] back into bytes and a
/// MIME type. A missing or unparseable MIME part falls back to
/// `application/octet-stream`; a malformed payload is an error.
pub fn decode_blob(text: &str) -> Result<(Vec<u8>, String), CodecError> {
    let (meta, payload) = text.split_once(',').ok_or(CodecError::MalformedText)?;

    let mime = meta
        .strip_prefix("data:")
        .and_then(|m| m.strip_suffix(";base64"))
        .filter(|m| !m.is_empty())
        .unwrap_or(FALLBACK_MIME);

    let bytes = BASE64.decode(payload)?;
    Ok((bytes, mime.to_string()))
}

/// Serde adapter that persists `Vec<u8>` fields as base64 strings instead of
/// JSON number arrays, keeping record documents compact and text-safe.
pub mod base64_bytes {
    use super::BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        BASE64.decode(text).map_err(serde::de::Error::custom)
    }
}
