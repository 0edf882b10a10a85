//! Compressed encoding for persisted raw remote responses.
//!
//! The last raw JSON response from the remote compute service is kept
//! on the job row for diagnostics. Responses can be large (they embed
//! log tails), so they are stored deflate-compressed and
//! base64-encoded in a text column.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Errors from the raw-response codec.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    /// The stored string is not valid base64.
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Serialize a JSON value, deflate-compress it and base64-encode the
/// result into an ASCII-safe string.
pub fn compress_json(value: &serde_json::Value) -> Result<String, EncodingError> {
    let json = serde_json::to_vec(value)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(BASE64.encode(encoder.finish()?))
}

/// Inverse of [`compress_json`].
pub fn decompress_json(encoded: &str) -> Result<serde_json::Value, EncodingError> {
    let compressed = BASE64.decode(encoded)?;
    let mut decoder = ZlibDecoder::new(compressed.as_slice());
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_response_blob() {
        let value = serde_json::json!({
            "compute": {
                "status": true,
                "d_ret": { "l_status": ["started"], "l_logs": ["x".repeat(5000)] }
            }
        });
        let encoded = compress_json(&value).unwrap();
        assert!(encoded.is_ascii());
        assert_eq!(decompress_json(&encoded).unwrap(), value);
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(decompress_json("not base64 ///").is_err());
    }
}
