//! Compact JWT / JWS handling.
//!
//! Only the structural side lives here: splitting, base64url decoding and
//! rebuilding a compact token from a detached JWS fragment. Signature
//! checks belong to the [`crate::services::SignatureVerifier`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::error::{AuditorError, Result};

/// Separator between an SD-JWT issuer token and its disclosures.
const SD_JWT_SEPARATOR: char = '~';

/// A parsed compact JWT (optionally an SD-JWT with trailing disclosures).
#[derive(Debug, Clone, PartialEq)]
pub struct CompactJwt {
    raw: String,
    header_b64: String,
    payload_b64: String,
    signature_b64: String,
    header: Map<String, Value>,
    payload: Map<String, Value>,
    disclosures: Vec<String>,
}

impl CompactJwt {
    /// Quick structural check: three dot-separated base64url segments.
    pub fn looks_like_jwt(text: &str) -> bool {
        let token = text.trim().split(SD_JWT_SEPARATOR).next().unwrap_or("");
        let parts: Vec<&str> = token.split('.').collect();
        parts.len() == 3
            && !parts[0].is_empty()
            && !parts[1].is_empty()
            && parts.iter().all(|p| p.bytes().all(is_base64url_byte))
    }

    /// Parse a compact token.
    pub fn parse(text: &str) -> Result<Self> {
        let raw = text.trim().to_string();
        let mut sections = raw.split(SD_JWT_SEPARATOR);
        let token = sections.next().unwrap_or("");
        let disclosures = sections
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(AuditorError::InvalidArtifact(format!(
                "compact JWT must have 3 segments, found {}",
                parts.len()
            )));
        }

        let header = decode_json_segment(parts[0], "header")?;
        let payload = decode_json_segment(parts[1], "payload")?;

        Ok(Self {
            header_b64: parts[0].to_string(),
            payload_b64: parts[1].to_string(),
            signature_b64: parts[2].to_string(),
            raw,
            header,
            payload,
            disclosures,
        })
    }

    /// Rebuild a compact token from a detached JWS fragment and a shared payload.
    pub fn from_detached(protected: &str, payload: &str, signature: &str) -> String {
        format!("{protected}.{payload}.{signature}")
    }

    /// The token exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn disclosures(&self) -> &[String] {
        &self.disclosures
    }

    /// `alg` header parameter, if present.
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// `kid` header parameter, if present.
    pub fn key_id(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }

    /// Bytes covered by the signature: `header.payload`.
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header_b64, self.payload_b64)
    }

    /// Decoded signature bytes.
    pub fn signature_bytes(&self) -> Result<Vec<u8>> {
        URL_SAFE_NO_PAD
            .decode(self.signature_b64.trim_end_matches('='))
            .map_err(|e| AuditorError::InvalidArtifact(format!("invalid JWT signature encoding: {e}")))
    }
}

fn is_base64url_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'='
}

fn decode_json_segment(segment: &str, name: &str) -> Result<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| AuditorError::InvalidArtifact(format!("invalid JWT {name} encoding: {e}")))?;
    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(AuditorError::InvalidArtifact(format!(
            "JWT {name} is not a JSON object"
        ))),
    }
}

/// Base64url-encode a JSON value (no padding), as used for JWT segments.
pub fn encode_segment(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string().as_bytes())
}
