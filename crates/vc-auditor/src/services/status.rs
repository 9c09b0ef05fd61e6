//! Revocation status lookup.
//!
//! Two status types are understood by the built-in service:
//! - `SimpleCredentialStatus2022`: `GET {id}` answers
//!   `{"isRevoked": bool, "timeOfRevocation": <epoch millis>?}`.
//! - `StatusList2021Entry`: `GET {statusListCredential}` yields a status
//!   list credential whose subject carries a gzip-compressed, base64
//!   `encodedList`; bit `statusListIndex` (most significant bit first) set
//!   means revoked.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use flate2::read::GzDecoder;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::http::{get_json, HttpClient};
use crate::credential::{parse_credential, CredentialStatus};
use crate::error::{ServiceError, ServiceResult};
use crate::config::DEFAULT_MAX_STATUS_LIST_BYTES;
use crate::time::unix_seconds_to_date;

pub const SIMPLE_STATUS_2022: &str = "SimpleCredentialStatus2022";
pub const STATUS_LIST_2021_ENTRY: &str = "StatusList2021Entry";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationStatus {
    pub is_revoked: bool,
    #[serde(default)]
    pub revocation_time: Option<String>,
}

impl RevocationStatus {
    pub fn active() -> Self {
        Self {
            is_revoked: false,
            revocation_time: None,
        }
    }
}

pub trait CredentialStatusService: Send + Sync {
    fn check(&self, status: &CredentialStatus) -> ServiceResult<RevocationStatus>;
}

/// In-memory revocation table keyed by status id.
#[derive(Debug, Default)]
pub struct InMemoryStatusService {
    revoked: RwLock<HashMap<String, Option<String>>>,
}

impl InMemoryStatusService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, status_id: impl Into<String>, at: Option<String>) {
        self.revoked.write().insert(status_id.into(), at);
    }
}

impl CredentialStatusService for InMemoryStatusService {
    fn check(&self, status: &CredentialStatus) -> ServiceResult<RevocationStatus> {
        Ok(match self.revoked.read().get(&status.id) {
            Some(at) => RevocationStatus {
                is_revoked: true,
                revocation_time: at.clone(),
            },
            None => RevocationStatus::active(),
        })
    }
}

/// Status lookup over HTTP.
pub struct HttpCredentialStatusService {
    http: Arc<dyn HttpClient>,
    max_list_bytes: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimpleStatusResponse {
    is_revoked: bool,
    #[serde(default)]
    time_of_revocation: Option<i64>,
}

impl HttpCredentialStatusService {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            max_list_bytes: DEFAULT_MAX_STATUS_LIST_BYTES,
        }
    }

    /// Cap on the decompressed size of a status list bitstring.
    pub fn with_max_list_bytes(mut self, limit: usize) -> Self {
        self.max_list_bytes = limit;
        self
    }

    fn check_simple(&self, status: &CredentialStatus) -> ServiceResult<RevocationStatus> {
        let response: SimpleStatusResponse =
            serde_json::from_value(get_json(self.http.as_ref(), &status.id)?)?;
        Ok(RevocationStatus {
            is_revoked: response.is_revoked,
            revocation_time: response
                .time_of_revocation
                .and_then(|millis| unix_seconds_to_date(millis / 1000)),
        })
    }

    fn check_status_list(&self, status: &CredentialStatus) -> ServiceResult<RevocationStatus> {
        let list_url = status
            .properties
            .get("statusListCredential")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::Parse("missing statusListCredential".into()))?;
        let index = match status.properties.get("statusListIndex") {
            Some(Value::String(s)) => s.parse::<u64>().ok(),
            Some(Value::Number(n)) => n.as_u64(),
            _ => None,
        }
        .ok_or_else(|| ServiceError::Parse("couldn't parse status list index".into()))?;

        let response = self.http.get(list_url)?;
        if !response.is_success() {
            return Err(ServiceError::Http {
                url: list_url.to_string(),
                status: response.status,
            });
        }
        let list_credential =
            parse_credential(&response.body).map_err(|e| ServiceError::Parse(e.to_string()))?;
        let subject = list_credential
            .credential_subject
            .ok_or_else(|| ServiceError::Parse("status list credential has no subject".into()))?;

        let entry_purpose = status
            .properties
            .get("statusPurpose")
            .and_then(Value::as_str)
            .unwrap_or("");
        let list_purpose = subject
            .properties
            .get("statusPurpose")
            .and_then(Value::as_str)
            .unwrap_or("");
        if !entry_purpose.eq_ignore_ascii_case(list_purpose) {
            return Err(ServiceError::Parse("status purposes don't match".into()));
        }

        let encoded = subject
            .properties
            .get("encodedList")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::Parse("status list has no encodedList".into()))?;
        let revoked = bit_is_set(&decode_bitstring(encoded, self.max_list_bytes)?, index)?;
        Ok(RevocationStatus {
            is_revoked: revoked,
            revocation_time: None,
        })
    }
}

impl CredentialStatusService for HttpCredentialStatusService {
    fn check(&self, status: &CredentialStatus) -> ServiceResult<RevocationStatus> {
        match status.status_type.as_str() {
            SIMPLE_STATUS_2022 => self.check_simple(status),
            STATUS_LIST_2021_ENTRY => self.check_status_list(status),
            other => Err(ServiceError::Unsupported(format!(
                "credential status type {other}"
            ))),
        }
    }
}

/// base64 (url-safe or standard) of a gzip stream → raw bitstring bytes.
/// Streams that inflate past `limit` bytes are rejected.
pub fn decode_bitstring(encoded: &str, limit: usize) -> ServiceResult<Vec<u8>> {
    let trimmed = encoded.trim_end_matches('=');
    let compressed = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| ServiceError::Parse(format!("invalid encodedList: {e}")))?;
    let mut decoder = GzDecoder::new(compressed.as_slice()).take((limit as u64).saturating_add(1));
    let mut bits = Vec::new();
    decoder
        .read_to_end(&mut bits)
        .map_err(|e| ServiceError::Parse(format!("encodedList decompression failed: {e}")))?;
    if bits.len() > limit {
        return Err(ServiceError::Parse(format!(
            "encodedList inflates past {limit} bytes"
        )));
    }
    Ok(bits)
}

fn bit_is_set(bits: &[u8], index: u64) -> ServiceResult<bool> {
    let byte = usize::try_from(index / 8)
        .ok()
        .and_then(|i| bits.get(i))
        .ok_or_else(|| ServiceError::Parse(format!("status list index {index} out of range")))?;
    Ok(byte & (0x80 >> (index % 8)) != 0)
}
