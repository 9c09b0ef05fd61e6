//! Trusted Issuer Registry (TIR) client.
//!
//! Records are fetched fresh on every call; caching, if wanted, belongs
//! in a client implementation.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::http::HttpClient;
use crate::credential::{parse_credential, CompactJwt, Credential};
use crate::error::{ServiceError, ServiceResult};

/// One registered attribute. `body` holds an accreditation (or identity)
/// credential as a JWT, JSON text, or base64 of either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TirAttribute {
    #[serde(default)]
    pub hash: Option<String>,
    pub body: String,
    #[serde(default)]
    pub issuer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_tao: Option<String>,
}

impl TirAttribute {
    /// Decode `body` into a credential.
    pub fn decode_credential(&self) -> ServiceResult<Credential> {
        let body = self.body.trim();
        let text = if body.starts_with('{') || CompactJwt::looks_like_jwt(body) {
            body.to_string()
        } else {
            let bytes = STANDARD
                .decode(body)
                .or_else(|_| URL_SAFE_NO_PAD.decode(body.trim_end_matches('=')))
                .map_err(|e| ServiceError::Parse(format!("attribute body is not base64: {e}")))?;
            String::from_utf8(bytes)
                .map_err(|e| ServiceError::Parse(format!("attribute body is not UTF-8: {e}")))?
        };
        parse_credential(&text).map_err(|e| ServiceError::Parse(e.to_string()))
    }
}

/// An issuer's registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TirRecord {
    pub did: String,
    #[serde(default)]
    pub attributes: Vec<TirAttribute>,
}

pub trait TrustedIssuerRegistryClient: Send + Sync {
    /// Fetch the record of `did`. [`ServiceError::NotFound`] when the registry has none.
    fn get_issuer(&self, registry_address: &str, did: &str) -> ServiceResult<TirRecord>;

    /// Fetch one attribute by URL.
    fn get_attribute(&self, url: &str) -> ServiceResult<TirAttribute>;
}

/// EBSI TIR REST client: `GET {registry}/{did}` and `GET {attribute url}`.
pub struct HttpTrustedIssuerRegistryClient {
    http: Arc<dyn HttpClient>,
}

impl HttpTrustedIssuerRegistryClient {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    fn fetch(&self, url: &str) -> ServiceResult<Value> {
        let response = self.http.get(url)?;
        match response.status {
            200..=299 => Ok(serde_json::from_str(&response.body)?),
            404 => Err(ServiceError::NotFound(url.to_string())),
            status => Err(ServiceError::Http {
                url: url.to_string(),
                status,
            }),
        }
    }
}

impl TrustedIssuerRegistryClient for HttpTrustedIssuerRegistryClient {
    fn get_issuer(&self, registry_address: &str, did: &str) -> ServiceResult<TirRecord> {
        let url = format!("{}/{did}", registry_address.trim_end_matches('/'));
        log::debug!("fetching TIR record of {did}");
        Ok(serde_json::from_value(self.fetch(&url)?)?)
    }

    fn get_attribute(&self, url: &str) -> ServiceResult<TirAttribute> {
        // v4 wraps the attribute: {"did": .., "attribute": {..}}
        match self.fetch(url)? {
            Value::Object(mut wrapper) if wrapper.contains_key("attribute") => Ok(
                serde_json::from_value(wrapper.remove("attribute").unwrap_or(Value::Null))?,
            ),
            other => Ok(serde_json::from_value(other)?),
        }
    }
}

/// In-memory registry.
#[derive(Debug, Default)]
pub struct InMemoryTirClient {
    records: RwLock<HashMap<String, TirRecord>>,
    attributes: RwLock<HashMap<String, TirAttribute>>,
}

impl InMemoryTirClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&self, record: TirRecord) {
        self.records.write().insert(record.did.clone(), record);
    }

    pub fn add_attribute(&self, url: impl Into<String>, attribute: TirAttribute) {
        self.attributes.write().insert(url.into(), attribute);
    }
}

impl TrustedIssuerRegistryClient for InMemoryTirClient {
    fn get_issuer(&self, _registry_address: &str, did: &str) -> ServiceResult<TirRecord> {
        self.records
            .read()
            .get(did)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(did.to_string()))
    }

    fn get_attribute(&self, url: &str) -> ServiceResult<TirAttribute> {
        self.attributes
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(url.to_string()))
    }
}
