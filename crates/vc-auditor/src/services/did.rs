//! DID resolution.
//!
//! Resolvers must report two recognizable failure kinds:
//! [`ServiceError::NotFound`] and [`ServiceError::InvalidDid`]. A resolver
//! that does not handle a DID method answers [`ServiceError::Unsupported`],
//! which lets [`ChainedDidResolver`] try the next one.

use std::collections::HashMap;
use std::sync::Arc;

use ed25519_dalek::VerifyingKey;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::http::HttpClient;
use crate::crypto::keys::{
    decode_base58_ed25519, decode_jwk_x_ed25519, decode_multibase_ed25519,
    encode_multibase_ed25519, verifying_key_from_did_key,
};
use crate::error::{ServiceError, ServiceResult};

/// Public key in JWK form (only OKP/Ed25519 is usable for verification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyJwk {
    pub kty: String,
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    #[serde(default)]
    pub controller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<PublicKeyJwk>,
}

impl VerificationMethod {
    /// Decode the Ed25519 key of this method, whichever encoding it uses.
    pub fn ed25519_key(&self) -> ServiceResult<VerifyingKey> {
        if let Some(multibase) = &self.public_key_multibase {
            return decode_multibase_ed25519(multibase);
        }
        if let Some(base58) = &self.public_key_base58 {
            return decode_base58_ed25519(base58);
        }
        match &self.public_key_jwk {
            Some(PublicKeyJwk {
                kty,
                crv: Some(crv),
                x: Some(x),
            }) if kty == "OKP" && crv == "Ed25519" => decode_jwk_x_ed25519(x),
            Some(jwk) => Err(ServiceError::Unsupported(format!(
                "key type {} of {}",
                jwk.kty, self.id
            ))),
            None => Err(ServiceError::Crypto(format!(
                "verification method {} has no public key",
                self.id
            ))),
        }
    }
}

/// The subset of a DID document the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    pub id: String,
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
}

impl DidDocument {
    /// Find a method by absolute id, `#fragment`, or bare fragment.
    pub fn find_method(&self, key_ref: &str) -> Option<&VerificationMethod> {
        let fragment = key_ref.rsplit_once('#').map(|(_, f)| f);
        self.verification_method.iter().find(|vm| {
            vm.id == key_ref
                || match (fragment, vm.id.rsplit_once('#')) {
                    (Some(f), Some((_, own))) => f == own,
                    _ => false,
                }
        })
    }

    /// Key of the referenced method, or of the first method when no reference is given.
    pub fn ed25519_key(&self, key_ref: Option<&str>) -> ServiceResult<VerifyingKey> {
        let method = match key_ref.filter(|r| r.contains('#')) {
            Some(r) => self.find_method(r),
            None => self.verification_method.first(),
        };
        method
            .ok_or_else(|| {
                ServiceError::Crypto(format!(
                    "no verification method {} in {}",
                    key_ref.unwrap_or("<first>"),
                    self.id
                ))
            })?
            .ed25519_key()
    }
}

pub trait DidResolver: Send + Sync {
    fn resolve(&self, did: &str) -> ServiceResult<DidDocument>;
}

/// Strip a DID URL down to the DID (drop fragment, query and path).
pub fn did_of(did_url: &str) -> &str {
    let end = did_url.find(['#', '?', '/']).unwrap_or(did_url.len());
    &did_url[..end]
}

/// Method name of a syntactically valid DID, `None` otherwise.
pub fn did_method(did: &str) -> Option<&str> {
    let rest = did.strip_prefix("did:")?;
    let (method, id) = rest.split_once(':')?;
    let method_ok = !method.is_empty()
        && method
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    let id_ok = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"._:%-".contains(&b));
    (method_ok && id_ok).then_some(method)
}

/// Resolves `did:key` (Ed25519) without any I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct DidKeyResolver;

impl DidResolver for DidKeyResolver {
    fn resolve(&self, did_url: &str) -> ServiceResult<DidDocument> {
        let did = did_of(did_url);
        match did_method(did) {
            None => return Err(ServiceError::InvalidDid(did_url.to_string())),
            Some("key") => {}
            Some(other) => {
                return Err(ServiceError::Unsupported(format!("DID method {other}")))
            }
        }
        let key = verifying_key_from_did_key(did)?;
        let multibase = encode_multibase_ed25519(&key);
        Ok(DidDocument {
            id: did.to_string(),
            verification_method: vec![VerificationMethod {
                id: format!("{did}#{multibase}"),
                method_type: "Ed25519VerificationKey2020".into(),
                controller: Some(did.to_string()),
                public_key_multibase: Some(multibase),
                public_key_base58: None,
                public_key_jwk: None,
            }],
        })
    }
}

/// In-memory documents keyed by DID.
#[derive(Debug, Default)]
pub struct StaticDidResolver {
    documents: RwLock<HashMap<String, DidDocument>>,
}

impl StaticDidResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: DidDocument) {
        self.documents.write().insert(document.id.clone(), document);
    }

    pub fn with(self, document: DidDocument) -> Self {
        self.insert(document);
        self
    }
}

impl DidResolver for StaticDidResolver {
    fn resolve(&self, did_url: &str) -> ServiceResult<DidDocument> {
        let did = did_of(did_url);
        if did_method(did).is_none() {
            return Err(ServiceError::InvalidDid(did_url.to_string()));
        }
        self.documents
            .read()
            .get(did)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(did.to_string()))
    }
}

/// Tries each resolver in order, skipping those that answer `Unsupported`.
#[derive(Default, Clone)]
pub struct ChainedDidResolver {
    resolvers: Vec<Arc<dyn DidResolver>>,
}

impl ChainedDidResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: Arc<dyn DidResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }
}

impl DidResolver for ChainedDidResolver {
    fn resolve(&self, did: &str) -> ServiceResult<DidDocument> {
        for resolver in &self.resolvers {
            match resolver.resolve(did) {
                Err(ServiceError::Unsupported(_)) => continue,
                other => return other,
            }
        }
        match did_method(did_of(did)) {
            None => Err(ServiceError::InvalidDid(did.to_string())),
            Some(method) => Err(ServiceError::Unsupported(format!(
                "no resolver for DID method {method}"
            ))),
        }
    }
}

/// Resolves one DID method against a universal-resolver style registry:
/// `GET {base_url}{did}` returning the DID document.
pub struct HttpDidResolver {
    http: Arc<dyn HttpClient>,
    base_url: String,
    method: String,
}

impl HttpDidResolver {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            method: method.into(),
        }
    }
}

impl DidResolver for HttpDidResolver {
    fn resolve(&self, did_url: &str) -> ServiceResult<DidDocument> {
        let did = did_of(did_url);
        match did_method(did) {
            None => return Err(ServiceError::InvalidDid(did_url.to_string())),
            Some(m) if m == self.method => {}
            Some(m) => return Err(ServiceError::Unsupported(format!("DID method {m}"))),
        }
        let url = format!("{}{did}", self.base_url);
        let response = self.http.get(&url)?;
        match response.status {
            200..=299 => Ok(serde_json::from_str(&response.body)?),
            404 | 410 => Err(ServiceError::NotFound(did.to_string())),
            400 => Err(ServiceError::InvalidDid(did.to_string())),
            status => Err(ServiceError::Http { url, status }),
        }
    }
}
