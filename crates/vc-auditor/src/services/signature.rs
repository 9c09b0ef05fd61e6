//! Proof verification, one entry point per encoding.
//!
//! Callers pick the entry point from [`crate::credential::Encoding`]; a
//! verifier never sniffs the format itself.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use super::did::{did_of, DidResolver};
use crate::credential::CompactJwt;
use crate::crypto::signing;
use crate::error::{ServiceError, ServiceResult};

/// Verifier answer. `Err` is reserved for faults (unresolvable key, bad encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    pub verified: bool,
}

pub trait SignatureVerifier: Send + Sync {
    /// Verify a compact JWT / SD-JWT.
    fn verify_jwt(&self, token: &str) -> ServiceResult<VerificationOutcome>;

    /// Verify a JSON-LD document with an embedded proof.
    fn verify_json_ld(&self, document: &str) -> ServiceResult<VerificationOutcome>;
}

/// Ed25519 verifier resolving keys through a [`DidResolver`].
pub struct Ed25519SignatureVerifier {
    resolver: Arc<dyn DidResolver>,
}

impl Ed25519SignatureVerifier {
    pub fn new(resolver: Arc<dyn DidResolver>) -> Self {
        Self { resolver }
    }
}

impl SignatureVerifier for Ed25519SignatureVerifier {
    fn verify_jwt(&self, token: &str) -> ServiceResult<VerificationOutcome> {
        let jwt = CompactJwt::parse(token).map_err(|e| ServiceError::Parse(e.to_string()))?;
        let payload = jwt.payload();
        let issuer = payload.get("iss").and_then(Value::as_str).or_else(|| {
            let claims = payload.get("vc").or_else(|| payload.get("vp"))?;
            claimed_signer(claims.as_object()?)
        });

        // kid may be absolute, relative ("#key-1") or missing
        let key_ref = match (jwt.key_id(), issuer) {
            (Some(kid), Some(iss)) if kid.starts_with('#') => format!("{iss}{kid}"),
            (Some(kid), _) => kid.to_string(),
            (None, Some(iss)) => iss.to_string(),
            (None, None) => {
                return Err(ServiceError::Crypto(
                    "JWT carries neither kid nor iss".into(),
                ))
            }
        };
        if let Some(iss) = issuer {
            check_key_owner(&key_ref, iss)?;
        }

        let document = self.resolver.resolve(did_of(&key_ref))?;
        let key = document.ed25519_key(Some(&key_ref))?;
        let verified = signing::verify_jwt(&key, &jwt)?;
        log::debug!("JWT signature by {key_ref}: verified={verified}");
        Ok(VerificationOutcome { verified })
    }

    fn verify_json_ld(&self, document: &str) -> ServiceResult<VerificationOutcome> {
        let value: Value = serde_json::from_str(document)?;
        let map = value
            .as_object()
            .ok_or_else(|| ServiceError::Parse("JSON-LD document must be an object".into()))?;
        let proof = signing::first_proof(map)
            .ok_or_else(|| ServiceError::Crypto("document has no proof".into()))?;

        let key_ref = proof
            .get("verificationMethod")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::Crypto("proof has no verificationMethod".into()))?;
        if let Some(signer) = claimed_signer(map) {
            check_key_owner(key_ref, signer)?;
        }

        let did_document = self.resolver.resolve(did_of(key_ref))?;
        let key = did_document.ed25519_key(Some(key_ref))?;
        let verified = signing::verify_json_ld(&key, map)?;
        log::debug!("JSON-LD proof by {key_ref}: verified={verified}");
        Ok(VerificationOutcome { verified })
    }
}

/// DID named as the document's signer: `issuer` (string or `{id}`), else `holder`.
fn claimed_signer(document: &Map<String, Value>) -> Option<&str> {
    match document.get("issuer") {
        Some(Value::String(id)) => Some(id.as_str()),
        Some(Value::Object(issuer)) => issuer.get("id").and_then(Value::as_str),
        _ => document.get("holder").and_then(Value::as_str),
    }
}

/// The signing key must belong to the DID the document claims as its signer.
fn check_key_owner(key_ref: &str, signer: &str) -> ServiceResult<()> {
    if did_of(key_ref) == did_of(signer) {
        Ok(())
    } else {
        Err(ServiceError::Crypto(format!(
            "signing key {key_ref} is not controlled by {signer}"
        )))
    }
}
