//! Ed25519 signing and verification for both credential encodings.
//!
//! JWT: EdDSA over `header.payload`.
//!
//! JSON-LD: the signing input is the canonical JSON (recursively sorted
//! keys, no whitespace) of `[document-without-proof, proof-options]`, where
//! proof options are the proof minus `proofValue`/`jws`. Two proof forms
//! are accepted:
//! 1. `Ed25519Signature2020` with `proofValue` = `z` + base58btc(signature)
//! 2. `Ed25519Signature2018` with a detached `jws` (`header..signature`)

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, Verifier, VerifyingKey};
use serde_json::{json, Map, Value};

use super::keys::Ed25519KeyPair;
use crate::credential::jwt::{encode_segment, CompactJwt};
use crate::error::{ServiceError, ServiceResult};

pub const PROOF_TYPE_2020: &str = "Ed25519Signature2020";
pub const PROOF_TYPE_2018: &str = "Ed25519Signature2018";

/// Verify an Ed25519 signature. `Ok(false)` means the signature does not match.
pub fn verify(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> ServiceResult<bool> {
    let bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| ServiceError::Crypto("signature must be 64 bytes".into()))?;
    Ok(key.verify(message, &Signature::from_bytes(&bytes)).is_ok())
}

// ── JWT ──────────────────────────────────────────────────────────────────────

/// Sign `payload` as a compact EdDSA JWT with `kid` set to the key's DID URL.
pub fn sign_jwt(key_pair: &Ed25519KeyPair, payload: &Value) -> String {
    let header = json!({"alg": "EdDSA", "typ": "JWT", "kid": key_pair.key_id()});
    let signing_input = format!("{}.{}", encode_segment(&header), encode_segment(payload));
    let signature = key_pair.signing_key().sign(signing_input.as_bytes());
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

/// Verify a compact JWT against a known key.
pub fn verify_jwt(key: &VerifyingKey, jwt: &CompactJwt) -> ServiceResult<bool> {
    match jwt.algorithm() {
        Some("EdDSA") | Some("Ed25519") => {}
        other => {
            return Err(ServiceError::Unsupported(format!(
                "JWT algorithm {}",
                other.unwrap_or("<none>")
            )))
        }
    }
    let signature = jwt
        .signature_bytes()
        .map_err(|e| ServiceError::Crypto(e.to_string()))?;
    verify(key, jwt.signing_input().as_bytes(), &signature)
}

// ── JSON-LD ──────────────────────────────────────────────────────────────────

/// Recursively sort object keys.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn signing_input(document: &Map<String, Value>, proof: &Map<String, Value>) -> Vec<u8> {
    let mut unsigned = document.clone();
    unsigned.remove("proof");
    let mut options = proof.clone();
    options.remove("proofValue");
    options.remove("jws");
    canonicalize(&json!([Value::Object(unsigned), Value::Object(options)]))
        .to_string()
        .into_bytes()
}

/// Attach an `Ed25519Signature2020` proof to `document`.
pub fn sign_json_ld(
    key_pair: &Ed25519KeyPair,
    document: &mut Map<String, Value>,
    challenge: Option<&str>,
) {
    let mut proof = Map::new();
    proof.insert("type".into(), json!(PROOF_TYPE_2020));
    proof.insert("proofPurpose".into(), json!("assertionMethod"));
    proof.insert("verificationMethod".into(), json!(key_pair.key_id()));
    if let Some(challenge) = challenge {
        proof.insert("challenge".into(), json!(challenge));
    }
    let signature = key_pair.signing_key().sign(&signing_input(document, &proof));
    proof.insert(
        "proofValue".into(),
        json!(format!("z{}", bs58::encode(signature.to_bytes()).into_string())),
    );
    document.insert("proof".into(), Value::Object(proof));
}

/// The first proof object of a document.
pub fn first_proof(document: &Map<String, Value>) -> Option<&Map<String, Value>> {
    match document.get("proof")? {
        Value::Object(proof) => Some(proof),
        Value::Array(items) => items.first().and_then(Value::as_object),
        _ => None,
    }
}

/// Verify the embedded proof of a JSON-LD document against a known key.
pub fn verify_json_ld(key: &VerifyingKey, document: &Map<String, Value>) -> ServiceResult<bool> {
    let proof = first_proof(document)
        .ok_or_else(|| ServiceError::Crypto("document has no proof".into()))?;
    let input = signing_input(document, proof);

    if let Some(proof_value) = proof.get("proofValue").and_then(Value::as_str) {
        let encoded = proof_value
            .strip_prefix('z')
            .ok_or_else(|| ServiceError::Crypto("proofValue must be base58btc multibase".into()))?;
        let signature = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| ServiceError::Crypto(format!("invalid proofValue: {e}")))?;
        return verify(key, &input, &signature);
    }

    if let Some(jws) = proof.get("jws").and_then(Value::as_str) {
        let (header, signature) = jws
            .split_once("..")
            .ok_or_else(|| ServiceError::Crypto("jws must be detached (header..signature)".into()))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature.trim_end_matches('='))
            .map_err(|e| ServiceError::Crypto(format!("invalid jws signature: {e}")))?;
        let message = format!("{header}.{}", URL_SAFE_NO_PAD.encode(&input));
        return verify(key, message.as_bytes(), &signature);
    }

    Err(ServiceError::Crypto(
        "proof carries neither proofValue nor jws".into(),
    ))
}

/// Sign the detached-JWS form (`Ed25519Signature2018`). Used for fixtures.
pub fn sign_json_ld_detached(key_pair: &Ed25519KeyPair, document: &mut Map<String, Value>) {
    let mut proof = Map::new();
    proof.insert("type".into(), json!(PROOF_TYPE_2018));
    proof.insert("proofPurpose".into(), json!("assertionMethod"));
    proof.insert("verificationMethod".into(), json!(key_pair.key_id()));
    let header = encode_segment(&json!({"alg": "EdDSA", "b64": false, "crit": ["b64"]}));
    let message = format!(
        "{header}.{}",
        URL_SAFE_NO_PAD.encode(signing_input(document, &proof))
    );
    let signature = key_pair.signing_key().sign(message.as_bytes());
    proof.insert(
        "jws".into(),
        json!(format!("{header}..{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))),
    );
    document.insert("proof".into(), Value::Object(proof));
}
