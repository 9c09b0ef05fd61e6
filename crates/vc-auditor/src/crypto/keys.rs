//! Ed25519 key pairs and their `did:key` / multibase encodings.
//!
//! `did:key` identifiers for Ed25519 are `did:key:z` followed by the
//! base58btc encoding of the multicodec prefix `0xed 0x01` and the 32-byte
//! public key. The same multibase string is used as the key fragment, so a
//! key's verification method id is `did:key:z6Mk...#z6Mk...`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::error::{ServiceError, ServiceResult};

/// Multicodec prefix of an Ed25519 public key.
pub const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// `did:key` method prefix.
pub const DID_KEY_PREFIX: &str = "did:key:";

/// An Ed25519 key pair, used to issue test fixtures and demo credentials.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519KeyPair {
    /// Deterministic key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// The `did:key` identifier of this key.
    pub fn did_key(&self) -> String {
        did_key_from_verifying_key(&self.verifying_key)
    }

    /// Verification method id: `did:key:z...#z...`.
    pub fn key_id(&self) -> String {
        let multibase = encode_multibase_ed25519(&self.verifying_key);
        format!("{DID_KEY_PREFIX}{multibase}#{multibase}")
    }
}

/// `z` + base58btc(multicodec || key).
pub fn encode_multibase_ed25519(key: &VerifyingKey) -> String {
    let mut bytes = Vec::with_capacity(34);
    bytes.extend_from_slice(&ED25519_MULTICODEC);
    bytes.extend_from_slice(key.as_bytes());
    format!("z{}", bs58::encode(bytes).into_string())
}

/// Decode a multibase Ed25519 key, with or without the multicodec prefix.
pub fn decode_multibase_ed25519(multibase: &str) -> ServiceResult<VerifyingKey> {
    let encoded = multibase
        .strip_prefix('z')
        .ok_or_else(|| ServiceError::Crypto(format!("unsupported multibase encoding: {multibase}")))?;
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| ServiceError::Crypto(format!("invalid base58: {e}")))?;
    let raw = match bytes.as_slice() {
        [0xed, 0x01, rest @ ..] if rest.len() == 32 => rest,
        raw if raw.len() == 32 => raw,
        _ => {
            return Err(ServiceError::Crypto(format!(
                "not an Ed25519 multibase key: {multibase}"
            )))
        }
    };
    verifying_key_from_bytes(raw)
}

/// Decode a raw base58 Ed25519 key (`publicKeyBase58`).
pub fn decode_base58_ed25519(encoded: &str) -> ServiceResult<VerifyingKey> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| ServiceError::Crypto(format!("invalid base58: {e}")))?;
    verifying_key_from_bytes(&bytes)
}

/// Decode the `x` member of an OKP/Ed25519 JWK.
pub fn decode_jwk_x_ed25519(x: &str) -> ServiceResult<VerifyingKey> {
    let bytes = URL_SAFE_NO_PAD
        .decode(x.trim_end_matches('='))
        .map_err(|e| ServiceError::Crypto(format!("invalid JWK x: {e}")))?;
    verifying_key_from_bytes(&bytes)
}

pub fn verifying_key_from_bytes(bytes: &[u8]) -> ServiceResult<VerifyingKey> {
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| ServiceError::Crypto("Ed25519 public key must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&array)
        .map_err(|e| ServiceError::Crypto(format!("invalid verifying key: {e}")))
}

pub fn did_key_from_verifying_key(key: &VerifyingKey) -> String {
    format!("{DID_KEY_PREFIX}{}", encode_multibase_ed25519(key))
}

/// Extract the Ed25519 key from a `did:key` DID or DID URL.
pub fn verifying_key_from_did_key(did: &str) -> ServiceResult<VerifyingKey> {
    let identifier = did
        .strip_prefix(DID_KEY_PREFIX)
        .ok_or_else(|| ServiceError::InvalidDid(did.to_string()))?;
    let multibase = identifier.split('#').next().unwrap_or(identifier);
    decode_multibase_ed25519(multibase).map_err(|_| ServiceError::InvalidDid(did.to_string()))
}
