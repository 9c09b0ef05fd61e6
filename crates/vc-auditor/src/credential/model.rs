//! Credential and presentation model.
//!
//! Both encodings (JSON-LD and JWT) are normalized into one [`Credential`]
//! shape. The typed substructures policies rely on (schema, status, terms
//! of use, authorisation claims, detached signatures) are validated here,
//! once, so policies never re-check JSON shapes. A field that is present
//! but malformed rejects the whole artifact; an absent field is `None` or
//! an empty list.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::jwt::CompactJwt;
use crate::error::{AuditorError, Result};
use crate::time::unix_seconds_to_date;

/// How the credential arrived on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Encoding {
    /// Compact JWT or SD-JWT; the raw token is kept for signature checks.
    Jwt(CompactJwt),
    /// Embedded-proof JSON-LD document.
    JsonLd,
}

/// `credentialSchema` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchema {
    pub id: String,
    #[serde(rename = "type", default)]
    pub schema_type: String,
}

/// `credentialStatus` entry. Type-specific members stay in `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialStatus {
    pub id: String,
    #[serde(rename = "type")]
    pub status_type: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// `termsOfUse` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsOfUse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub terms_type: String,
}

/// EBSI `authorisationClaims` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorisationClaim {
    #[serde(default)]
    pub authorised_schema_id: Option<String>,
}

/// EBSI `accreditedFor` entry (newer accreditation credentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccreditedFor {
    #[serde(default)]
    pub schema_id: Option<String>,
}

/// One detached JWS fragment of a multi-signature credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedSignature {
    pub protected: String,
    pub signature: String,
}

/// The typed view of `credentialSubject` (first subject when there are several).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub authorisation_claims: Vec<AuthorisationClaim>,
    #[serde(default)]
    pub accredited_for: Vec<AccreditedFor>,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub signatures: Vec<DetachedSignature>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl CredentialSubject {
    /// Schema ids this subject is authorised or accredited for.
    pub fn authorised_schema_ids(&self) -> impl Iterator<Item = &str> {
        self.authorisation_claims
            .iter()
            .filter_map(|c| c.authorised_schema_id.as_deref())
            .chain(self.accredited_for.iter().filter_map(|a| a.schema_id.as_deref()))
    }
}

/// A verifiable credential (also used as the envelope of a presentation).
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub id: Option<String>,
    pub types: Vec<String>,
    pub issuer_id: Option<String>,
    pub subject_id: Option<String>,
    pub issued: Option<String>,
    pub valid_from: Option<String>,
    pub expiration_date: Option<String>,
    pub challenge: Option<String>,
    pub credential_schema: Option<CredentialSchema>,
    pub credential_status: Option<CredentialStatus>,
    pub terms_of_use: Vec<TermsOfUse>,
    pub credential_subject: Option<CredentialSubject>,
    /// Full JSON view (for JWTs: the `vc`/`vp` claim enriched with registered claims).
    pub document: Map<String, Value>,
    pub encoding: Encoding,
}

impl Credential {
    /// Build from a JSON-LD object.
    pub fn from_json_ld(document: Map<String, Value>) -> Result<Self> {
        let challenge = proof_challenge(&document);
        Self::build(document, Encoding::JsonLd, challenge, "issuer")
    }

    /// Build from a compact JWT whose payload carries a `vc` claim (or is the credential).
    pub fn from_jwt(jwt: CompactJwt) -> Result<Self> {
        let document = jwt_view(&jwt, "vc", "issuer");
        let challenge = jwt.payload().get("nonce").and_then(Value::as_str).map(str::to_string);
        Self::build(document, Encoding::Jwt(jwt), challenge, "issuer")
    }

    pub(crate) fn build(
        document: Map<String, Value>,
        encoding: Encoding,
        challenge: Option<String>,
        issuer_key: &str,
    ) -> Result<Self> {
        let credential_subject = one_or_many::<CredentialSubject>(&document, "credentialSubject")?
            .into_iter()
            .next();
        let subject_id = credential_subject.as_ref().and_then(|s| s.id.clone());

        Ok(Self {
            id: string_field(&document, "id"),
            types: types_of(&document),
            issuer_id: document.get(issuer_key).and_then(id_of),
            subject_id,
            issued: string_field(&document, "issued")
                .or_else(|| string_field(&document, "issuanceDate")),
            valid_from: string_field(&document, "validFrom")
                .or_else(|| string_field(&document, "issuanceDate")),
            expiration_date: string_field(&document, "expirationDate")
                .or_else(|| string_field(&document, "validUntil")),
            challenge,
            credential_schema: one_or_many::<CredentialSchema>(&document, "credentialSchema")?
                .into_iter()
                .next(),
            credential_status: optional::<CredentialStatus>(&document, "credentialStatus")?,
            terms_of_use: one_or_many::<TermsOfUse>(&document, "termsOfUse")?,
            credential_subject,
            document,
            encoding,
        })
    }

    /// Most specific type (last entry of `type`).
    pub fn credential_type(&self) -> Option<&str> {
        self.types.last().map(String::as_str)
    }

    pub fn has_type(&self, t: &str) -> bool {
        self.types.iter().any(|x| x == t)
    }

    pub fn is_jwt(&self) -> bool {
        matches!(self.encoding, Encoding::Jwt(_))
    }

    pub fn jwt(&self) -> Option<&CompactJwt> {
        match &self.encoding {
            Encoding::Jwt(jwt) => Some(jwt),
            Encoding::JsonLd => None,
        }
    }

    /// JSON view used for schema validation and descriptor matching.
    pub fn to_json(&self) -> Value {
        Value::Object(self.document.clone())
    }

    /// Wire form: the raw token for JWTs, compact JSON otherwise.
    pub fn encode(&self) -> String {
        match &self.encoding {
            Encoding::Jwt(jwt) => jwt.raw().to_string(),
            Encoding::JsonLd => self.to_json().to_string(),
        }
    }
}

/// A verifiable presentation: an envelope plus the embedded credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    /// The presentation itself; `issuer_id`/`subject_id` carry the holder.
    pub envelope: Credential,
    pub verifiable_credential: Vec<Credential>,
}

impl Presentation {
    pub fn from_json_ld(document: Map<String, Value>) -> Result<Self> {
        let verifiable_credential = embedded_credentials(&document)?;
        let challenge = proof_challenge(&document);
        let mut envelope = Credential::build(document, Encoding::JsonLd, challenge, "holder")?;
        envelope.subject_id = envelope.issuer_id.clone();
        Ok(Self {
            envelope,
            verifiable_credential,
        })
    }

    pub fn from_jwt(jwt: CompactJwt) -> Result<Self> {
        let document = jwt_view(&jwt, "vp", "holder");
        let verifiable_credential = embedded_credentials(&document)?;
        let challenge = jwt.payload().get("nonce").and_then(Value::as_str).map(str::to_string);
        let mut envelope = Credential::build(document, Encoding::Jwt(jwt), challenge, "holder")?;
        envelope.subject_id = envelope.issuer_id.clone();
        Ok(Self {
            envelope,
            verifiable_credential,
        })
    }

    pub fn holder(&self) -> Option<&str> {
        self.envelope.issuer_id.as_deref()
    }
}

// ── JSON helpers ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// A string, or an object's `id` member.
fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn types_of(map: &Map<String, Value>) -> Vec<String> {
    match map.get("type") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn optional<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Result<Option<T>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| AuditorError::InvalidArtifact(format!("malformed {key}: {e}"))),
    }
}

fn one_or_many<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Result<Vec<T>> {
    Ok(match optional::<OneOrMany<T>>(map, key)? {
        None => Vec::new(),
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Many(items)) => items,
    })
}

/// `proof.challenge` or `proof.nonce` of the first proof.
fn proof_challenge(map: &Map<String, Value>) -> Option<String> {
    let proof = match map.get("proof")? {
        Value::Array(items) => items.first()?,
        other => other,
    };
    proof
        .get("challenge")
        .or_else(|| proof.get("nonce"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn embedded_credentials(map: &Map<String, Value>) -> Result<Vec<Credential>> {
    let items = match map.get("verifiableCredential") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(doc) => Credential::from_json_ld(doc),
            Value::String(text) => super::parse_credential(&text),
            _ => Err(AuditorError::InvalidArtifact(
                "verifiableCredential entries must be objects or JWT strings".into(),
            )),
        })
        .collect()
}

/// JSON view of a JWT: the `claim` object (or the whole payload), with
/// registered claims filled in where the document does not set them.
fn jwt_view(jwt: &CompactJwt, claim: &str, issuer_key: &str) -> Map<String, Value> {
    let payload = jwt.payload();
    let mut view = match payload.get(claim) {
        Some(Value::Object(inner)) => inner.clone(),
        _ => payload.clone(),
    };

    let date = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_i64)
            .and_then(unix_seconds_to_date)
            .map(Value::String)
    };
    fill(&mut view, "id", payload.get("jti").cloned());
    fill(&mut view, issuer_key, payload.get("iss").cloned());
    fill(&mut view, "issued", date("iat"));
    fill(&mut view, "issuanceDate", date("nbf").or_else(|| date("iat")));
    fill(&mut view, "validFrom", date("nbf"));
    fill(&mut view, "expirationDate", date("exp"));

    if let Some(Value::String(sub)) = payload.get("sub") {
        match view.get_mut("credentialSubject") {
            Some(Value::Object(subject)) => {
                subject
                    .entry("id")
                    .or_insert_with(|| Value::String(sub.clone()));
            }
            None => {
                let mut subject = Map::new();
                subject.insert("id".into(), Value::String(sub.clone()));
                view.insert("credentialSubject".into(), Value::Object(subject));
            }
            Some(_) => {}
        }
    }
    view
}

fn fill(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.entry(key.to_string()).or_insert(value);
    }
}
