//! Verifiable credentials and presentations.
//!
//! [`Artifact::parse`] accepts either encoding:
//! - a JSON-LD document (`{ ... }`), or a JSON string wrapping a token,
//! - a compact JWT or SD-JWT.
//!
//! Anything whose `type` contains `VerifiablePresentation` (or whose JWT
//! carries a `vp` claim) becomes an [`Artifact::Presentation`].

pub mod jwt;
pub mod model;

pub use jwt::CompactJwt;
pub use model::{
    AccreditedFor, AuthorisationClaim, Credential, CredentialSchema, CredentialStatus,
    CredentialSubject, DetachedSignature, Encoding, Presentation, TermsOfUse,
};

use std::str::FromStr;

use serde_json::Value;

use crate::error::{AuditorError, Result};

/// Type marker of presentations.
pub const PRESENTATION_TYPE: &str = "VerifiablePresentation";

/// The thing being verified.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Credential(Credential),
    Presentation(Presentation),
}

impl Artifact {
    /// Parse either encoding.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.starts_with('{') {
            return Self::from_json(serde_json::from_str(trimmed)?);
        }
        if trimmed.starts_with('"') {
            let inner: String = serde_json::from_str(trimmed)?;
            return Self::parse(&inner);
        }
        if CompactJwt::looks_like_jwt(trimmed) {
            return Self::from_jwt(CompactJwt::parse(trimmed)?);
        }
        Err(AuditorError::InvalidArtifact(
            "input is neither a JSON-LD document nor a compact JWT".into(),
        ))
    }

    /// Build from an already-parsed JSON value.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(document) => {
                let is_vp = match document.get("type") {
                    Some(Value::String(t)) => t == PRESENTATION_TYPE,
                    Some(Value::Array(ts)) => ts.iter().any(|t| t == PRESENTATION_TYPE),
                    _ => false,
                };
                if is_vp {
                    Ok(Artifact::Presentation(Presentation::from_json_ld(document)?))
                } else {
                    Ok(Artifact::Credential(Credential::from_json_ld(document)?))
                }
            }
            Value::String(text) => Self::parse(&text),
            _ => Err(AuditorError::InvalidArtifact(
                "credential must be a JSON object or a JWT string".into(),
            )),
        }
    }

    pub fn from_jwt(jwt: CompactJwt) -> Result<Self> {
        if jwt.payload().get("vp").is_some_and(Value::is_object) {
            Ok(Artifact::Presentation(Presentation::from_jwt(jwt)?))
        } else {
            Ok(Artifact::Credential(Credential::from_jwt(jwt)?))
        }
    }

    /// Fields shared by both kinds (the envelope for presentations).
    pub fn common(&self) -> &Credential {
        match self {
            Artifact::Credential(vc) => vc,
            Artifact::Presentation(vp) => &vp.envelope,
        }
    }

    pub fn is_presentation(&self) -> bool {
        matches!(self, Artifact::Presentation(_))
    }

    pub fn as_credential(&self) -> Option<&Credential> {
        match self {
            Artifact::Credential(vc) => Some(vc),
            Artifact::Presentation(_) => None,
        }
    }

    pub fn as_presentation(&self) -> Option<&Presentation> {
        match self {
            Artifact::Credential(_) => None,
            Artifact::Presentation(vp) => Some(vp),
        }
    }

    /// Human-readable kind, used in log lines.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Artifact::Credential(_) => "VerifiableCredential",
            Artifact::Presentation(_) => PRESENTATION_TYPE,
        }
    }
}

impl FromStr for Artifact {
    type Err = AuditorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Credential> for Artifact {
    fn from(vc: Credential) -> Self {
        Artifact::Credential(vc)
    }
}

impl From<Presentation> for Artifact {
    fn from(vp: Presentation) -> Self {
        Artifact::Presentation(vp)
    }
}

/// Parse text that must be a single credential (not a presentation).
pub fn parse_credential(text: &str) -> Result<Credential> {
    match Artifact::parse(text)? {
        Artifact::Credential(vc) => Ok(vc),
        Artifact::Presentation(_) => Err(AuditorError::InvalidArtifact(
            "expected a credential, found a presentation".into(),
        )),
    }
}
