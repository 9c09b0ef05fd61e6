//! EBSI trust-chain policies.
//!
//! An issuer is trusted when:
//! 1. its DID uses the framework's DID method and resolves
//! 2. the Trusted Issuer Registry holds an accreditation for the schema of
//!    the credential, issued by an accreditor whose own accreditation checks out
//!
//! The chain walk stops one level up (issuer → accreditor). All of these
//! pass presentations, except the subject DID check which reads the holder.

use std::sync::Arc;

use serde::Deserialize;

use super::signature::verify_credential_proof;
use super::{
    OptionalParameterizedPolicy, PolicyContext, PolicyError, PolicyKind, PolicyResult,
    SimplePolicy, VerificationPolicy,
};
use crate::config::EbsiConfig;
use crate::credential::{Artifact, Credential};
use crate::error::ServiceError;
use crate::services::did::did_method;
use crate::services::{
    DidResolver, HttpClient, SignatureVerifier, TirAttribute, TrustedIssuerRegistryClient,
};

/// `termsOfUse` type pointing at a registry accreditation.
pub const VERIFIABLE_ACCREDITATION: &str = "VerifiableAccreditation";
/// Credential type proving an issuer's legal identity.
pub const VERIFIABLE_ID: &str = "VerifiableId";

/// NotFound / InvalidDid are verdicts; anything else is a fault.
fn resolution_verdict(error: ServiceError) -> Result<PolicyResult, PolicyError> {
    match error {
        ServiceError::NotFound(_) => Ok(PolicyResult::failure(PolicyError::rejected(
            "Identifier Not Found",
        ))),
        ServiceError::InvalidDid(_) => Ok(PolicyResult::failure(PolicyError::rejected(
            "did must be a valid DID",
        ))),
        other => Err(other.into()),
    }
}

fn require_issuer(vc: &Credential) -> Result<&str, PolicyError> {
    vc.issuer_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PolicyError::rejected("credential has no issuer"))
}

fn require_schema_id(vc: &Credential) -> Result<&str, PolicyError> {
    vc.credential_schema
        .as_ref()
        .map(|s| s.id.as_str())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PolicyError::rejected("Credential has no associated credentialSchema property"))
}

fn authorises(accreditation: &Credential, schema_id: &str) -> bool {
    accreditation
        .credential_subject
        .as_ref()
        .is_some_and(|s| s.authorised_schema_ids().any(|id| id == schema_id))
}

// ── Issuer DID ───────────────────────────────────────────────────────────────

pub struct EbsiTrustedIssuerDidPolicy {
    resolver: Arc<dyn DidResolver>,
    did_method: String,
}

impl SimplePolicy for EbsiTrustedIssuerDidPolicy {
    const ID: &'static str = "EbsiTrustedIssuerDidPolicy";
    const DESCRIPTION: &'static str = "Verify by trusted issuer did";

    fn create(ctx: &PolicyContext) -> Self {
        Self {
            resolver: Arc::clone(&ctx.services.did_resolver),
            did_method: ctx.config.ebsi.did_method.clone(),
        }
    }
}

impl VerificationPolicy for EbsiTrustedIssuerDidPolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn applies_to_vp(&self) -> bool {
        false
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        let issuer = require_issuer(artifact.common())?;
        match did_method(issuer) {
            None => return Err(PolicyError::rejected("did must be a valid DID")),
            Some(method) if method != self.did_method => {
                return Err(PolicyError::rejected(format!(
                    "issuer {issuer} does not use did:{}",
                    self.did_method
                )))
            }
            Some(_) => {}
        }
        match self.resolver.resolve(issuer) {
            Ok(_) => Ok(PolicyResult::success()),
            Err(e) => resolution_verdict(e),
        }
    }
}

// ── Subject DID ──────────────────────────────────────────────────────────────

/// Subject DID must resolve. An empty subject id is an anonymous subject and passes.
pub struct EbsiTrustedSubjectDidPolicy {
    resolver: Arc<dyn DidResolver>,
}

impl SimplePolicy for EbsiTrustedSubjectDidPolicy {
    const ID: &'static str = "EbsiTrustedSubjectDidPolicy";
    const DESCRIPTION: &'static str = "Verify by trusted subject did";

    fn create(ctx: &PolicyContext) -> Self {
        Self {
            resolver: Arc::clone(&ctx.services.did_resolver),
        }
    }
}

impl VerificationPolicy for EbsiTrustedSubjectDidPolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        let Some(subject) = artifact.common().subject_id.as_deref() else {
            return Err(PolicyError::rejected("credential has no subject id"));
        };
        if subject.is_empty() {
            return Ok(PolicyResult::success());
        }
        match self.resolver.resolve(subject) {
            Ok(_) => Ok(PolicyResult::success()),
            Err(e) => resolution_verdict(e),
        }
    }
}

// ── Trusted schema registry ──────────────────────────────────────────────────

pub struct EbsiTrustedSchemaRegistryPolicy {
    http: Arc<dyn HttpClient>,
    registry: String,
}

impl SimplePolicy for EbsiTrustedSchemaRegistryPolicy {
    const ID: &'static str = "EbsiTrustedSchemaRegistryPolicy";
    const DESCRIPTION: &'static str = "Verify by EBSI Trusted Schema Registry";

    fn create(ctx: &PolicyContext) -> Self {
        Self {
            http: Arc::clone(&ctx.services.http),
            registry: ctx.config.ebsi.trusted_schema_registry.clone(),
        }
    }
}

impl VerificationPolicy for EbsiTrustedSchemaRegistryPolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn applies_to_vp(&self) -> bool {
        false
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        let schema_url = require_schema_id(artifact.common())?;
        if !schema_url.starts_with(&self.registry) {
            return Err(PolicyError::rejected("No valid EBSI Trusted Schema Registry URL"));
        }
        let response = self.http.get(schema_url)?;
        Ok(PolicyResult::check(response.is_success(), || {
            "Schema not available in the EBSI Trusted Schema Registry".to_string()
        }))
    }
}

// ── Issuer accreditation ─────────────────────────────────────────────────────

/// Some `termsOfUse` accreditation must be a validly signed registry entry
/// authorising the credential's schema.
pub struct EbsiTrustedIssuerAccreditationPolicy {
    tir: Arc<dyn TrustedIssuerRegistryClient>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl SimplePolicy for EbsiTrustedIssuerAccreditationPolicy {
    const ID: &'static str = "EbsiTrustedIssuerAccreditationPolicy";
    const DESCRIPTION: &'static str = "Verify by issuer's authorized claims";

    fn create(ctx: &PolicyContext) -> Self {
        Self {
            tir: Arc::clone(&ctx.services.tir_client),
            verifier: Arc::clone(&ctx.services.signature_verifier),
        }
    }
}

impl EbsiTrustedIssuerAccreditationPolicy {
    fn check_accreditation(&self, url: &str, schema_id: &str) -> Result<(), PolicyError> {
        let accreditation = self.tir.get_attribute(url)?.decode_credential()?;
        if !authorises(&accreditation, schema_id) {
            return Err(PolicyError::rejected(format!(
                "accreditation {url} does not authorise schema {schema_id}"
            )));
        }
        let signature = verify_credential_proof(self.verifier.as_ref(), &accreditation)?;
        match signature.error() {
            None => Ok(()),
            Some(cause) => Err(cause.clone()),
        }
    }
}

impl VerificationPolicy for EbsiTrustedIssuerAccreditationPolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn applies_to_vp(&self) -> bool {
        false
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        let vc = artifact.common();
        let schema_id = require_schema_id(vc)?;
        let urls: Vec<&str> = vc
            .terms_of_use
            .iter()
            .filter(|t| t.terms_type == VERIFIABLE_ACCREDITATION)
            .filter_map(|t| t.id.as_deref())
            .collect();
        if urls.is_empty() {
            return Err(PolicyError::rejected("no VerifiableAccreditation in termsOfUse"));
        }

        let mut causes = Vec::new();
        for url in urls {
            match self.check_accreditation(url, schema_id) {
                Ok(()) => return Ok(PolicyResult::success()),
                Err(cause) => {
                    log::debug!("accreditation {url} rejected: {cause}");
                    causes.push(cause);
                }
            }
        }
        Ok(PolicyResult::failures(causes))
    }
}

// ── Trusted issuer registry ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbsiTrustedIssuerRegistryPolicyArg {
    pub registry_address: String,
    /// Expected `issuerType` of the matching accreditation (case-insensitive).
    #[serde(default)]
    pub issuer_type: Option<String>,
}

/// Walks issuer → TIR record → accreditation → accreditor.
pub struct EbsiTrustedIssuerRegistryPolicy {
    argument: Option<EbsiTrustedIssuerRegistryPolicyArg>,
    resolver: Arc<dyn DidResolver>,
    tir: Arc<dyn TrustedIssuerRegistryClient>,
    accreditation: EbsiTrustedIssuerAccreditationPolicy,
    ebsi: EbsiConfig,
}

impl OptionalParameterizedPolicy for EbsiTrustedIssuerRegistryPolicy {
    const ID: &'static str = "EbsiTrustedIssuerRegistryPolicy";
    const DESCRIPTION: &'static str = "Verify by an EBSI Trusted Issuers Registry compliant api.";
    const ARGUMENT_TYPE: &'static str = "EbsiTrustedIssuerRegistryPolicyArg";

    type Argument = EbsiTrustedIssuerRegistryPolicyArg;

    fn create(argument: Option<EbsiTrustedIssuerRegistryPolicyArg>, ctx: &PolicyContext) -> Self {
        Self {
            argument,
            resolver: Arc::clone(&ctx.services.did_resolver),
            tir: Arc::clone(&ctx.services.tir_client),
            accreditation: EbsiTrustedIssuerAccreditationPolicy::create(ctx),
            ebsi: ctx.config.ebsi.clone(),
        }
    }

    fn argument(&self) -> Option<&EbsiTrustedIssuerRegistryPolicyArg> {
        self.argument.as_ref()
    }
}

impl EbsiTrustedIssuerRegistryPolicy {
    fn registry_address(&self) -> &str {
        self.argument
            .as_ref()
            .map(|a| a.registry_address.as_str())
            .unwrap_or(&self.ebsi.trusted_issuer_registry)
    }

    fn issuer_type(&self) -> &str {
        self.argument
            .as_ref()
            .and_then(|a| a.issuer_type.as_deref())
            .unwrap_or(&self.ebsi.default_issuer_type)
    }
}

impl VerificationPolicy for EbsiTrustedIssuerRegistryPolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::OptionalParameterized
    }

    fn applies_to_vp(&self) -> bool {
        false
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        let vc = artifact.common();
        let issuer = require_issuer(vc)?;
        let schema_id = require_schema_id(vc)?;

        let resolved = self.resolver.resolve(issuer)?;
        if resolved.id != issuer {
            return Err(PolicyError::rejected(format!(
                "Resolved DID {} does not match the issuer DID {issuer}",
                resolved.id
            )));
        }

        // 1. registry record
        let record = match self.tir.get_issuer(self.registry_address(), issuer) {
            Ok(record) => record,
            Err(ServiceError::NotFound(_)) => {
                return Err(PolicyError::rejected(format!(
                    "issuer {issuer} has no record on TIR"
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let decoded: Vec<(&TirAttribute, Credential)> = record
            .attributes
            .iter()
            .filter_map(|attribute| match attribute.decode_credential() {
                Ok(vc) => Some((attribute, vc)),
                Err(e) => {
                    log::debug!("skipping undecodable TIR attribute of {issuer}: {e}");
                    None
                }
            })
            .collect();

        // 2. accreditations for this schema
        let matching: Vec<&(&TirAttribute, Credential)> = decoded
            .iter()
            .filter(|(_, accreditation)| authorises(accreditation, schema_id))
            .collect();
        if matching.is_empty() {
            return Err(PolicyError::rejected(
                "no authorization claims matching the credential schema",
            ));
        }

        // 3. legal identity
        let has_identity = decoded.iter().any(|(_, vc)| {
            vc.has_type(VERIFIABLE_ID) && vc.subject_id.as_deref() == Some(issuer)
        });
        if !has_identity {
            return Err(PolicyError::rejected(format!(
                "no {VERIFIABLE_ID} registered for issuer {issuer}"
            )));
        }

        // 4. issuer type
        let expected = self.issuer_type();
        let typed: Vec<&Credential> = matching
            .iter()
            .filter(|(attribute, _)| attribute.issuer_type.eq_ignore_ascii_case(expected))
            .map(|(_, accreditation)| accreditation)
            .collect();
        if typed.is_empty() {
            return Err(PolicyError::rejected(format!(
                "issuer type of the accreditation does not match {expected}"
            )));
        }

        // 5. the accreditor's side, one level up
        let accredited = typed.into_iter().any(|accreditation| {
            self.accreditation
                .verify(&Artifact::Credential(accreditation.clone()))
                .is_success()
        });
        Ok(PolicyResult::check(accredited, || {
            "accreditation is not valid".to_string()
        }))
    }
}
