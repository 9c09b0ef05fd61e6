//! Proof verification policies.

use std::sync::Arc;

use super::{PolicyContext, PolicyError, PolicyResult, SimplePolicy, VerificationPolicy};
use crate::credential::{parse_credential, Artifact, CompactJwt, Credential, Encoding};
use crate::services::SignatureVerifier;

/// Verify the proof of one credential, dispatching on its encoding.
pub(crate) fn verify_credential_proof(
    verifier: &dyn SignatureVerifier,
    credential: &Credential,
) -> Result<PolicyResult, PolicyError> {
    let outcome = match &credential.encoding {
        Encoding::Jwt(jwt) => verifier.verify_jwt(jwt.raw())?,
        Encoding::JsonLd => verifier.verify_json_ld(&credential.encode())?,
    };
    Ok(PolicyResult::check(outcome.verified, || {
        format!(
            "signature of {} could not be verified",
            credential.id.as_deref().unwrap_or("credential")
        )
    }))
}

/// Cryptographic proof check. The default policy.
pub struct SignaturePolicy {
    verifier: Arc<dyn SignatureVerifier>,
}

impl SignaturePolicy {
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { verifier }
    }
}

impl SimplePolicy for SignaturePolicy {
    const ID: &'static str = "SignaturePolicy";
    const DESCRIPTION: &'static str = "Verify by signature";

    fn create(ctx: &PolicyContext) -> Self {
        Self::new(Arc::clone(&ctx.services.signature_verifier))
    }
}

impl VerificationPolicy for SignaturePolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        verify_credential_proof(self.verifier.as_ref(), artifact.common())
    }
}

/// Co-signed payload: `credentialSubject.payload` plus detached
/// `credentialSubject.signatures`. Every signature must verify.
pub struct MultiSignaturePolicy {
    signature: SignaturePolicy,
}

impl SimplePolicy for MultiSignaturePolicy {
    const ID: &'static str = "MultiSignaturePolicy";
    const DESCRIPTION: &'static str = "JWS Multi Signature Verification Policy";

    fn create(ctx: &PolicyContext) -> Self {
        Self {
            signature: SignaturePolicy::create(ctx),
        }
    }
}

impl VerificationPolicy for MultiSignaturePolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        let subject = artifact.common().credential_subject.as_ref();
        let Some(payload) = subject.and_then(|s| s.payload.as_deref()) else {
            return Err(PolicyError::rejected("credentialSubject.payload is missing"));
        };
        let signatures = subject.map(|s| s.signatures.as_slice()).unwrap_or_default();
        if signatures.is_empty() {
            return Err(PolicyError::rejected("credentialSubject.signatures is missing"));
        }

        let mut result = PolicyResult::success();
        for (index, detached) in signatures.iter().enumerate() {
            let token = CompactJwt::from_detached(&detached.protected, payload, &detached.signature);
            let one = match parse_credential(&token) {
                Ok(credential) => self.signature.verify(&Artifact::Credential(credential)),
                Err(e) => PolicyResult::failure(PolicyError::rejected(format!(
                    "signature #{index} does not form a credential: {e}"
                ))),
            };
            result = result.and(one);
        }
        Ok(result)
    }
}
