//! Revocation check.

use std::sync::Arc;

use super::{PolicyContext, PolicyError, PolicyResult, SimplePolicy, VerificationPolicy};
use crate::credential::Artifact;
use crate::services::status::{SIMPLE_STATUS_2022, STATUS_LIST_2021_ENTRY};
use crate::services::CredentialStatusService;

/// `credentialStatus` must be present, of a known type, and not revoked.
pub struct CredentialStatusPolicy {
    status_service: Arc<dyn CredentialStatusService>,
}

impl SimplePolicy for CredentialStatusPolicy {
    const ID: &'static str = "CredentialStatusPolicy";
    const DESCRIPTION: &'static str = "Verify by credential status";

    fn create(ctx: &PolicyContext) -> Self {
        Self {
            status_service: Arc::clone(&ctx.services.status_service),
        }
    }
}

impl VerificationPolicy for CredentialStatusPolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    // a presentation carries no status of its own; embedded credentials are checked
    fn applies_to_vp(&self) -> bool {
        false
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        let Some(status) = artifact.common().credential_status.as_ref() else {
            return Err(PolicyError::rejected("CredentialStatus not specified"));
        };
        if status.status_type != SIMPLE_STATUS_2022 && status.status_type != STATUS_LIST_2021_ENTRY {
            return Err(PolicyError::Unsupported(format!(
                "CredentialStatus type {} is not yet supported",
                status.status_type
            )));
        }

        let revocation = self.status_service.check(status)?;
        if revocation.is_revoked {
            return Err(PolicyError::Revoked {
                status_type: status.status_type.clone(),
                id: status.id.clone(),
                revoked_at: revocation.revocation_time,
            });
        }
        Ok(PolicyResult::success())
    }
}
