//! Verification policies.
//!
//! Every rule implements [`VerificationPolicy`]. Policies come in three
//! construction variants, each with its own trait:
//! - [`SimplePolicy`]: no argument.
//! - [`ParameterizedPolicy`]: a required argument bound at construction.
//! - [`OptionalParameterizedPolicy`]: an argument that may be absent; the
//!   policy decides what absence means.
//!
//! Families:
//! - [`structural`]: issuance / validity / expiration dates, challenge
//! - [`signature`]: proof verification, multi-signature
//! - [`content`]: JSON schema, presentation definition
//! - [`status`]: revocation
//! - [`ebsi`]: EBSI trust chain

pub mod content;
pub mod ebsi;
mod result;
pub mod signature;
pub mod status;
pub mod structural;

pub use result::{PolicyError, PolicyResult};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::AuditorConfig;
use crate::credential::{Artifact, Credential};
use crate::services::Services;

/// Construction variant of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    Simple,
    Parameterized,
    OptionalParameterized,
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::Simple => write!(f, "simple"),
            PolicyKind::Parameterized => write!(f, "parameterized"),
            PolicyKind::OptionalParameterized => write!(f, "optional-parameterized"),
        }
    }
}

/// What a policy may read while running.
#[derive(Clone)]
pub struct PolicyContext {
    pub services: Services,
    pub config: Arc<AuditorConfig>,
}

impl PolicyContext {
    pub fn new(services: Services, config: AuditorConfig) -> Self {
        Self {
            services,
            config: Arc::new(config),
        }
    }
}

/// One verification rule.
pub trait VerificationPolicy: Send + Sync {
    /// Stable id used for registry lookup and reporting.
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    fn kind(&self) -> PolicyKind {
        PolicyKind::Simple
    }

    fn applies_to_vc(&self) -> bool {
        true
    }

    fn applies_to_vp(&self) -> bool {
        true
    }

    /// Whether the auditor also runs this policy on a presentation's embedded credentials.
    fn checks_embedded_credentials(&self) -> bool {
        true
    }

    /// The rule itself. `Err` is turned into a failed result by [`verify`](Self::verify).
    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError>;

    /// Run the policy. Never fails: inapplicable artifacts pass, faults become failures.
    fn verify(&self, artifact: &Artifact) -> PolicyResult {
        let applies = if artifact.is_presentation() {
            self.applies_to_vp()
        } else {
            self.applies_to_vc()
        };
        if !applies {
            log::debug!("{} does not apply to {}", self.id(), artifact.kind_name());
            return PolicyResult::success();
        }

        let result = match self.do_verify(artifact) {
            Ok(result) => result,
            Err(cause) => {
                if matches!(cause, PolicyError::Collaborator(_)) {
                    log::warn!("{}: collaborator fault: {cause}", self.id());
                }
                PolicyResult::failure(cause)
            }
        };
        log::debug!(
            "{} {:?} passes policy {}: {result}",
            artifact.kind_name(),
            artifact.common().types,
            self.id()
        );
        result
    }
}

/// A policy without arguments.
pub trait SimplePolicy: VerificationPolicy + Sized + 'static {
    const ID: &'static str;
    const DESCRIPTION: &'static str;

    fn create(ctx: &PolicyContext) -> Self;
}

/// A policy with a required argument.
pub trait ParameterizedPolicy: VerificationPolicy + Sized + 'static {
    const ID: &'static str;
    const DESCRIPTION: &'static str;
    /// Argument type name shown in policy listings.
    const ARGUMENT_TYPE: &'static str;

    type Argument: DeserializeOwned + Send + Sync;

    fn create(argument: Self::Argument, ctx: &PolicyContext) -> Self;

    fn argument(&self) -> &Self::Argument;
}

/// A policy with an optional argument.
pub trait OptionalParameterizedPolicy: VerificationPolicy + Sized + 'static {
    const ID: &'static str;
    const DESCRIPTION: &'static str;
    const ARGUMENT_TYPE: &'static str;

    type Argument: DeserializeOwned + Send + Sync;

    fn create(argument: Option<Self::Argument>, ctx: &PolicyContext) -> Self;

    fn argument(&self) -> Option<&Self::Argument>;
}

/// The credential a VC-only rule looks at, or `None` for a presentation.
pub(crate) fn credential_of(artifact: &Artifact) -> Option<&Credential> {
    artifact.as_credential()
}
