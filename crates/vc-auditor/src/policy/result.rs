//! Outcome of one policy run.

use serde::{Serialize, Serializer};

use crate::error::ServiceError;

/// Why a policy did not hold.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    /// The rule was evaluated and did not hold.
    #[error("{0}")]
    Rejected(String),

    /// The policy could not be evaluated with what it was given.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A collaborator (resolver, registry, HTTP, verifier) failed.
    #[error(transparent)]
    Collaborator(#[from] ServiceError),

    #[error("policy timed out after {millis} ms")]
    Timeout { millis: u64 },

    #[error("CredentialStatus (type {status_type}) was REVOKED at timestamp {} for id {id}", .revoked_at.as_deref().unwrap_or("unknown"))]
    Revoked {
        status_type: String,
        id: String,
        revoked_at: Option<String>,
    },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("policy failed without a cause")]
    Unspecified,
}

impl PolicyError {
    pub fn rejected(message: impl Into<String>) -> Self {
        PolicyError::Rejected(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        PolicyError::Configuration(message.into())
    }
}

impl Serialize for PolicyError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result of a single policy.
///
/// `success` is true exactly when `errors` is empty; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyResult {
    success: bool,
    errors: Vec<PolicyError>,
}

impl PolicyResult {
    pub fn success() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn failure(cause: impl Into<PolicyError>) -> Self {
        Self {
            success: false,
            errors: vec![cause.into()],
        }
    }

    /// Failure with several causes. An empty list becomes [`PolicyError::Unspecified`].
    pub fn failures(causes: Vec<PolicyError>) -> Self {
        if causes.is_empty() {
            return Self::failure(PolicyError::Unspecified);
        }
        Self {
            success: false,
            errors: causes,
        }
    }

    /// `success()` when `holds`, otherwise a rejection with `message`.
    pub fn check(holds: bool, message: impl FnOnce() -> String) -> Self {
        if holds {
            Self::success()
        } else {
            Self::failure(PolicyError::Rejected(message()))
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// First cause, if failed.
    pub fn error(&self) -> Option<&PolicyError> {
        self.errors.first()
    }

    pub fn errors(&self) -> &[PolicyError] {
        &self.errors
    }

    /// Logical AND, keeping every cause.
    pub fn and(self, other: PolicyResult) -> PolicyResult {
        if self.success && other.success {
            return PolicyResult::success();
        }
        let mut errors = self.errors;
        errors.extend(other.errors);
        PolicyResult::failures(errors)
    }
}

impl std::fmt::Display for PolicyResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.success {
            return write!(f, "passed");
        }
        let causes: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "failed: {}", causes.join("; "))
    }
}
