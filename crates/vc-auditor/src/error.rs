//! Error types for the verification engine.
//!
//! Three layers:
//! - [`AuditorError`] is raised before any policy runs (unknown policy id,
//!   missing argument, unparseable artifact, bad configuration).
//! - [`ServiceError`] is what collaborators (DID resolver, registry client,
//!   HTTP, schema validator) return.
//! - [`crate::policy::PolicyError`] is the cause carried inside a
//!   [`crate::policy::PolicyResult`]; it never escapes `verify()`.

/// Configuration and input errors reported before evaluation begins.
#[derive(Debug, thiserror::Error)]
pub enum AuditorError {
    #[error("Unknown verification policy: {0}")]
    UnknownPolicy(String),

    #[error("Policy {policy} requires an argument of type {argument_type}")]
    MissingArgument {
        policy: String,
        argument_type: &'static str,
    },

    #[error("Invalid argument for policy {policy}: {reason}")]
    InvalidArgument { policy: String, reason: String },

    #[error("Invalid credential: {0}")]
    InvalidArtifact(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, AuditorError>;

/// Faults raised by external collaborators.
///
/// `NotFound` and `InvalidDid` are the recognizable DID resolution kinds
/// that the subject/issuer DID policies branch on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Identifier Not Found: {0}")]
    NotFound(String),

    #[error("did must be a valid DID: {0}")]
    InvalidDid(String),

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::Transport(e.to_string())
    }
}

/// Result alias for collaborator calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
