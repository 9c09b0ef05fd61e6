//! vc-auditor — policy-driven verification of W3C Verifiable Credentials.
//!
//! Given a credential or presentation (JSON-LD or JWT), the auditor runs a
//! chosen set of policies (signature, dates, challenge, JSON schema,
//! presentation definition, revocation, EBSI trust chain) and reports every
//! policy's outcome plus an overall verdict.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vc_auditor::{AuditorConfig, AuditorService, PolicyContext, PolicyRegistry, PolicyRequest, Services};
//!
//! let config = AuditorConfig::default();
//! let context = PolicyContext::new(Services::offline(&config), config);
//! let auditor = AuditorService::new(Arc::new(PolicyRegistry::with_defaults(context)));
//! let report = auditor
//!     .verify_text(r#"{"type": ["VerifiableCredential"]}"#, &[PolicyRequest::new("SignaturePolicy")])
//!     .unwrap();
//! println!("{report}");
//! ```

pub mod auditor;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod policy;
pub mod registry;
pub mod services;
pub mod time;

// Re-export primary types
pub use auditor::{AuditorService, VerificationResult};
pub use config::{AuditorConfig, EbsiConfig};
pub use credential::{Artifact, Credential, Encoding, Presentation};
pub use error::{AuditorError, Result, ServiceError, ServiceResult};
pub use policy::{
    OptionalParameterizedPolicy, ParameterizedPolicy, PolicyContext, PolicyError, PolicyKind,
    PolicyResult, SimplePolicy, VerificationPolicy,
};
pub use registry::{PolicyInfo, PolicyRegistry, PolicyRequest};
pub use services::{Services, ServicesBuilder};
