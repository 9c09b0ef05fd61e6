//! Auditor configuration.
//!
//! Loaded from a JSON file; every field has a default, so `{}` is a valid
//! configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuditorError, Result};

/// EBSI trust-framework endpoints and expectations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EbsiConfig {
    /// Prefix every trusted credential schema URL must start with.
    pub trusted_schema_registry: String,
    /// Base URL of the Trusted Issuer Registry `issuers` collection.
    pub trusted_issuer_registry: String,
    /// Base URL of the DID registry `identifiers` collection.
    pub did_registry: String,
    /// DID method issuers must use.
    pub did_method: String,
    /// Issuer type expected on TIR accreditations when a policy argument omits it.
    pub default_issuer_type: String,
}

impl Default for EbsiConfig {
    fn default() -> Self {
        Self {
            trusted_schema_registry:
                "https://api-pilot.ebsi.eu/trusted-schemas-registry/v2/schemas/".into(),
            trusted_issuer_registry: "https://api-pilot.ebsi.eu/trusted-issuers-registry/v4/issuers"
                .into(),
            did_registry: "https://api-pilot.ebsi.eu/did-registry/v5/identifiers/".into(),
            did_method: "ebsi".into(),
            default_issuer_type: "TI".into(),
        }
    }
}

/// 16 MiB, far above the 16 KiB minimum list size.
pub const DEFAULT_MAX_STATUS_LIST_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditorConfig {
    /// Deadline for one policy run.
    pub policy_timeout_ms: u64,
    /// Run the requested policies concurrently.
    pub parallel: bool,
    /// Also run each policy on the credentials embedded in a presentation.
    pub verify_embedded_credentials: bool,
    /// Request timeout of the built-in HTTP client.
    pub http_timeout_secs: u64,
    /// Largest decompressed StatusList2021 bitstring accepted.
    pub max_status_list_bytes: usize,
    pub ebsi: EbsiConfig,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            policy_timeout_ms: 30_000,
            parallel: false,
            verify_embedded_credentials: true,
            http_timeout_secs: 30,
            max_status_list_bytes: DEFAULT_MAX_STATUS_LIST_BYTES,
            ebsi: EbsiConfig::default(),
        }
    }
}

impl AuditorConfig {
    /// Read and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| AuditorError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.policy_timeout_ms == 0 {
            return Err(AuditorError::Config(
                "policy_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.max_status_list_bytes == 0 {
            return Err(AuditorError::Config(
                "max_status_list_bytes must be greater than zero".into(),
            ));
        }
        if self.ebsi.did_method.is_empty() {
            return Err(AuditorError::Config("ebsi.did_method must not be empty".into()));
        }
        for (name, url) in [
            ("ebsi.trusted_schema_registry", &self.ebsi.trusted_schema_registry),
            ("ebsi.trusted_issuer_registry", &self.ebsi.trusted_issuer_registry),
            ("ebsi.did_registry", &self.ebsi.did_registry),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(AuditorError::Config(format!("{name} must be an http(s) URL")));
            }
        }
        Ok(())
    }

    pub fn policy_timeout(&self) -> Duration {
        Duration::from_millis(self.policy_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
