//! Collaborator contracts and built-in implementations.
//!
//! Policies never reach for globals: every collaborator arrives through a
//! [`Services`] bundle handed to the registry at construction time.

pub mod descriptor;
pub mod did;
pub mod http;
pub mod schema;
pub mod signature;
pub mod status;
pub mod tir;

use std::sync::Arc;

pub use descriptor::{DefaultDescriptorMatcher, DescriptorMatcher, InputDescriptor, PresentationDefinition};
pub use did::{ChainedDidResolver, DidDocument, DidKeyResolver, DidResolver, HttpDidResolver, StaticDidResolver};
pub use http::{HttpClient, HttpResponse, OfflineHttpClient, StaticHttpClient};
#[cfg(feature = "http")]
pub use http::ReqwestHttpClient;
pub use schema::{JsonSchemaValidatorFactory, SchemaValidator, Validator};
pub use signature::{Ed25519SignatureVerifier, SignatureVerifier, VerificationOutcome};
pub use status::{CredentialStatusService, HttpCredentialStatusService, InMemoryStatusService, RevocationStatus};
pub use tir::{HttpTrustedIssuerRegistryClient, InMemoryTirClient, TirAttribute, TirRecord, TrustedIssuerRegistryClient};

use crate::config::AuditorConfig;
#[cfg(feature = "http")]
use crate::error::ServiceResult;
use crate::time::{Clock, SystemClock};

/// Every collaborator a policy may call.
#[derive(Clone)]
pub struct Services {
    pub signature_verifier: Arc<dyn SignatureVerifier>,
    pub did_resolver: Arc<dyn DidResolver>,
    pub status_service: Arc<dyn CredentialStatusService>,
    pub schema_validator: Arc<dyn SchemaValidator>,
    pub tir_client: Arc<dyn TrustedIssuerRegistryClient>,
    pub http: Arc<dyn HttpClient>,
    pub descriptor_matcher: Arc<dyn DescriptorMatcher>,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    pub fn builder() -> ServicesBuilder {
        ServicesBuilder::default()
    }

    /// Built-in collaborators without network access (`did:key` only).
    pub fn offline(config: &AuditorConfig) -> Self {
        Self::builder().build(config)
    }

    /// Built-in collaborators over the `reqwest` HTTP client.
    #[cfg(feature = "http")]
    pub fn online(config: &AuditorConfig) -> ServiceResult<Self> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(config.http_timeout())?);
        Ok(Self::builder().http(http).build(config))
    }
}

/// Builder for [`Services`]. Anything not set falls back to a built-in
/// implementation wired to the chosen HTTP client.
#[derive(Default)]
pub struct ServicesBuilder {
    signature_verifier: Option<Arc<dyn SignatureVerifier>>,
    did_resolver: Option<Arc<dyn DidResolver>>,
    status_service: Option<Arc<dyn CredentialStatusService>>,
    schema_validator: Option<Arc<dyn SchemaValidator>>,
    tir_client: Option<Arc<dyn TrustedIssuerRegistryClient>>,
    http: Option<Arc<dyn HttpClient>>,
    descriptor_matcher: Option<Arc<dyn DescriptorMatcher>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ServicesBuilder {
    pub fn signature_verifier(mut self, v: Arc<dyn SignatureVerifier>) -> Self {
        self.signature_verifier = Some(v);
        self
    }

    pub fn did_resolver(mut self, v: Arc<dyn DidResolver>) -> Self {
        self.did_resolver = Some(v);
        self
    }

    pub fn status_service(mut self, v: Arc<dyn CredentialStatusService>) -> Self {
        self.status_service = Some(v);
        self
    }

    pub fn schema_validator(mut self, v: Arc<dyn SchemaValidator>) -> Self {
        self.schema_validator = Some(v);
        self
    }

    pub fn tir_client(mut self, v: Arc<dyn TrustedIssuerRegistryClient>) -> Self {
        self.tir_client = Some(v);
        self
    }

    pub fn http(mut self, v: Arc<dyn HttpClient>) -> Self {
        self.http = Some(v);
        self
    }

    pub fn descriptor_matcher(mut self, v: Arc<dyn DescriptorMatcher>) -> Self {
        self.descriptor_matcher = Some(v);
        self
    }

    pub fn clock(mut self, v: Arc<dyn Clock>) -> Self {
        self.clock = Some(v);
        self
    }

    pub fn build(self, config: &AuditorConfig) -> Services {
        let http = self.http.unwrap_or_else(|| Arc::new(OfflineHttpClient));
        let did_resolver = self.did_resolver.unwrap_or_else(|| {
            Arc::new(
                ChainedDidResolver::new()
                    .with(Arc::new(DidKeyResolver))
                    .with(Arc::new(HttpDidResolver::new(
                        Arc::clone(&http),
                        config.ebsi.did_registry.clone(),
                        config.ebsi.did_method.clone(),
                    ))),
            )
        });
        Services {
            signature_verifier: self.signature_verifier.unwrap_or_else(|| {
                Arc::new(Ed25519SignatureVerifier::new(Arc::clone(&did_resolver)))
            }),
            status_service: self
                .status_service
                .unwrap_or_else(|| {
                    Arc::new(
                        HttpCredentialStatusService::new(Arc::clone(&http))
                            .with_max_list_bytes(config.max_status_list_bytes),
                    )
                }),
            schema_validator: self
                .schema_validator
                .unwrap_or_else(|| Arc::new(JsonSchemaValidatorFactory::new(Arc::clone(&http)))),
            tir_client: self
                .tir_client
                .unwrap_or_else(|| Arc::new(HttpTrustedIssuerRegistryClient::new(Arc::clone(&http)))),
            descriptor_matcher: self
                .descriptor_matcher
                .unwrap_or_else(|| Arc::new(DefaultDescriptorMatcher)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            did_resolver,
            http,
        }
    }
}
