//! Integration test: EBSI trust chain over the HTTP collaborators.
//!
//! The DID registry, Trusted Issuer Registry and Trusted Schema Registry are
//! served by an in-memory HTTP client, so the built-in HTTP resolver,
//! registry client and schema check are exercised exactly as in production.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};

use vc_auditor::crypto::keys::Ed25519KeyPair;
use vc_auditor::crypto::signing::sign_json_ld;
use vc_auditor::services::{HttpResponse, StaticHttpClient};
use vc_auditor::{
    AuditorConfig, AuditorService, PolicyContext, PolicyRegistry, PolicyRequest, Services,
};

const ISSUER: &str = "did:ebsi:zvHWX359A3CvfJnCYaAiAde";
const DIPLOMA_SCHEMA: &str = "0x4dd3926cd92bb3cb64fa6c837539ed31fc30dd38a11266a91678efa7268cde09";
const ACCREDITATION_SCHEMA: &str = "https://schemas.example/accreditation.json";

struct Fixture {
    config: AuditorConfig,
    http: Arc<StaticHttpClient>,
}

fn tao() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[21u8; 32])
}

fn root_tao() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[22u8; 32])
}

fn issuer_key() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[23u8; 32])
}

fn sign(kp: &Ed25519KeyPair, value: Value) -> Value {
    let mut document: Map<String, Value> = value.as_object().cloned().unwrap();
    sign_json_ld(kp, &mut document, None);
    Value::Object(document)
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            config: AuditorConfig::default(),
            http: Arc::new(StaticHttpClient::new()),
        };
        fixture.serve(
            &format!("{}{ISSUER}", fixture.config.ebsi.did_registry),
            json!({"id": ISSUER, "verificationMethod": []}),
        );
        fixture.serve(
            &fixture.schema_url(),
            json!({"$schema": "http://json-schema.org/draft-07/schema#", "type": "object"}),
        );
        fixture.serve(
            &fixture.attribute_url(&tao().did_key(), "0x02"),
            json!({"did": tao().did_key(), "attribute": attribute(&root_tao_accreditation(), "RootTAO")}),
        );
        fixture
    }

    fn serve(&self, url: &str, body: Value) {
        self.http.insert(url, HttpResponse::ok(body.to_string()));
    }

    fn schema_url(&self) -> String {
        format!("{}{DIPLOMA_SCHEMA}", self.config.ebsi.trusted_schema_registry)
    }

    fn attribute_url(&self, did: &str, hash: &str) -> String {
        format!("{}/{did}/attributes/{hash}", self.config.ebsi.trusted_issuer_registry)
    }

    /// Register the issuer on the TIR with an accreditation for `schema`.
    fn register_issuer(&self, schema: &str, with_identity: bool) {
        let accreditation = attribute(&issuer_accreditation(self, schema), "TI");
        let mut attributes = vec![accreditation.clone()];
        if with_identity {
            attributes.push(attribute(
                &json!({"type": ["VerifiableCredential", "VerifiableAttestation", "VerifiableId"], "credentialSubject": {"id": ISSUER}}),
                "TI",
            ));
        }
        self.serve(
            &format!("{}/{ISSUER}", self.config.ebsi.trusted_issuer_registry),
            json!({"did": ISSUER, "attributes": attributes}),
        );
        self.serve(
            &self.attribute_url(ISSUER, "0x01"),
            json!({"did": ISSUER, "attribute": accreditation}),
        );
    }

    fn auditor(&self) -> AuditorService {
        let services = Services::builder()
            .http(self.http.clone())
            .build(&self.config);
        AuditorService::new(Arc::new(PolicyRegistry::with_defaults(PolicyContext::new(
            services,
            self.config.clone(),
        ))))
    }

    fn diploma(&self) -> String {
        sign(
            &issuer_key(),
            json!({
                "@context": ["https://www.w3.org/2018/credentials/v1"],
                "type": ["VerifiableCredential", "VerifiableAttestation", "VerifiableDiploma"],
                "issuer": ISSUER,
                "issuanceDate": "2021-08-31T00:00:00Z",
                "credentialSchema": {"id": self.schema_url(), "type": "FullJsonSchemaValidator2021"},
                "termsOfUse": {"id": self.attribute_url(ISSUER, "0x01"), "type": "VerifiableAccreditation"},
                "credentialSubject": {"id": Ed25519KeyPair::from_seed(&[24u8; 32]).did_key(), "title": "MSc"}
            }),
        )
        .to_string()
    }
}

fn attribute(credential: &Value, issuer_type: &str) -> Value {
    json!({
        "hash": "0x00",
        "body": STANDARD.encode(credential.to_string()),
        "issuerType": issuer_type
    })
}

fn issuer_accreditation(fixture: &Fixture, schema: &str) -> Value {
    sign(
        &tao(),
        json!({
            "type": ["VerifiableCredential", "VerifiableAccreditation", "VerifiableAccreditationToAttest"],
            "issuer": tao().did_key(),
            "credentialSchema": {"id": ACCREDITATION_SCHEMA, "type": "FullJsonSchemaValidator2021"},
            "termsOfUse": {"id": fixture.attribute_url(&tao().did_key(), "0x02"), "type": "VerifiableAccreditation"},
            "credentialSubject": {"id": ISSUER, "authorisationClaims": [{"authorisedSchemaId": schema}]}
        }),
    )
}

fn root_tao_accreditation() -> Value {
    sign(
        &root_tao(),
        json!({
            "type": ["VerifiableCredential", "VerifiableAccreditation"],
            "issuer": root_tao().did_key(),
            "credentialSubject": {"id": tao().did_key(), "accreditedFor": [{"schemaId": ACCREDITATION_SCHEMA}]}
        }),
    )
}

fn ebsi_requests() -> Vec<PolicyRequest> {
    [
        "EbsiTrustedIssuerDidPolicy",
        "EbsiTrustedSubjectDidPolicy",
        "EbsiTrustedSchemaRegistryPolicy",
        "EbsiTrustedIssuerAccreditationPolicy",
        "EbsiTrustedIssuerRegistryPolicy",
    ]
    .iter()
    .map(|id| PolicyRequest::new(*id))
    .collect()
}

#[test]
fn accredited_issuer_passes_whole_chain() {
    let fixture = Fixture::new();
    let schema = fixture.schema_url();
    fixture.register_issuer(&schema, true);

    let report = fixture
        .auditor()
        .verify_text(&fixture.diploma(), &ebsi_requests())
        .unwrap();
    assert!(report.result, "report:\n{report}");
}

#[test]
fn accreditation_for_other_schema_fails_registry_policy() {
    let fixture = Fixture::new();
    fixture.register_issuer("https://schemas.example/some-other-schema", true);

    let report = fixture
        .auditor()
        .verify_text(&fixture.diploma(), &ebsi_requests())
        .unwrap();
    assert_eq!(
        report.get("EbsiTrustedIssuerRegistryPolicy").unwrap().to_string(),
        "failed: no authorization claims matching the credential schema"
    );
    assert!(!report.get("EbsiTrustedIssuerAccreditationPolicy").unwrap().is_success());
    assert!(report.get("EbsiTrustedIssuerDidPolicy").unwrap().is_success());
    assert!(!report.result);
}

#[test]
fn unregistered_issuer_has_no_tir_record() {
    let fixture = Fixture::new();
    let report = fixture
        .auditor()
        .verify_text(
            &fixture.diploma(),
            &[PolicyRequest::new("EbsiTrustedIssuerRegistryPolicy")],
        )
        .unwrap();
    let result = report.get("EbsiTrustedIssuerRegistryPolicy").unwrap();
    assert!(result.to_string().contains("no record on TIR"), "{result}");
}

#[test]
fn issuer_without_verifiable_id_is_rejected() {
    let fixture = Fixture::new();
    let schema = fixture.schema_url();
    fixture.register_issuer(&schema, false);
    let report = fixture
        .auditor()
        .verify_text(
            &fixture.diploma(),
            &[PolicyRequest::new("EbsiTrustedIssuerRegistryPolicy")],
        )
        .unwrap();
    assert!(!report.result);
    assert!(report.to_string().contains("VerifiableId"));
}

#[test]
fn registry_policy_argument_overrides_issuer_type() {
    let fixture = Fixture::new();
    let schema = fixture.schema_url();
    fixture.register_issuer(&schema, true);

    let expect_tao = PolicyRequest::new("EbsiTrustedIssuerRegistryPolicy").with_argument(json!({
        "registryAddress": fixture.config.ebsi.trusted_issuer_registry,
        "issuerType": "TAO"
    }));
    let report = fixture
        .auditor()
        .verify_text(&fixture.diploma(), &[expect_tao])
        .unwrap();
    assert!(!report.result);
}

#[test]
fn unknown_issuer_did_fails_did_policy() {
    let fixture = Fixture::new();
    let mut diploma: Value = serde_json::from_str(&fixture.diploma()).unwrap();
    diploma["issuer"] = json!("did:ebsi:zUnknownIssuer");

    let report = fixture
        .auditor()
        .verify_text(
            &diploma.to_string(),
            &[PolicyRequest::new("EbsiTrustedIssuerDidPolicy")],
        )
        .unwrap();
    assert_eq!(
        report.get("EbsiTrustedIssuerDidPolicy").unwrap().to_string(),
        "failed: Identifier Not Found"
    );
}

#[test]
fn schema_outside_registry_is_rejected() {
    let fixture = Fixture::new();
    let mut diploma: Value = serde_json::from_str(&fixture.diploma()).unwrap();
    diploma["credentialSchema"]["id"] = json!("https://example.com/schemas/diploma.json");

    let report = fixture
        .auditor()
        .verify_text(
            &diploma.to_string(),
            &[PolicyRequest::new("EbsiTrustedSchemaRegistryPolicy")],
        )
        .unwrap();
    assert_eq!(
        report.to_string(),
        "EbsiTrustedSchemaRegistryPolicy: failed: No valid EBSI Trusted Schema Registry URL\nVerified: false"
    );
}

#[test]
fn diploma_signed_outside_issuer_did_fails_signature() {
    let fixture = Fixture::new();
    fixture.register_issuer(&fixture.schema_url(), true);

    let mut requests = ebsi_requests();
    requests.insert(0, PolicyRequest::new("SignaturePolicy"));
    let report = fixture
        .auditor()
        .verify_text(&fixture.diploma(), &requests)
        .unwrap();

    // the chain itself holds; only the proof key is foreign to the issuer
    assert!(report.get("EbsiTrustedIssuerRegistryPolicy").unwrap().is_success());
    let signature = report.get("SignaturePolicy").unwrap();
    assert!(signature.to_string().contains("not controlled by"), "{signature}");
    assert!(!report.result);
}
