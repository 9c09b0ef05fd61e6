//! Trust Chain — run the EBSI trust-chain policies against a canned registry.
//!
//! Run with:
//!   cargo run --example trust_chain -p vc-auditor

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

const ISSUER: &str = "did:ebsi:zdemoIssuer";

fn signed(kp: &Ed25519KeyPair, value: Value) -> Value {
    let mut document: Map<String, Value> = value.as_object().cloned().unwrap_or_default();
    sign_json_ld(kp, &mut document, None);
    Value::Object(document)
}

fn attribute(credential: &Value) -> Value {
    json!({"hash": "0x01", "body": STANDARD.encode(credential.to_string()), "issuerType": "TI"})
}

fn main() {
    let config = AuditorConfig::default();
    let ebsi = &config.ebsi;
    let schema = format!("{}0xdemo", ebsi.trusted_schema_registry);
    let accreditation_url = format!("{}/{ISSUER}/attributes/0x01", ebsi.trusted_issuer_registry);

    // ── 1. Accreditations: root TAO -> TAO -> issuer ──────────────────────
    //
    // Both accreditors are did:key, so their signatures verify offline.
    let root = Ed25519KeyPair::from_seed(&[4u8; 32]);
    let tao = Ed25519KeyPair::from_seed(&[2u8; 32]);
    let accreditation_schema = "https://schemas.example/accreditation.json";
    let tao_url = format!("{}/{}/attributes/0x02", ebsi.trusted_issuer_registry, tao.did_key());
    let root_accreditation = signed(
        &root,
        json!({
            "type": ["VerifiableCredential", "VerifiableAccreditation"],
            "issuer": root.did_key(),
            "credentialSubject": {"id": tao.did_key(), "accreditedFor": [{"schemaId": accreditation_schema}]}
        }),
    );
    let accreditation = signed(
        &tao,
        json!({
            "type": ["VerifiableCredential", "VerifiableAccreditation"],
            "issuer": tao.did_key(),
            "credentialSchema": {"id": accreditation_schema, "type": "FullJsonSchemaValidator2021"},
            "termsOfUse": {"id": tao_url, "type": "VerifiableAccreditation"},
            "credentialSubject": {"id": ISSUER, "authorisationClaims": [{"authorisedSchemaId": schema}]}
        }),
    );
    let identity = json!({
        "type": ["VerifiableCredential", "VerifiableId"],
        "credentialSubject": {"id": ISSUER}
    });

    // ── 2. Canned registries ────────────────────────────────────────────────
    let http = StaticHttpClient::new()
        .with(
            format!("{}{ISSUER}", ebsi.did_registry),
            HttpResponse::ok(json!({"id": ISSUER}).to_string()),
        )
        .with(schema.clone(), HttpResponse::ok(r#"{"type":"object"}"#))
        .with(
            format!("{}/{ISSUER}", ebsi.trusted_issuer_registry),
            HttpResponse::ok(
                json!({"did": ISSUER, "attributes": [attribute(&accreditation), attribute(&identity)]})
                    .to_string(),
            ),
        )
        .with(
            accreditation_url.clone(),
            HttpResponse::ok(attribute(&accreditation).to_string()),
        )
        .with(tao_url, HttpResponse::ok(attribute(&root_accreditation).to_string()));
    let services = Services::builder().http(Arc::new(http)).build(&config);
    let auditor = AuditorService::new(Arc::new(PolicyRegistry::with_defaults(
        PolicyContext::new(services, config.clone()),
    )));

    // ── 3. Audit a diploma ──────────────────────────────────────────────────
    let diploma = signed(
        &Ed25519KeyPair::from_seed(&[3u8; 32]),
        json!({
            "type": ["VerifiableCredential", "VerifiableAttestation", "VerifiableDiploma"],
            "issuer": ISSUER,
            "issuanceDate": "2021-08-31T00:00:00Z",
            "credentialSchema": {"id": schema, "type": "FullJsonSchemaValidator2021"},
            "termsOfUse": {"id": accreditation_url, "type": "VerifiableAccreditation"},
            "credentialSubject": {"id": "did:key:z6MkStudent"}
        }),
    );
    let requests: Vec<PolicyRequest> = [
        "EbsiTrustedIssuerDidPolicy",
        "EbsiTrustedSchemaRegistryPolicy",
        "EbsiTrustedIssuerAccreditationPolicy",
        "EbsiTrustedIssuerRegistryPolicy",
    ]
    .iter()
    .map(|id| PolicyRequest::new(*id))
    .collect();

    match auditor.verify_text(&diploma.to_string(), &requests) {
        Ok(report) => println!("{report}"),
        Err(e) => eprintln!("error: {e}"),
    }
}
