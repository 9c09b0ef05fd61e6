//! Integration test: verifiable presentations.
//!
//! A holder wraps issuer-signed credentials in a presentation bound to a
//! verifier challenge. Policies run on the presentation and, unless they
//! only concern the presentation itself, on every embedded credential.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use vc_auditor::crypto::keys::Ed25519KeyPair;
use vc_auditor::crypto::signing::{sign_json_ld, sign_jwt};
use vc_auditor::{
    Artifact, AuditorConfig, AuditorService, PolicyContext, PolicyRegistry, PolicyRequest,
    Services,
};

fn issuer() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[31u8; 32])
}

fn holder() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[32u8; 32])
}

fn auditor() -> AuditorService {
    let config = AuditorConfig::default();
    AuditorService::new(Arc::new(PolicyRegistry::with_defaults(PolicyContext::new(
        Services::offline(&config),
        config,
    ))))
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn credential(kind: &str, schema: &str) -> Value {
    let kp = issuer();
    let mut document = object(json!({
        "type": ["VerifiableCredential", kind],
        "issuer": kp.did_key(),
        "issuanceDate": "2021-01-01T00:00:00Z",
        "credentialSchema": {"id": schema, "type": "FullJsonSchemaValidator2021"},
        "credentialSubject": {"id": holder().did_key()}
    }));
    sign_json_ld(&kp, &mut document, None);
    Value::Object(document)
}

fn presentation(credentials: Vec<Value>, challenge: &str) -> String {
    let kp = holder();
    let mut document = object(json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiablePresentation"],
        "holder": kp.did_key(),
        "verifiableCredential": credentials
    }));
    sign_json_ld(&kp, &mut document, Some(challenge));
    Value::Object(document).to_string()
}

fn challenge(values: &[&str]) -> PolicyRequest {
    PolicyRequest::new("ChallengePolicy").with_argument(json!({
        "challenges": values,
        "applyToVC": false
    }))
}

fn definition() -> PolicyRequest {
    PolicyRequest::new("PresentationDefinitionPolicy").with_argument(json!({
        "id": "diploma-and-id",
        "input_descriptors": [
            {"id": "diploma", "schema": {"uri": "https://schemas.example/diploma.json"}},
            {"id": "id", "constraints": {"fields": [{"path": ["$.type"], "filter": {"const": "VerifiableId"}}]}}
        ]
    }))
}

#[test]
fn json_ld_presentation_passes() {
    let vp = presentation(
        vec![
            credential("VerifiableDiploma", "https://schemas.example/diploma.json"),
            credential("VerifiableId", "https://schemas.example/id.json"),
        ],
        "nonce-1234",
    );

    let artifact = Artifact::parse(&vp).unwrap();
    let presentation = artifact.as_presentation().unwrap();
    assert_eq!(presentation.verifiable_credential.len(), 2);
    assert_eq!(presentation.holder(), Some(holder().did_key().as_str()));

    let report = auditor()
        .verify(
            &artifact,
            &[
                PolicyRequest::new("SignaturePolicy"),
                challenge(&["nonce-1234"]),
                definition(),
                PolicyRequest::new("IssuedDateBeforePolicy"),
            ],
        )
        .unwrap();
    assert!(report.result, "report:\n{report}");
}

#[test]
fn wrong_challenge_fails() {
    let vp = presentation(
        vec![credential("VerifiableId", "https://schemas.example/id.json")],
        "replayed",
    );
    let report = auditor().verify_text(&vp, &[challenge(&["fresh"])]).unwrap();
    assert!(!report.result);
}

#[test]
fn missing_descriptor_fails_definition() {
    let vp = presentation(
        vec![credential("VerifiableId", "https://schemas.example/id.json")],
        "nonce",
    );
    let report = auditor().verify_text(&vp, &[definition()]).unwrap();
    let result = report.get("PresentationDefinitionPolicy").unwrap();
    assert!(!result.is_success());
    assert!(result.to_string().contains("diploma"), "{result}");
}

#[test]
fn tampered_embedded_credential_fails_signature() {
    let mut tampered = credential("VerifiableId", "https://schemas.example/id.json");
    tampered["credentialSubject"]["id"] = json!("did:key:z6MkImpostor");
    let vp = presentation(vec![tampered], "nonce");

    let report = auditor()
        .verify_text(&vp, &[PolicyRequest::new("SignaturePolicy")])
        .unwrap();
    assert!(!report.result);
}

#[test]
fn jwt_presentation_with_jwt_credentials() {
    let iss = issuer();
    let vc = sign_jwt(
        &iss,
        &json!({
            "iss": iss.did_key(),
            "sub": holder().did_key(),
            "iat": 1_600_000_000,
            "vc": {"type": ["VerifiableCredential", "VerifiableId"], "credentialSubject": {}}
        }),
    );
    let hk = holder();
    let vp = sign_jwt(
        &hk,
        &json!({
            "iss": hk.did_key(),
            "nonce": "jwt-nonce",
            "vp": {"type": ["VerifiablePresentation"], "verifiableCredential": [vc]}
        }),
    );

    let artifact = Artifact::parse(&vp).unwrap();
    assert!(artifact.is_presentation());
    assert_eq!(artifact.common().challenge.as_deref(), Some("jwt-nonce"));

    let report = auditor()
        .verify(
            &artifact,
            &[
                PolicyRequest::new("SignaturePolicy"),
                challenge(&["jwt-nonce"]),
                PolicyRequest::new("IssuedDateBeforePolicy"),
            ],
        )
        .unwrap();
    assert!(report.result, "report:\n{report}");
}

#[test]
fn definition_rejects_bare_credential() {
    let vc = credential("VerifiableId", "https://schemas.example/id.json").to_string();
    let report = auditor().verify_text(&vc, &[definition()]).unwrap();
    assert!(!report.result);
}
