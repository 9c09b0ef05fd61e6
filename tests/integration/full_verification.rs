//! Integration test: verifying standalone credentials end to end.
//!
//! Covers:
//! 1. A signed JSON-LD credential against signature + date policies
//! 2. The same credential against a challenge it does not carry
//! 3. JWT credentials
//! 4. Revocation and schema checks through injected collaborators
//! 5. Report completeness when some policies fail

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

use vc_auditor::crypto::keys::Ed25519KeyPair;
use vc_auditor::crypto::signing::{sign_json_ld, sign_jwt};
use vc_auditor::services::InMemoryStatusService;
use vc_auditor::time::format_date;
use vc_auditor::{
    Artifact, AuditorConfig, AuditorService, PolicyContext, PolicyError, PolicyRegistry,
    PolicyRequest, Services,
};

fn issuer() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[11u8; 32])
}

fn auditor_with(services: Services, config: AuditorConfig) -> AuditorService {
    AuditorService::new(Arc::new(PolicyRegistry::with_defaults(PolicyContext::new(
        services, config,
    ))))
}

fn auditor() -> AuditorService {
    let config = AuditorConfig::default();
    auditor_with(Services::offline(&config), config)
}

fn yesterday() -> String {
    format_date(&(Utc::now() - Duration::days(1)))
}

fn signed_credential(extra: Value) -> String {
    let kp = issuer();
    let mut document: Map<String, Value> = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "id": "urn:uuid:3978344f-8596-4c3a-a978-8fcaba3903c5",
        "type": ["VerifiableCredential", "VerifiableAttestation"],
        "issuer": kp.did_key(),
        "issuanceDate": yesterday(),
        "credentialSubject": {"id": "did:key:z6MkjSubject", "givenName": "Ada"}
    })
    .as_object()
    .cloned()
    .unwrap();
    if let Value::Object(extra) = extra {
        document.extend(extra);
    }
    sign_json_ld(&kp, &mut document, None);
    Value::Object(document).to_string()
}

fn requests(ids: &[&str]) -> Vec<PolicyRequest> {
    ids.iter().map(|id| PolicyRequest::new(*id)).collect()
}

#[test]
fn signed_json_ld_credential_passes_core_policies() {
    let report = auditor()
        .verify_text(
            &signed_credential(json!({})),
            &requests(&["SignaturePolicy", "IssuedDateBeforePolicy", "ExpirationDateAfterPolicy"]),
        )
        .expect("policies should resolve");

    assert!(report.result, "report: {report}");
    assert_eq!(report.policy_results.len(), 3);
    assert!(report.policy_results.values().all(|r| r.is_success()));
}

#[test]
fn absent_challenge_never_matches() {
    let request = PolicyRequest::new("ChallengePolicy").with_argument(json!({"challenges": ["abc"]}));
    let report = auditor()
        .verify_text(&signed_credential(json!({})), &[request])
        .unwrap();
    assert!(!report.result);
    assert_eq!(
        report.get("ChallengePolicy").unwrap().to_string(),
        "failed: no challenge given"
    );
}

#[test]
fn tampered_credential_fails_signature_only() {
    let mut document: Value = serde_json::from_str(&signed_credential(json!({}))).unwrap();
    document["credentialSubject"]["givenName"] = json!("Eve");
    let report = auditor()
        .verify_text(
            &document.to_string(),
            &requests(&["SignaturePolicy", "IssuedDateBeforePolicy"]),
        )
        .unwrap();
    assert!(!report.get("SignaturePolicy").unwrap().is_success());
    assert!(report.get("IssuedDateBeforePolicy").unwrap().is_success());
    assert!(!report.result);
}

#[test]
fn jwt_credential_passes_signature_and_dates() {
    let kp = issuer();
    let now = Utc::now().timestamp();
    let token = sign_jwt(
        &kp,
        &json!({
            "iss": kp.did_key(),
            "sub": "did:key:z6MkjSubject",
            "iat": now - 3600,
            "nbf": now - 3600,
            "exp": now + 3600,
            "jti": "urn:uuid:1",
            "vc": {"type": ["VerifiableCredential", "VerifiableId"], "credentialSubject": {"familyName": "Lovelace"}}
        }),
    );

    let artifact = Artifact::parse(&token).unwrap();
    assert!(artifact.common().is_jwt());
    assert_eq!(artifact.common().subject_id.as_deref(), Some("did:key:z6MkjSubject"));

    let report = auditor()
        .verify(
            &artifact,
            &requests(&[
                "SignaturePolicy",
                "IssuedDateBeforePolicy",
                "ValidFromBeforePolicy",
                "ExpirationDateAfterPolicy",
            ]),
        )
        .unwrap();
    assert!(report.result, "report: {report}");
}

#[test]
fn expired_credential_fails_expiration_only() {
    let expired = format_date(&(Utc::now() - Duration::hours(1)));
    let report = auditor()
        .verify_text(
            &signed_credential(json!({"expirationDate": expired})),
            &requests(&["SignaturePolicy", "ExpirationDateAfterPolicy"]),
        )
        .unwrap();
    assert!(report.get("SignaturePolicy").unwrap().is_success());
    assert!(!report.get("ExpirationDateAfterPolicy").unwrap().is_success());
}

#[test]
fn revoked_credential_reports_revocation_time() {
    let config = AuditorConfig::default();
    let status = Arc::new(InMemoryStatusService::new());
    status.revoke("https://status.example/1", Some("2023-03-01T10:00:00Z".into()));
    let services = Services::builder().status_service(status).build(&config);

    let credential = signed_credential(json!({
        "credentialStatus": {"id": "https://status.example/1", "type": "SimpleCredentialStatus2022"}
    }));
    let report = auditor_with(services, config)
        .verify_text(&credential, &requests(&["SignaturePolicy", "CredentialStatusPolicy"]))
        .unwrap();

    let status_result = report.get("CredentialStatusPolicy").unwrap();
    match status_result.error() {
        Some(PolicyError::Revoked { revoked_at, .. }) => {
            assert_eq!(revoked_at.as_deref(), Some("2023-03-01T10:00:00Z"))
        }
        other => panic!("expected revocation, got {other:?}"),
    }
    assert!(report.get("SignaturePolicy").unwrap().is_success());
}

#[test]
fn schema_policy_uses_credential_schema_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attestation.json");
    std::fs::write(
        &path,
        json!({
            "type": "object",
            "required": ["credentialSubject"],
            "properties": {"credentialSubject": {"required": ["givenName", "familyName"]}}
        })
        .to_string(),
    )
    .unwrap();

    let credential = signed_credential(json!({
        "credentialSchema": {"id": path.display().to_string(), "type": "JsonSchemaValidator2018"}
    }));
    let report = auditor()
        .verify_text(&credential, &requests(&["JsonSchemaPolicy"]))
        .unwrap();
    let result = report.get("JsonSchemaPolicy").unwrap();
    assert!(!result.is_success());
    assert!(result.to_string().contains("familyName"), "{result}");
}

#[test]
fn every_requested_policy_is_reported() {
    let report = auditor()
        .verify_text(
            &signed_credential(json!({"expirationDate": "2001-01-01T00:00:00Z"})),
            &requests(&["ExpirationDateAfterPolicy", "SignaturePolicy", "CredentialStatusPolicy"]),
        )
        .unwrap();

    let ids: Vec<&str> = report.policy_results.keys().map(String::as_str).collect();
    assert_eq!(
        ids,
        ["ExpirationDateAfterPolicy", "SignaturePolicy", "CredentialStatusPolicy"]
    );
    assert!(!report.policy_results[0].is_success());
    assert!(report.policy_results[1].is_success());
    assert!(!report.policy_results[2].is_success());
    assert!(!report.result);
}

#[test]
fn configuration_errors_surface_before_running() {
    let err = auditor()
        .verify_text(
            &signed_credential(json!({})),
            &requests(&["SignaturePolicy", "ChallengePolicy"]),
        )
        .unwrap_err();
    assert!(err.to_string().contains("ChallengePolicy"));

    assert!(auditor()
        .verify_text("definitely not a credential", &requests(&["SignaturePolicy"]))
        .is_err());
}
