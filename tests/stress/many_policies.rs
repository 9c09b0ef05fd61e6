//! Stress tests: many artifacts, many policies, many threads.

use std::sync::Arc;
use std::thread;

use serde_json::{json, Map, Value};

use vc_auditor::crypto::keys::Ed25519KeyPair;
use vc_auditor::crypto::signing::sign_json_ld;
use vc_auditor::{
    AuditorConfig, AuditorService, PolicyContext, PolicyRegistry, PolicyRequest, Services,
};

fn auditor(parallel: bool) -> AuditorService {
    let config = AuditorConfig {
        parallel,
        ..AuditorConfig::default()
    };
    AuditorService::new(Arc::new(PolicyRegistry::with_defaults(PolicyContext::new(
        Services::offline(&config),
        config,
    ))))
}

fn credential(n: u8) -> String {
    let kp = Ed25519KeyPair::from_seed(&[n; 32]);
    let mut document: Map<String, Value> = json!({
        "type": ["VerifiableCredential", "VerifiableAttestation"],
        "id": format!("urn:uuid:{n}"),
        "issuer": kp.did_key(),
        "issuanceDate": "2020-06-01T00:00:00Z",
        "expirationDate": if n % 5 == 0 { "2001-01-01T00:00:00Z" } else { "2999-01-01T00:00:00Z" },
        "credentialSubject": {"id": format!("did:key:subject-{n}")}
    })
    .as_object()
    .cloned()
    .unwrap();
    sign_json_ld(&kp, &mut document, None);
    Value::Object(document).to_string()
}

fn requests() -> Vec<PolicyRequest> {
    let mut requests: Vec<PolicyRequest> = [
        "SignaturePolicy",
        "IssuedDateBeforePolicy",
        "ValidFromBeforePolicy",
        "ExpirationDateAfterPolicy",
    ]
    .iter()
    .map(|id| PolicyRequest::new(*id))
    .collect();
    // repeat the same policy to exercise duplicate keys
    requests.extend((0..8).map(|_| PolicyRequest::new("SignaturePolicy")));
    requests
}

#[test]
fn stress_hundred_credentials_sequential() {
    let auditor = auditor(false);
    let requests = requests();
    for n in 1..=100u8 {
        let report = auditor.verify_text(&credential(n), &requests).unwrap();
        assert_eq!(report.policy_results.len(), requests.len());
        assert!(report.get("SignaturePolicy#9").unwrap().is_success());
        // validFrom falls back to issuanceDate
        assert!(report.get("ValidFromBeforePolicy").unwrap().is_success());
        assert_eq!(
            report.get("ExpirationDateAfterPolicy").unwrap().is_success(),
            n % 5 != 0,
            "credential {n}"
        );
    }
}

#[test]
fn stress_shared_auditor_across_threads() {
    let auditor = Arc::new(auditor(true));
    let handles: Vec<_> = (0..8u8)
        .map(|t| {
            let auditor = Arc::clone(&auditor);
            thread::spawn(move || {
                let requests = requests();
                let mut expired = 0;
                for i in 0..10u8 {
                    let n = t * 10 + i + 1;
                    let report = auditor.verify_text(&credential(n), &requests).unwrap();
                    let keys: Vec<&String> = report.policy_results.keys().collect();
                    assert_eq!(keys[0], "SignaturePolicy");
                    assert_eq!(keys[4], "SignaturePolicy#2");
                    if !report.get("ExpirationDateAfterPolicy").unwrap().is_success() {
                        expired += 1;
                    }
                }
                expired
            })
        })
        .collect();

    let expired: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(expired, 16);
}
