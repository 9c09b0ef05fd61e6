//! Verify Credential — sign a credential with a did:key, then audit it.
//!
//! Run with:
//!   cargo run --example verify_credential -p vc-auditor

use std::sync::Arc;

use serde_json::{json, Map, Value};
use vc_auditor::crypto::keys::Ed25519KeyPair;
use vc_auditor::crypto::signing::sign_json_ld;
use vc_auditor::{
    AuditorConfig, AuditorService, PolicyContext, PolicyRegistry, PolicyRequest, Services,
};

fn main() {
    // ── 1. Issue a credential ───────────────────────────────────────────────
    //
    // The issuer is a did:key, so the offline resolver can verify it.
    let issuer = Ed25519KeyPair::from_seed(&[1u8; 32]);
    let mut document: Map<String, Value> = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiableCredential", "VerifiableId"],
        "issuer": issuer.did_key(),
        "issuanceDate": "2021-01-01T00:00:00Z",
        "expirationDate": "2099-01-01T00:00:00Z",
        "credentialSubject": {"id": "did:key:z6MkHolder", "familyName": "Lovelace"}
    })
    .as_object()
    .cloned()
    .expect("literal is an object");
    sign_json_ld(&issuer, &mut document, None);
    let credential = Value::Object(document).to_string();
    println!("Issued by {}", issuer.did_key());
    println!();

    // ── 2. Set up the auditor ───────────────────────────────────────────────
    let config = AuditorConfig::default();
    let registry = PolicyRegistry::with_defaults(PolicyContext::new(
        Services::offline(&config),
        config,
    ));
    println!("{} policies registered", registry.list_policies().len());
    let auditor = AuditorService::new(Arc::new(registry));

    // ── 3. Audit ────────────────────────────────────────────────────────────
    let requests = [
        PolicyRequest::new("SignaturePolicy"),
        PolicyRequest::new("IssuedDateBeforePolicy"),
        PolicyRequest::new("ExpirationDateAfterPolicy"),
        "ChallengePolicy={\"challenges\":[\"abc\"]}"
            .parse()
            .expect("valid request"),
    ];
    let report = auditor
        .verify_text(&credential, &requests)
        .expect("policies resolve");
    println!("{report}");
    println!();

    // The credential carries no challenge, so the overall verdict is false.
    assert!(!report.result);
    assert!(report.get("SignaturePolicy").is_some_and(|r| r.is_success()));
}
