//! Stress tests: collaborators that hang or fail.
//!
//! A policy blocked on a slow collaborator must time out without holding
//! back the policies that run alongside it.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;

use vc_auditor::error::ServiceResult;
use vc_auditor::services::{HttpClient, HttpResponse};
use vc_auditor::{
    AuditorConfig, AuditorService, PolicyContext, PolicyError, PolicyRegistry, PolicyRequest,
    Services,
};

/// Answers every GET after `delay`.
struct SlowHttp {
    delay: Duration,
}

impl HttpClient for SlowHttp {
    fn get(&self, url: &str) -> ServiceResult<HttpResponse> {
        thread::sleep(self.delay);
        Ok(HttpResponse::ok(json!({"id": url, "verificationMethod": []}).to_string()))
    }
}

fn auditor(delay: Duration, timeout_ms: u64, parallel: bool) -> AuditorService {
    let config = AuditorConfig {
        policy_timeout_ms: timeout_ms,
        parallel,
        ..AuditorConfig::default()
    };
    let services = Services::builder()
        .http(Arc::new(SlowHttp { delay }))
        .build(&config);
    AuditorService::new(Arc::new(PolicyRegistry::with_defaults(PolicyContext::new(
        services, config,
    ))))
}

fn ebsi_credential() -> String {
    json!({
        "type": ["VerifiableCredential", "VerifiableAttestation"],
        "issuer": "did:ebsi:zslowissuer",
        "issuanceDate": "2020-01-01T00:00:00Z",
        "credentialSubject": {"id": "did:ebsi:zslowsubject"}
    })
    .to_string()
}

#[test]
fn stress_hanging_resolver_times_out() {
    let auditor = auditor(Duration::from_secs(3), 100, false);
    let start = Instant::now();
    let report = auditor
        .verify_text(
            &ebsi_credential(),
            &[
                PolicyRequest::new("EbsiTrustedIssuerDidPolicy"),
                PolicyRequest::new("IssuedDateBeforePolicy"),
            ],
        )
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(matches!(
        report.get("EbsiTrustedIssuerDidPolicy").unwrap().error(),
        Some(PolicyError::Timeout { millis: 100 })
    ));
    assert!(report.get("IssuedDateBeforePolicy").unwrap().is_success());
    assert!(!report.result);
}

#[test]
fn stress_parallel_timeouts_do_not_add_up() {
    let auditor = auditor(Duration::from_secs(3), 200, true);
    let requests: Vec<PolicyRequest> = (0..10)
        .map(|_| PolicyRequest::new("EbsiTrustedIssuerDidPolicy"))
        .collect();

    let start = Instant::now();
    let report = auditor.verify_text(&ebsi_credential(), &requests).unwrap();

    // ten hung policies in parallel cost about one timeout, not ten
    assert!(start.elapsed() < Duration::from_millis(1500));
    assert_eq!(report.policy_results.len(), 10);
    assert!(report
        .policy_results
        .values()
        .all(|r| matches!(r.error(), Some(PolicyError::Timeout { .. }))));
}

#[test]
fn stress_slow_but_in_time_collaborator_passes() {
    let auditor = auditor(Duration::from_millis(20), 2_000, true);
    for _ in 0..20 {
        let report = auditor
            .verify_text(
                &ebsi_credential(),
                &[
                    PolicyRequest::new("EbsiTrustedIssuerDidPolicy"),
                    PolicyRequest::new("EbsiTrustedSubjectDidPolicy"),
                ],
            )
            .unwrap();
        assert!(report.result, "report:\n{report}");
    }
}
