//! Integration tests for the CLI binary.
//!
//! Runs the `vca` binary against credential files written to a temp dir.
//!
//! This test is registered as a [[test]] in the vc-auditor-cli crate
//! so that CARGO_BIN_EXE_vca is available.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Map, Value};
use vc_auditor::crypto::keys::Ed25519KeyPair;
use vc_auditor::crypto::signing::sign_json_ld;

/// Get a Command pointing to the `vca` binary.
fn vca_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_vca"))
}

fn run(args: &[&str]) -> Output {
    vca_binary()
        .args(args)
        .output()
        .expect("failed to execute vca")
}

fn write_credential(dir: &Path, tamper: bool) -> PathBuf {
    let kp = Ed25519KeyPair::from_seed(&[41u8; 32]);
    let mut document: Map<String, Value> = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiableCredential", "VerifiableId"],
        "issuer": kp.did_key(),
        "issuanceDate": "2021-01-01T00:00:00Z",
        "credentialSubject": {"id": "did:key:z6MkSubject", "familyName": "Hopper"}
    })
    .as_object()
    .cloned()
    .unwrap();
    sign_json_ld(&kp, &mut document, None);
    if tamper {
        document.insert("issuanceDate".into(), json!("2020-01-01T00:00:00Z"));
    }

    let path = dir.join(if tamper { "tampered.json" } else { "vc.json" });
    std::fs::write(&path, Value::Object(document).to_string()).unwrap();
    path
}

#[test]
fn cli_responds_to_help() {
    let output = run(&["--help"]);
    assert!(
        output.status.success(),
        "vca --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "got: {stdout}");
    assert!(stdout.contains("verify"), "got: {stdout}");
}

#[test]
fn cli_responds_to_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0.3"), "got: {stdout}");
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = run(&["--nonexistent-flag"]);
    assert!(!output.status.success());
}

#[test]
fn policies_lists_defaults() {
    let output = run(&["policies"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("SignaturePolicy"));
    assert!(stdout.contains("(default)"));
    assert!(stdout.contains("EbsiTrustedIssuerRegistryPolicy"));
}

#[test]
fn policies_as_json() {
    let output = run(&["policies", "--json"]);
    assert!(output.status.success());
    let listed: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(listed
        .iter()
        .any(|p| p["id"] == "ChallengePolicy" && p["kind"] == "parameterized"));
}

#[test]
fn verify_signed_credential_offline() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_credential(dir.path(), false);

    let output = run(&[
        "verify",
        file.to_str().unwrap(),
        "--offline",
        "-p",
        "SignaturePolicy",
        "-p",
        "IssuedDateBeforePolicy",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stdout: {stdout}\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("SignaturePolicy: passed"));
    assert!(stdout.contains("Verified: true"));
}

#[test]
fn verify_tampered_credential_fails() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_credential(dir.path(), true);

    let output = run(&["verify", file.to_str().unwrap(), "--offline"]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Verified: false"), "got: {stdout}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("verification failed"));
}

#[test]
fn verify_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_credential(dir.path(), false);

    let output = run(&[
        "verify",
        file.to_str().unwrap(),
        "--offline",
        "--json",
        "-p",
        r#"ChallengePolicy={"challenges":["x"],"applyToVC":false}"#,
    ]);
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["result"], true);
    assert!(report["policyResults"]["ChallengePolicy"].is_object());
}

#[test]
fn verify_unknown_policy_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_credential(dir.path(), false);

    let output = run(&["verify", file.to_str().unwrap(), "--offline", "-p", "NoSuchPolicy"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown verification policy"), "got: {stderr}");
}

#[test]
fn verify_missing_file_is_an_error() {
    let output = run(&["verify", "/nonexistent/credential.json", "--offline"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}
