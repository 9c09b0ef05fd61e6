//! The auditor: runs the requested policies against one artifact.
//!
//! 1. Policies are resolved up front; an unknown id or a bad argument
//!    aborts before anything runs.
//! 2. Every policy runs, failures included, each under its own deadline.
//! 3. For presentations, a policy is also run on each embedded credential
//!    and the entry holds the AND of all those runs.
//! 4. Results are reported in request order; the verdict is the AND of all entries.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::AuditorConfig;
use crate::credential::Artifact;
use crate::error::Result;
use crate::policy::{PolicyError, PolicyResult, VerificationPolicy};
use crate::registry::{PolicyRegistry, PolicyRequest};

/// Aggregated report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Overall verdict.
    pub result: bool,
    /// One entry per requested policy, in request order.
    pub policy_results: IndexMap<String, PolicyResult>,
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        self.result
    }

    pub fn get(&self, policy_id: &str) -> Option<&PolicyResult> {
        self.policy_results.get(policy_id)
    }
}

impl std::fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (id, result) in &self.policy_results {
            writeln!(f, "{id}: {result}")?;
        }
        write!(f, "Verified: {}", self.result)
    }
}

/// A policy run in flight.
struct Pending {
    id: String,
    receiver: mpsc::Receiver<PolicyResult>,
    deadline: Instant,
}

pub struct AuditorService {
    registry: Arc<PolicyRegistry>,
    config: Arc<AuditorConfig>,
}

impl AuditorService {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        let config = Arc::clone(&registry.context().config);
        Self { registry, config }
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Parse `text` (JSON-LD or JWT) and verify it.
    pub fn verify_text(&self, text: &str, requests: &[PolicyRequest]) -> Result<VerificationResult> {
        let artifact = Artifact::parse(text)?;
        self.verify(&artifact, requests)
    }

    /// Resolve `requests` (the default policy when empty) and run them.
    pub fn verify(&self, artifact: &Artifact, requests: &[PolicyRequest]) -> Result<VerificationResult> {
        let policies = if requests.is_empty() {
            vec![self.registry.default_policy()?]
        } else {
            self.registry.resolve(requests)?
        };
        Ok(self.verify_with(artifact, &policies))
    }

    /// Run already-built policies. Never fails.
    pub fn verify_with(
        &self,
        artifact: &Artifact,
        policies: &[Arc<dyn VerificationPolicy>],
    ) -> VerificationResult {
        let artifact = Arc::new(artifact.clone());
        let timeout = self.config.policy_timeout();

        let results: Vec<(String, PolicyResult)> = if self.config.parallel {
            let pending: Vec<Pending> = policies
                .iter()
                .map(|p| self.spawn(Arc::clone(p), Arc::clone(&artifact), timeout))
                .collect();
            pending.into_iter().map(|p| self.collect(p)).collect()
        } else {
            policies
                .iter()
                .map(|p| self.collect(self.spawn(Arc::clone(p), Arc::clone(&artifact), timeout)))
                .collect()
        };

        let mut policy_results = IndexMap::with_capacity(results.len());
        for (id, result) in results {
            let mut key = id.clone();
            let mut n = 1;
            while policy_results.contains_key(&key) {
                n += 1;
                key = format!("{id}#{n}");
            }
            policy_results.insert(key, result);
        }

        let verdict = policy_results.values().all(PolicyResult::is_success);
        log::info!(
            "{} {:?} verified by {} policies: {verdict}",
            artifact.kind_name(),
            artifact.common().types,
            policy_results.len()
        );
        VerificationResult {
            result: verdict,
            policy_results,
        }
    }

    fn spawn(
        &self,
        policy: Arc<dyn VerificationPolicy>,
        artifact: Arc<Artifact>,
        timeout: Duration,
    ) -> Pending {
        let id = policy.id().to_string();
        let embedded = self.config.verify_embedded_credentials && policy.checks_embedded_credentials();
        let (sender, receiver) = mpsc::channel();
        let fallback = sender.clone();

        let spawned = thread::Builder::new()
            .name(format!("policy-{id}"))
            .spawn(move || {
                let _ = sender.send(run_policy(policy.as_ref(), &artifact, embedded));
            });
        if let Err(e) = spawned {
            let _ = fallback.send(PolicyResult::failure(PolicyError::rejected(format!(
                "could not start policy: {e}"
            ))));
        }

        Pending {
            id,
            receiver,
            deadline: Instant::now() + timeout,
        }
    }

    fn collect(&self, pending: Pending) -> (String, PolicyResult) {
        let remaining = pending.deadline.saturating_duration_since(Instant::now());
        let result = match pending.receiver.recv_timeout(remaining) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                log::warn!("policy {} timed out", pending.id);
                PolicyResult::failure(PolicyError::Timeout {
                    millis: self.config.policy_timeout_ms,
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                log::warn!("policy {} aborted", pending.id);
                PolicyResult::failure(PolicyError::rejected(format!(
                    "policy {} aborted",
                    pending.id
                )))
            }
        };
        (pending.id, result)
    }
}

fn run_policy(policy: &dyn VerificationPolicy, artifact: &Artifact, embedded: bool) -> PolicyResult {
    let result = policy.verify(artifact);
    match artifact.as_presentation() {
        Some(vp) if embedded && result.is_success() => vp
            .verifiable_credential
            .iter()
            .map(|vc| policy.verify(&Artifact::Credential(vc.clone())))
            .fold(result, PolicyResult::and),
        _ => result,
    }
}
