//! Structural validity: dates and challenge.
//!
//! Date policies compare against the injected [`Clock`] with strict
//! inequality. Presentations always pass them.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;

use super::{
    credential_of, ParameterizedPolicy, PolicyContext, PolicyError, PolicyKind, PolicyResult,
    SimplePolicy, VerificationPolicy,
};
use crate::credential::Artifact;
use crate::time::{parse_date, Clock};

#[derive(Clone, Copy)]
enum DateRule {
    IssuedBefore,
    ValidFromBefore,
    ExpiresAfter,
}

fn check_date(rule: DateRule, clock: &dyn Clock, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
    let Some(vc) = credential_of(artifact) else {
        return Ok(PolicyResult::success());
    };
    let now = clock.now();

    let (field, value) = match rule {
        DateRule::IssuedBefore => ("issuanceDate", vc.issued.as_deref()),
        DateRule::ValidFromBefore => ("validFrom", vc.valid_from.as_deref()),
        DateRule::ExpiresAfter => match vc.expiration_date.as_deref() {
            None => return Ok(PolicyResult::success()),
            some => ("expirationDate", some),
        },
    };
    let Some(value) = value else {
        return Err(PolicyError::rejected(format!("credential has no {field}")));
    };
    let Some(date) = parse_date(value) else {
        return Err(PolicyError::rejected(format!("{field} {value:?} is not a valid date")));
    };

    Ok(match rule {
        DateRule::IssuedBefore | DateRule::ValidFromBefore => {
            PolicyResult::check(date < now, || format!("{field} {value} is not in the past"))
        }
        DateRule::ExpiresAfter => {
            PolicyResult::check(date > now, || format!("credential expired at {value}"))
        }
    })
}

macro_rules! date_policy {
    ($(#[$meta:meta])* $name:ident, $rule:expr, $description:literal) => {
        $(#[$meta])*
        pub struct $name {
            clock: Arc<dyn Clock>,
        }

        impl SimplePolicy for $name {
            const ID: &'static str = stringify!($name);
            const DESCRIPTION: &'static str = $description;

            fn create(ctx: &PolicyContext) -> Self {
                Self {
                    clock: Arc::clone(&ctx.services.clock),
                }
            }
        }

        impl VerificationPolicy for $name {
            fn id(&self) -> &str {
                Self::ID
            }

            fn description(&self) -> &str {
                Self::DESCRIPTION
            }

            fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
                check_date($rule, self.clock.as_ref(), artifact)
            }
        }
    };
}

date_policy!(
    /// `issued` (or `issuanceDate`) strictly before now.
    IssuedDateBeforePolicy,
    DateRule::IssuedBefore,
    "Verify by issuance date"
);

date_policy!(
    /// `validFrom` (or `issuanceDate`) strictly before now.
    ValidFromBeforePolicy,
    DateRule::ValidFromBefore,
    "Verify by valid from"
);

date_policy!(
    /// No `expirationDate`, or one strictly after now.
    ExpirationDateAfterPolicy,
    DateRule::ExpiresAfter,
    "Verify by expiration date"
);

// ── Challenge ────────────────────────────────────────────────────────────────

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengePolicyArg {
    pub challenges: BTreeSet<String>,
    #[serde(rename = "applyToVC", alias = "applyToVc", default = "yes")]
    pub apply_to_vc: bool,
    #[serde(rename = "applyToVP", alias = "applyToVp", default = "yes")]
    pub apply_to_vp: bool,
}

impl ChallengePolicyArg {
    pub fn new<I, S>(challenges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            challenges: challenges.into_iter().map(Into::into).collect(),
            apply_to_vc: true,
            apply_to_vp: true,
        }
    }
}

/// The artifact's challenge must be one of the expected values.
pub struct ChallengePolicy {
    argument: ChallengePolicyArg,
}

impl ParameterizedPolicy for ChallengePolicy {
    const ID: &'static str = "ChallengePolicy";
    const DESCRIPTION: &'static str = "Verify challenge";
    const ARGUMENT_TYPE: &'static str = "ChallengePolicyArg";

    type Argument = ChallengePolicyArg;

    fn create(argument: ChallengePolicyArg, _ctx: &PolicyContext) -> Self {
        Self { argument }
    }

    fn argument(&self) -> &ChallengePolicyArg {
        &self.argument
    }
}

impl VerificationPolicy for ChallengePolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Parameterized
    }

    fn applies_to_vc(&self) -> bool {
        self.argument.apply_to_vc
    }

    fn applies_to_vp(&self) -> bool {
        self.argument.apply_to_vp
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        Ok(match artifact.common().challenge.as_deref() {
            Some(challenge) => PolicyResult::check(self.argument.challenges.contains(challenge), || {
                format!("challenge {challenge:?} is not one of the expected values")
            }),
            None => PolicyResult::failure(PolicyError::rejected("no challenge given")),
        })
    }
}
