//! Content validation: JSON schema and presentation definition.

use std::sync::Arc;

use serde::Deserialize;

use super::{
    OptionalParameterizedPolicy, ParameterizedPolicy, PolicyContext, PolicyError, PolicyKind,
    PolicyResult, VerificationPolicy,
};
use crate::credential::Artifact;
use crate::services::{DescriptorMatcher, PresentationDefinition, SchemaValidator};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JsonSchemaPolicyArg {
    /// URL, file path or inline schema text.
    pub schema: String,
}

/// Validate a credential against a JSON schema: the argument's, or else the
/// credential's own `credentialSchema.id`.
pub struct JsonSchemaPolicy {
    argument: Option<JsonSchemaPolicyArg>,
    validator: Arc<dyn SchemaValidator>,
}

impl OptionalParameterizedPolicy for JsonSchemaPolicy {
    const ID: &'static str = "JsonSchemaPolicy";
    const DESCRIPTION: &'static str = "Verify by JSON schema";
    const ARGUMENT_TYPE: &'static str = "JsonSchemaPolicyArg";

    type Argument = JsonSchemaPolicyArg;

    fn create(argument: Option<JsonSchemaPolicyArg>, ctx: &PolicyContext) -> Self {
        Self {
            argument,
            validator: Arc::clone(&ctx.services.schema_validator),
        }
    }

    fn argument(&self) -> Option<&JsonSchemaPolicyArg> {
        self.argument.as_ref()
    }
}

impl VerificationPolicy for JsonSchemaPolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::OptionalParameterized
    }

    fn applies_to_vp(&self) -> bool {
        false
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        let credential = artifact.common();
        let schema_ref = self
            .argument
            .as_ref()
            .map(|a| a.schema.as_str())
            .or_else(|| credential.credential_schema.as_ref().map(|s| s.id.as_str()))
            .ok_or_else(|| {
                PolicyError::configuration(
                    "No \"argument.schema\" or \"credentialSchema.id\" supplied.",
                )
            })?;

        let validator = self.validator.get(schema_ref)?;
        Ok(validator.validate(&credential.to_json().to_string()))
    }
}

// ── Presentation definition ──────────────────────────────────────────────────

/// Every input descriptor must be matched by at least one embedded credential.
/// A bare credential never satisfies a definition.
pub struct PresentationDefinitionPolicy {
    definition: PresentationDefinition,
    matcher: Arc<dyn DescriptorMatcher>,
}

impl ParameterizedPolicy for PresentationDefinitionPolicy {
    const ID: &'static str = "PresentationDefinitionPolicy";
    const DESCRIPTION: &'static str =
        "Verify that verifiable presentation complies with presentation definition";
    const ARGUMENT_TYPE: &'static str = "PresentationDefinition";

    type Argument = PresentationDefinition;

    fn create(definition: PresentationDefinition, ctx: &PolicyContext) -> Self {
        Self {
            definition,
            matcher: Arc::clone(&ctx.services.descriptor_matcher),
        }
    }

    fn argument(&self) -> &PresentationDefinition {
        &self.definition
    }
}

impl VerificationPolicy for PresentationDefinitionPolicy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Parameterized
    }

    fn checks_embedded_credentials(&self) -> bool {
        false
    }

    fn do_verify(&self, artifact: &Artifact) -> Result<PolicyResult, PolicyError> {
        let Some(vp) = artifact.as_presentation() else {
            return Err(PolicyError::rejected(
                "a verifiable credential cannot satisfy a presentation definition",
            ));
        };

        let unmatched: Vec<PolicyError> = self
            .definition
            .input_descriptors
            .iter()
            .filter(|descriptor| {
                !vp.verifiable_credential
                    .iter()
                    .any(|vc| self.matcher.matches(vc, descriptor))
            })
            .map(|descriptor| {
                PolicyError::rejected(format!(
                    "input descriptor {} is not matched by any credential",
                    descriptor.id
                ))
            })
            .collect();

        Ok(if unmatched.is_empty() {
            PolicyResult::success()
        } else {
            PolicyResult::failures(unmatched)
        })
    }
}
