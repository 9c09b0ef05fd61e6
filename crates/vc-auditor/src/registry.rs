//! Policy registry: stable id → factory.
//!
//! Populated once at startup with the built-in set and read-only afterwards.
//! Registering an id twice replaces the earlier factory.

use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AuditorError, Result};
use crate::policy::content::{JsonSchemaPolicy, PresentationDefinitionPolicy};
use crate::policy::ebsi::{
    EbsiTrustedIssuerAccreditationPolicy, EbsiTrustedIssuerDidPolicy,
    EbsiTrustedIssuerRegistryPolicy, EbsiTrustedSchemaRegistryPolicy, EbsiTrustedSubjectDidPolicy,
};
use crate::policy::signature::{MultiSignaturePolicy, SignaturePolicy};
use crate::policy::status::CredentialStatusPolicy;
use crate::policy::structural::{
    ChallengePolicy, ExpirationDateAfterPolicy, IssuedDateBeforePolicy, ValidFromBeforePolicy,
};
use crate::policy::{
    OptionalParameterizedPolicy, ParameterizedPolicy, PolicyContext, PolicyKind, SimplePolicy,
    VerificationPolicy,
};

type CreateFn =
    dyn Fn(Option<Value>, &PolicyContext) -> Result<Arc<dyn VerificationPolicy>> + Send + Sync;

/// Discovery view of a registered policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyInfo {
    pub id: String,
    pub description: String,
    pub kind: PolicyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument_type: Option<&'static str>,
}

struct PolicyFactory {
    info: PolicyInfo,
    create: Box<CreateFn>,
}

/// A policy selection: id plus optional JSON argument.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRequest {
    pub id: String,
    pub argument: Option<Value>,
}

impl PolicyRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            argument: None,
        }
    }

    pub fn with_argument(mut self, argument: Value) -> Self {
        self.argument = Some(argument);
        self
    }
}

impl FromStr for PolicyRequest {
    type Err = AuditorError;

    /// `Id` or `Id=<json>`.
    fn from_str(s: &str) -> Result<Self> {
        let (id, argument) = match s.split_once('=') {
            Some((id, json)) => {
                let argument = serde_json::from_str(json).map_err(|e| {
                    AuditorError::InvalidArgument {
                        policy: id.trim().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                (id.trim(), Some(argument))
            }
            None => (s.trim(), None),
        };
        if id.is_empty() {
            return Err(AuditorError::UnknownPolicy(s.to_string()));
        }
        Ok(Self {
            id: id.to_string(),
            argument,
        })
    }
}

fn decode_argument<A: serde::de::DeserializeOwned>(policy: &str, value: Value) -> Result<A> {
    serde_json::from_value(value).map_err(|e| AuditorError::InvalidArgument {
        policy: policy.to_string(),
        reason: e.to_string(),
    })
}

pub struct PolicyRegistry {
    context: PolicyContext,
    factories: IndexMap<String, PolicyFactory>,
    default_policy_id: String,
}

impl PolicyRegistry {
    /// Empty registry whose policies will be built against `context`.
    pub fn new(context: PolicyContext) -> Self {
        Self {
            context,
            factories: IndexMap::new(),
            default_policy_id: SignaturePolicy::ID.to_string(),
        }
    }

    /// Registry holding every built-in policy.
    pub fn with_defaults(context: PolicyContext) -> Self {
        let mut registry = Self::new(context);
        registry.register_simple::<SignaturePolicy>();
        registry.register_parameterized::<ChallengePolicy>();
        registry.register_optional::<JsonSchemaPolicy>();
        registry.register_parameterized::<PresentationDefinitionPolicy>();
        registry.register_simple::<ExpirationDateAfterPolicy>();
        registry.register_simple::<IssuedDateBeforePolicy>();
        registry.register_simple::<ValidFromBeforePolicy>();
        registry.register_simple::<CredentialStatusPolicy>();
        registry.register_simple::<MultiSignaturePolicy>();
        registry.register_simple::<EbsiTrustedSchemaRegistryPolicy>();
        registry.register_simple::<EbsiTrustedIssuerDidPolicy>();
        registry.register_optional::<EbsiTrustedIssuerRegistryPolicy>();
        registry.register_simple::<EbsiTrustedSubjectDidPolicy>();
        registry.register_simple::<EbsiTrustedIssuerAccreditationPolicy>();
        registry
    }

    pub fn context(&self) -> &PolicyContext {
        &self.context
    }

    fn insert(&mut self, info: PolicyInfo, create: Box<CreateFn>) {
        if self.factories.contains_key(&info.id) {
            log::debug!("replacing policy {}", info.id);
        }
        self.factories
            .insert(info.id.clone(), PolicyFactory { info, create });
    }

    pub fn register_simple<P: SimplePolicy>(&mut self) {
        let info = PolicyInfo {
            id: P::ID.to_string(),
            description: P::DESCRIPTION.to_string(),
            kind: PolicyKind::Simple,
            argument_type: None,
        };
        self.insert(
            info,
            Box::new(|argument, ctx| {
                if argument.is_some() {
                    log::debug!("{} takes no argument; ignoring it", P::ID);
                }
                Ok(Arc::new(P::create(ctx)) as Arc<dyn VerificationPolicy>)
            }),
        );
    }

    pub fn register_parameterized<P: ParameterizedPolicy>(&mut self) {
        let info = PolicyInfo {
            id: P::ID.to_string(),
            description: P::DESCRIPTION.to_string(),
            kind: PolicyKind::Parameterized,
            argument_type: Some(P::ARGUMENT_TYPE),
        };
        self.insert(
            info,
            Box::new(|argument, ctx| {
                let value = argument.ok_or(AuditorError::MissingArgument {
                    policy: P::ID.to_string(),
                    argument_type: P::ARGUMENT_TYPE,
                })?;
                let argument = decode_argument::<P::Argument>(P::ID, value)?;
                Ok(Arc::new(P::create(argument, ctx)) as Arc<dyn VerificationPolicy>)
            }),
        );
    }

    pub fn register_optional<P: OptionalParameterizedPolicy>(&mut self) {
        let info = PolicyInfo {
            id: P::ID.to_string(),
            description: P::DESCRIPTION.to_string(),
            kind: PolicyKind::OptionalParameterized,
            argument_type: Some(P::ARGUMENT_TYPE),
        };
        self.insert(
            info,
            Box::new(|argument, ctx| {
                let argument = argument
                    .filter(|v| !v.is_null())
                    .map(|v| decode_argument::<P::Argument>(P::ID, v))
                    .transpose()?;
                Ok(Arc::new(P::create(argument, ctx)) as Arc<dyn VerificationPolicy>)
            }),
        );
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Build the policy `id`, binding `argument` when the policy takes one.
    pub fn get_policy(
        &self,
        id: &str,
        argument: Option<Value>,
    ) -> Result<Arc<dyn VerificationPolicy>> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| AuditorError::UnknownPolicy(id.to_string()))?;
        (factory.create)(argument, &self.context)
    }

    /// Build every requested policy, failing on the first bad request.
    pub fn resolve(&self, requests: &[PolicyRequest]) -> Result<Vec<Arc<dyn VerificationPolicy>>> {
        requests
            .iter()
            .map(|r| self.get_policy(&r.id, r.argument.clone()))
            .collect()
    }

    pub fn default_policy_id(&self) -> &str {
        &self.default_policy_id
    }

    pub fn set_default_policy_id(&mut self, id: impl Into<String>) {
        self.default_policy_id = id.into();
    }

    pub fn default_policy(&self) -> Result<Arc<dyn VerificationPolicy>> {
        self.get_policy(&self.default_policy_id, None)
    }

    /// Registered policies in registration order.
    pub fn list_policies(&self) -> Vec<PolicyInfo> {
        self.factories.values().map(|f| f.info.clone()).collect()
    }
}
