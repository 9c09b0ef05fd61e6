//! JSON-Schema validation of credentials.
//!
//! A schema reference may be inline schema text, an `http(s)` URL, a
//! `file://` URL or a plain file path. Compiled validators are cached per
//! reference for the lifetime of the factory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::http::HttpClient;
use crate::error::{ServiceError, ServiceResult};
use crate::policy::{PolicyError, PolicyResult};

/// A compiled schema.
pub trait Validator: Send + Sync {
    fn validate(&self, json: &str) -> PolicyResult;
}

pub trait SchemaValidator: Send + Sync {
    fn get(&self, schema_ref: &str) -> ServiceResult<Arc<dyn Validator>>;
}

/// [`Validator`] backed by the `jsonschema` crate.
pub struct JsonSchemaValidator {
    validator: jsonschema::Validator,
}

impl JsonSchemaValidator {
    pub fn compile(schema: &Value) -> ServiceResult<Self> {
        let validator = jsonschema::options()
            .build(schema)
            .map_err(|e| ServiceError::Parse(format!("invalid JSON schema: {e}")))?;
        Ok(Self { validator })
    }
}

impl Validator for JsonSchemaValidator {
    fn validate(&self, json: &str) -> PolicyResult {
        let instance: Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                return PolicyResult::failure(PolicyError::rejected(format!(
                    "document is not valid JSON: {e}"
                )))
            }
        };
        let errors: Vec<PolicyError> = self
            .validator
            .iter_errors(&instance)
            .map(|err| {
                let path = err.instance_path.to_string();
                let location = if path.is_empty() { "/".to_string() } else { path };
                PolicyError::Rejected(format!("{location}: {err}"))
            })
            .collect();
        if errors.is_empty() {
            PolicyResult::success()
        } else {
            PolicyResult::failures(errors)
        }
    }
}

/// Loads, compiles and caches JSON schemas.
pub struct JsonSchemaValidatorFactory {
    http: Arc<dyn HttpClient>,
    cache: RwLock<HashMap<String, Arc<dyn Validator>>>,
}

impl JsonSchemaValidatorFactory {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn load(&self, schema_ref: &str) -> ServiceResult<Value> {
        let trimmed = schema_ref.trim();
        if trimmed.starts_with('{') {
            return Ok(serde_json::from_str(trimmed)?);
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let response = self.http.get(trimmed)?;
            if !response.is_success() {
                return Err(ServiceError::Http {
                    url: trimmed.to_string(),
                    status: response.status,
                });
            }
            return Ok(serde_json::from_str(&response.body)?);
        }
        let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        if Path::new(path).is_file() {
            return Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?);
        }
        Err(ServiceError::NotFound(format!("schema {trimmed}")))
    }

    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

impl SchemaValidator for JsonSchemaValidatorFactory {
    fn get(&self, schema_ref: &str) -> ServiceResult<Arc<dyn Validator>> {
        if let Some(v) = self.cache.read().get(schema_ref) {
            return Ok(Arc::clone(v));
        }
        let schema = self.load(schema_ref)?;
        let validator: Arc<dyn Validator> = Arc::new(JsonSchemaValidator::compile(&schema)?);
        log::debug!("compiled schema {schema_ref}");
        self.cache
            .write()
            .insert(schema_ref.to_string(), Arc::clone(&validator));
        Ok(validator)
    }
}
