//! Presentation Exchange input-descriptor matching.
//!
//! Supported by [`DefaultDescriptorMatcher`]:
//! 1. PEX 1.0 `schema.uri` equal to the credential's `credentialSchema.id`
//! 2. PEX 2.0 `constraints.fields` on the paths `$.type` / `$.vc.type`
//!    (most specific type), `$.credentialSchema.id` and `$.credentialSchema`
//!    (object, matched through `allOf[].contains.properties`)
//!
//! Field filters understand `pattern` (whole-value match), `const` and `enum`.
//! A descriptor with constraint fields matches when any field matches.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::credential::Credential;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub input_descriptors: Vec<InputDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<DescriptorSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaUri {
    pub uri: String,
}

/// PEX 1.0 `schema`: one `{uri}` object or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptorSchema {
    Single(SchemaUri),
    List(Vec<SchemaUri>),
}

impl DescriptorSchema {
    pub fn uris(&self) -> Vec<&str> {
        match self {
            DescriptorSchema::Single(s) => vec![s.uri.as_str()],
            DescriptorSchema::List(items) => items.iter().map(|s| s.uri.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Map<String, Value>>,
}

pub trait DescriptorMatcher: Send + Sync {
    fn matches(&self, credential: &Credential, descriptor: &InputDescriptor) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDescriptorMatcher;

impl DescriptorMatcher for DefaultDescriptorMatcher {
    fn matches(&self, credential: &Credential, descriptor: &InputDescriptor) -> bool {
        let schema_id = credential.credential_schema.as_ref().map(|s| s.id.as_str());
        if let Some(schema) = &descriptor.schema {
            return schema_id.is_some_and(|id| schema.uris().contains(&id));
        }
        descriptor
            .constraints
            .as_ref()
            .is_some_and(|c| c.fields.iter().any(|field| field_matches(credential, field)))
    }
}

fn has_path(field: &Field, paths: &[&str]) -> bool {
    field.path.iter().any(|p| paths.contains(&p.as_str()))
}

fn field_matches(credential: &Credential, field: &Field) -> bool {
    let Some(filter) = &field.filter else {
        return false;
    };

    if has_path(field, &["$.type", "$.vc.type"]) {
        return credential
            .credential_type()
            .is_some_and(|t| match_single_value(&Value::String(t.to_string()), filter));
    }
    if has_path(field, &["$.credentialSchema.id", "$.vc.credentialSchema.id"]) {
        return credential
            .credential_schema
            .as_ref()
            .is_some_and(|s| match_single_value(&Value::String(s.id.clone()), filter));
    }
    if has_path(field, &["$.credentialSchema", "$.vc.credentialSchema"]) {
        let Some(schema) = &credential.credential_schema else {
            return false;
        };
        let Ok(Value::Object(object)) = serde_json::to_value(schema) else {
            return false;
        };
        return match_all_of_contains(&object, filter);
    }
    false
}

/// `allOf: [{contains: {properties: {key: filter}}}]` against an object.
fn match_all_of_contains(object: &Map<String, Value>, filter: &Map<String, Value>) -> bool {
    let Some(Value::Array(all_of)) = filter.get("allOf") else {
        return false;
    };
    all_of.iter().any(|entry| {
        let Some(Value::Object(properties)) = entry.get("contains").and_then(|c| c.get("properties"))
        else {
            return false;
        };
        properties.iter().all(|(key, property_filter)| {
            let value = object.get(key).unwrap_or(&Value::Null);
            property_filter
                .as_object()
                .is_some_and(|f| match_single_value(value, f))
        })
    })
}

/// Apply a `pattern` / `const` / `enum` filter to one value.
pub fn match_single_value(value: &Value, filter: &Map<String, Value>) -> bool {
    if let Some(pattern) = filter.get("pattern").and_then(Value::as_str) {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Regex::new(&format!("^(?:{pattern})$")).is_ok_and(|re| re.is_match(&text));
    }
    if let Some(expected) = filter.get("const") {
        return expected == value;
    }
    if let Some(Value::Array(options)) = filter.get("enum") {
        return options.contains(value);
    }
    false
}
