//! Declared schema of the resource, consumed by hosts for validation and docs.

use serde::Serialize;

use crate::plan::modifier::{DEFAULT_PERMISSIONS, DefaultString};
use crate::plan::validator::PermissionsValidator;

/// Provider name under which the resource is registered.
pub const PROVIDER_NAME: &str = "local";

/// Resource type name.
pub const RESOURCE_TYPE: &str = "local_sticky_file";

/// Schema of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSchema {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// A change forces destroy + create.
    pub requires_replace: bool,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plan_modifiers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

/// Schema of the resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub provider: &'static str,
    pub resource_type: &'static str,
    pub description: &'static str,
    pub attributes: Vec<AttributeSchema>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Schema of `local_sticky_file`.
pub fn sticky_file_schema() -> Schema {
    let default = DefaultString(DEFAULT_PERMISSIONS);
    Schema {
        provider: PROVIDER_NAME,
        resource_type: RESOURCE_TYPE,
        description: "Generates a local file with given content and permissions. Unlike a plain \
                      local file resource, this resource makes sure that the file will always \
                      exist, even in environments where disk state is not preserved.",
        attributes: vec![
            AttributeSchema {
                name: "path",
                kind: "string",
                required: true,
                optional: false,
                computed: false,
                requires_replace: true,
                description: "The path where the file will be created.",
                validators: Vec::new(),
                plan_modifiers: vec!["Any change requires the file to be replaced.".to_string()],
                default: None,
            },
            AttributeSchema {
                name: "content",
                kind: "string",
                required: true,
                optional: false,
                computed: false,
                requires_replace: false,
                description: "The content of the file.",
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
            },
            AttributeSchema {
                name: "permissions",
                kind: "string",
                required: false,
                optional: true,
                computed: true,
                requires_replace: false,
                description: "The file permissions in numeric notation.",
                validators: vec![PermissionsValidator::new(true).description().to_string()],
                plan_modifiers: vec![default.description()],
                default: Some(DEFAULT_PERMISSIONS),
            },
        ],
    }
}
