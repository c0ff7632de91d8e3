//! Function declarations advertised to the model in the `setup` envelope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reasons a declaration cannot be advertised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclarationError {
    #[error("'{0}' is not a valid function name: must start with a letter and contain only letters, digits and underscores")]
    InvalidName(String),
    #[error("declaration '{name}' requires property '{property}' which is not defined")]
    UnknownRequired { name: String, property: String },
}

/// JSON-schema primitive types accepted by the Live API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

/// A single named property of a declaration's parameter object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// The parameter object of a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            kind: SchemaType::Object,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// A function the model may call, as it appears inside `functionDeclarations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Schema,
}

impl FunctionDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Schema::default(),
        }
    }

    /// Adds an optional property.
    pub fn property(mut self, name: impl Into<String>, kind: SchemaType, description: impl Into<String>) -> Self {
        self.parameters.properties.insert(
            name.into(),
            PropertySchema {
                kind,
                description: Some(description.into()),
                default: None,
            },
        );
        self
    }

    /// Adds a property and marks it as required.
    pub fn required_property(
        self,
        name: impl Into<String>,
        kind: SchemaType,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let mut this = self.property(name.clone(), kind, description);
        this.parameters.required.push(name);
        this
    }

    /// Sets the default value advertised for an existing property.
    pub fn with_default(mut self, property: &str, value: serde_json::Value) -> Self {
        if let Some(prop) = self.parameters.properties.get_mut(property) {
            prop.default = Some(value);
        }
        self
    }

    /// Checks the name against the identifier rule and that every required
    /// property is defined.
    pub fn validate(&self) -> Result<(), DeclarationError> {
        if !is_valid_identifier(&self.name) {
            return Err(DeclarationError::InvalidName(self.name.clone()));
        }
        if let Some(missing) = self
            .parameters
            .required
            .iter()
            .find(|r| !self.parameters.properties.contains_key(*r))
        {
            return Err(DeclarationError::UnknownRequired {
                name: self.name.clone(),
                property: missing.clone(),
            });
        }
        Ok(())
    }
}

/// The single grouping object the protocol expects inside `setup.tools`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolGroup {
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// `^[A-Za-z][A-Za-z0-9_]*$`
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
