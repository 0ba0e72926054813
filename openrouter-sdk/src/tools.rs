use schemars::gen::SchemaSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;

use crate::error::ChatError;

/// Function definition advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the arguments object
    pub parameters: Value,
}

/// A tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

impl Tool {
    /// Tool with a hand-written JSON Schema
    pub fn function(
        name: impl Into<String>,
        description: Option<String>,
        parameters: Value,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description,
                parameters,
            },
        }
    }

    /// Derive the parameter schema from a type implementing `JsonSchema`
    pub fn from_type<T: schemars::JsonSchema>(name: impl Into<String>) -> ToolBuilder<T> {
        ToolBuilder {
            name: name.into(),
            description: None,
            _phantom: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Builder for schema-derived tools
pub struct ToolBuilder<T> {
    name: String,
    description: Option<String>,
    _phantom: PhantomData<T>,
}

impl<T: schemars::JsonSchema> ToolBuilder<T> {
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn build(self) -> Result<Tool, ChatError> {
        // Inline subschemas: several upstream models reject $ref
        let settings = SchemaSettings::draft07().with(|s| {
            s.inline_subschemas = true;
        });
        let schema = settings.into_generator().into_root_schema_for::<T>();
        let parameters = serde_json::to_value(schema).map_err(|e| {
            ChatError::invalid_input(format!("Invalid schema for tool '{}': {}", self.name, e))
        })?;

        Ok(Tool::function(self.name, self.description, parameters))
    }
}

/// Tool selection mode: `"none"`, `"auto"` or a named function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(ToolChoiceMode),
    Function {
        #[serde(rename = "type")]
        kind: String,
        function: ToolChoiceFunction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceMode {
    None,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolChoiceFunction {
    pub name: String,
}

impl ToolChoice {
    pub fn auto() -> Self {
        ToolChoice::Mode(ToolChoiceMode::Auto)
    }

    pub fn none() -> Self {
        ToolChoice::Mode(ToolChoiceMode::None)
    }

    /// Force a specific function
    pub fn function(name: impl Into<String>) -> Self {
        ToolChoice::Function {
            kind: "function".to_string(),
            function: ToolChoiceFunction { name: name.into() },
        }
    }
}
