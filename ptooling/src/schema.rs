//! Typed parameter schemas for tool arguments.
//!
//! A schema renders the JSON Schema advertised to the model and validates
//! the raw argument string the model sends back.
//!
//! ```rust
//! use ptooling::{ParameterSchema, ParameterSpec};
//!
//! let schema = ParameterSchema::new()
//!     .with(ParameterSpec::string("text", "Text to remember").max_chars(300));
//!
//! let args = schema.validate(r#"{"text":"likes green tea"}"#).expect("valid");
//! assert_eq!(args["text"], "likes green tea");
//! assert!(schema.validate(r#"{}"#).is_err());
//! ```

use serde_json::{Map, Value, json};

use crate::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Number,
    String,
}

impl ParameterKind {
    fn json_type(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub description: String,
    pub required: bool,
    pub max_chars: Option<usize>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParameterKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
            max_chars: None,
        }
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Number, description)
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::String, description)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Caps string length in characters. Ignored for numbers.
    pub fn max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterSchema {
    parameters: Vec<ParameterSpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.retain(|existing| existing.name != parameter.name);
        self.parameters.push(parameter);
        self
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for parameter in &self.parameters {
            let mut property = json!({
                "type": parameter.kind.json_type(),
                "description": parameter.description,
            });
            if let (ParameterKind::String, Some(max_chars)) = (parameter.kind, parameter.max_chars)
            {
                property["maxLength"] = json!(max_chars);
            }
            properties.insert(parameter.name.clone(), property);
        }

        let required = self
            .parameters
            .iter()
            .filter(|parameter| parameter.required)
            .map(|parameter| Value::String(parameter.name.clone()))
            .collect::<Vec<_>>();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    pub fn validate(&self, raw_args: &str) -> Result<Map<String, Value>, ToolError> {
        let raw_args = if raw_args.trim().is_empty() { "{}" } else { raw_args };
        let value: Value = serde_json::from_str(raw_args)
            .map_err(|err| ToolError::invalid_arguments(format!("invalid JSON arguments: {err}")))?;
        let Value::Object(args) = value else {
            return Err(ToolError::invalid_arguments("expected JSON object arguments"));
        };

        for parameter in &self.parameters {
            let Some(value) = args.get(&parameter.name).filter(|value| !value.is_null()) else {
                if parameter.required {
                    return Err(ToolError::invalid_arguments(format!(
                        "missing required {}: '{}'",
                        parameter.kind.json_type(),
                        parameter.name
                    )));
                }
                continue;
            };

            if !parameter.kind.matches(value) {
                return Err(ToolError::invalid_arguments(format!(
                    "'{}' must be a {}",
                    parameter.name,
                    parameter.kind.json_type()
                )));
            }

            if let (Some(max_chars), Some(text)) = (parameter.max_chars, value.as_str())
                && text.chars().count() > max_chars
            {
                return Err(ToolError::invalid_arguments(format!(
                    "'{}' must be at most {max_chars} characters",
                    parameter.name
                )));
            }
        }

        Ok(args)
    }
}

pub fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required string: '{key}'")))
}

pub fn required_number(args: &Map<String, Value>, key: &str) -> Result<f64, ToolError> {
    args.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required number: '{key}'")))
}
