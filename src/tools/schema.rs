//! Argument schemas for ePortal tools.
//!
//! One `ArgumentSchema` per tool drives both sides of the contract: it is
//! rendered to JSON Schema for tool discovery, and it validates and
//! normalizes raw call arguments before a handler runs. Handlers then
//! deserialize the normalized object into their typed argument struct.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::PortalError;

/// Raw JSON object passed as tool arguments.
pub type JsonObject = Map<String, Value>;

/// The semantic type of a tool argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgType {
    String,
    /// Whole number with optional inclusive bounds.
    Integer { min: Option<i64>, max: Option<i64> },
    /// Any JSON number, forwarded as given.
    Number,
    Bool,
    /// String restricted to a fixed vocabulary.
    Enum(&'static [&'static str]),
    /// A string or a non-empty array of strings, normalized to an array.
    StringOrList,
}

/// A single argument of a tool.
#[derive(Debug, Clone)]
pub struct ArgProperty {
    pub name: &'static str,
    pub arg_type: ArgType,
    pub description: &'static str,
    pub required: bool,
}

/// Argument schema for one tool.
#[derive(Debug, Clone, Default)]
pub struct ArgumentSchema {
    pub properties: Vec<ArgProperty>,
    /// At least one of these must be present and non-empty, with this message otherwise.
    pub require_any: Option<(&'static [&'static str], &'static str)>,
}

impl ArgumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &'static str, arg_type: ArgType, description: &'static str) -> Self {
        self.properties.push(ArgProperty {
            name,
            arg_type,
            description,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &'static str, arg_type: ArgType, description: &'static str) -> Self {
        self.properties.push(ArgProperty {
            name,
            arg_type,
            description,
            required: false,
        });
        self
    }

    pub fn require_any(mut self, names: &'static [&'static str], message: &'static str) -> Self {
        self.require_any = Some((names, message));
        self
    }

    /// Convert to a JSON Schema object suitable for MCP tool registration.
    pub fn to_json_schema(&self) -> Value {
        let mut props = Map::new();
        let mut required = Vec::new();

        for prop in &self.properties {
            let mut schema = match &prop.arg_type {
                ArgType::String => json!({ "type": "string" }),
                ArgType::Integer { min, max } => {
                    let mut s = json!({ "type": "integer" });
                    if let Some(min) = min {
                        s["minimum"] = json!(min);
                    }
                    if let Some(max) = max {
                        s["maximum"] = json!(max);
                    }
                    s
                }
                ArgType::Number => json!({ "type": "number" }),
                ArgType::Bool => json!({ "type": "boolean" }),
                ArgType::Enum(values) => json!({ "type": "string", "enum": values }),
                ArgType::StringOrList => json!({
                    "anyOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" }, "minItems": 1 }
                    ]
                }),
            };
            if !prop.description.is_empty() {
                schema["description"] = Value::String(prop.description.to_string());
            }
            props.insert(prop.name.to_string(), schema);

            if prop.required {
                required.push(Value::String(prop.name.to_string()));
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": props,
        });

        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }

        if let Some((names, _)) = self.require_any {
            let alternatives: Vec<Value> = names.iter().map(|n| json!({ "required": [n] })).collect();
            schema["anyOf"] = Value::Array(alternatives);
        }

        schema
    }

    /// Validate raw arguments and return the normalized object.
    ///
    /// Unknown keys are dropped, `null` counts as absent, integral floats
    /// become integers, and `StringOrList` values become string arrays.
    pub fn validate(&self, arguments: Option<JsonObject>) -> crate::Result<ValidatedArgs> {
        let mut raw = arguments.unwrap_or_default();
        let mut normalized = Map::new();

        for prop in &self.properties {
            let value = match raw.remove(prop.name) {
                None | Some(Value::Null) => {
                    if prop.required {
                        return Err(PortalError::invalid_arg(prop.name, "is required"));
                    }
                    continue;
                }
                Some(v) => v,
            };
            let value = normalize(prop, value)?;
            normalized.insert(prop.name.to_string(), value);
        }

        if let Some((names, message)) = self.require_any {
            let satisfied = names.iter().any(|n| match normalized.get(*n) {
                Some(Value::String(s)) => !s.is_empty(),
                Some(_) => true,
                None => false,
            });
            if !satisfied {
                return Err(PortalError::Validation(message.to_string()));
            }
        }

        Ok(ValidatedArgs(normalized))
    }
}

fn normalize(prop: &ArgProperty, value: Value) -> crate::Result<Value> {
    match &prop.arg_type {
        ArgType::String => match value {
            Value::String(_) => Ok(value),
            _ => Err(PortalError::invalid_arg(prop.name, "must be a string")),
        },
        ArgType::Bool => match value {
            Value::Bool(_) => Ok(value),
            _ => Err(PortalError::invalid_arg(prop.name, "must be a boolean")),
        },
        ArgType::Number => match value {
            Value::Number(_) => Ok(value),
            _ => Err(PortalError::invalid_arg(prop.name, "must be a number")),
        },
        ArgType::Integer { min, max } => {
            let n = as_integer(&value)
                .ok_or_else(|| PortalError::invalid_arg(prop.name, "must be an integer"))?;
            if let Some(min) = min {
                if n < *min {
                    return Err(PortalError::invalid_arg(
                        prop.name,
                        format!("must be at least {}", min),
                    ));
                }
            }
            if let Some(max) = max {
                if n > *max {
                    return Err(PortalError::invalid_arg(
                        prop.name,
                        format!("must be at most {}", max),
                    ));
                }
            }
            Ok(Value::from(n))
        }
        ArgType::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => Ok(value),
            _ => Err(PortalError::invalid_arg(
                prop.name,
                format!("must be one of {}", allowed.join(", ")),
            )),
        },
        ArgType::StringOrList => match value {
            Value::String(s) => Ok(Value::Array(vec![Value::String(s)])),
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_string) => {
                Ok(Value::Array(items))
            }
            Value::Array(items) if items.is_empty() => Err(PortalError::invalid_arg(
                prop.name,
                "must contain at least one entry",
            )),
            _ => Err(PortalError::invalid_arg(
                prop.name,
                "must be a string or an array of strings",
            )),
        },
    }
}

/// Integer value of a JSON number, accepting floats without a fractional part.
fn as_integer(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(n) = number.as_i64() {
        return Some(n);
    }
    let f = number.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Arguments that passed schema validation, in normalized form.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArgs(JsonObject);

impl ValidatedArgs {
    /// Deserialize into a tool's typed argument struct.
    pub fn parse<T: DeserializeOwned>(self) -> crate::Result<T> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| PortalError::Validation(e.to_string()))
    }

    #[cfg(test)]
    pub(crate) fn as_object(&self) -> &JsonObject {
        &self.0
    }
}
