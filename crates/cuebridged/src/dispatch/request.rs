//! Command decoding.

use serde_json::{Map, Value};

use crate::operations::Params;

use super::errors::DispatchError;

/// A decoded `{type, params}` request.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    kind: String,
    params: Params,
}

impl Command {
    /// Builds a command directly.
    pub fn new(kind: impl Into<String>, params: Params) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }

    /// Interprets one complete JSON document as a command.
    ///
    /// A missing or non-string `type` yields an empty command type, which the
    /// router reports as unknown. Missing `params` means no parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidStructure`] when the document is not an
    /// object or `params` is not an object.
    pub fn from_value(document: Value) -> Result<Self, DispatchError> {
        let Value::Object(mut fields) = document else {
            return Err(DispatchError::invalid_structure(format!(
                "expected a JSON object, got {}",
                kind_of(&document)
            )));
        };
        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => String::new(),
        };
        let params = match fields.remove("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(params)) => params,
            Some(other) => {
                return Err(DispatchError::invalid_structure(format!(
                    "params must be an object, got {}",
                    kind_of(&other)
                )));
            }
        };
        Ok(Self::new(kind, Params::new(params)))
    }

    /// Command type as sent by the client.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn into_parts(self) -> (String, Params) {
        (self.kind, self.params)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
