//! Typed access to the `params` object of a command.

use serde_json::{Map, Value};

use super::OperationError;

/// Command parameters keyed by name.
///
/// Lenient accessors (`*_or`) treat a missing or `null` value as absent and
/// fall back to the supplied default; a value of the wrong type is always an
/// error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Wraps an already-decoded JSON object.
    #[must_use]
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    /// Raw access to a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|value| !value.is_null())
    }

    /// Reads a number, defaulting when absent.
    ///
    /// # Errors
    ///
    /// Fails when the value is not a finite number.
    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64, OperationError> {
        self.get(name).map_or(Ok(default), |value| as_f64(name, value))
    }

    /// Reads a non-negative integer, defaulting when absent.
    ///
    /// # Errors
    ///
    /// Fails when the value is not a non-negative integer.
    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize, OperationError> {
        self.get(name)
            .map_or(Ok(default), |value| as_usize(name, value))
    }

    /// Reads a boolean, defaulting when absent.
    ///
    /// # Errors
    ///
    /// Fails when the value is not a boolean.
    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, OperationError> {
        self.get(name).map_or(Ok(default), |value| {
            value
                .as_bool()
                .ok_or_else(|| OperationError::invalid(name, "expected a boolean"))
        })
    }

    /// Reads a string, defaulting when absent.
    ///
    /// # Errors
    ///
    /// Fails when the value is not a string.
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str, OperationError> {
        self.get(name).map_or(Ok(default), |value| as_str(name, value))
    }

    /// Reads a number that must be present.
    ///
    /// # Errors
    ///
    /// Fails when the value is missing or not a finite number.
    pub fn required_f64(&self, name: &str) -> Result<f64, OperationError> {
        as_f64(name, self.required(name)?)
    }

    /// Reads a non-negative integer that must be present.
    ///
    /// # Errors
    ///
    /// Fails when the value is missing or not a non-negative integer.
    pub fn required_usize(&self, name: &str) -> Result<usize, OperationError> {
        as_usize(name, self.required(name)?)
    }

    /// Reads a string that must be present.
    ///
    /// # Errors
    ///
    /// Fails when the value is missing or not a string.
    pub fn required_str(&self, name: &str) -> Result<&str, OperationError> {
        as_str(name, self.required(name)?)
    }

    /// Reads an array that must be present.
    ///
    /// # Errors
    ///
    /// Fails when the value is missing or not an array.
    pub fn required_array(&self, name: &str) -> Result<&[Value], OperationError> {
        self.required(name)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| OperationError::invalid(name, "expected an array"))
    }

    fn required(&self, name: &str) -> Result<&Value, OperationError> {
        self.get(name).ok_or_else(|| OperationError::missing(name))
    }
}

impl From<Map<String, Value>> for Params {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

fn as_f64(name: &str, value: &Value) -> Result<f64, OperationError> {
    value
        .as_f64()
        .filter(|number| number.is_finite())
        .ok_or_else(|| OperationError::invalid(name, "expected a number"))
}

fn as_usize(name: &str, value: &Value) -> Result<usize, OperationError> {
    value
        .as_u64()
        .and_then(|number| usize::try_from(number).ok())
        .ok_or_else(|| OperationError::invalid(name, "expected a non-negative integer"))
}

fn as_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, OperationError> {
    value
        .as_str()
        .ok_or_else(|| OperationError::invalid(name, "expected a string"))
}
